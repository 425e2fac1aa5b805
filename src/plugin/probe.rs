//! Instrumented plugin used by the unit tests.

use crate::plugin::interface::{ConverterPlugin, DropPayload, PluginDescriptor, PluginError, PluginResult};
use crate::plugin::record::LifecycleOp;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Hook invocation counters shared between a probe and its test.
#[derive(Default)]
pub struct HookCounts {
    calls: Mutex<Vec<LifecycleOp>>,
    imports: AtomicUsize,
    dropped: AtomicBool,
}

impl HookCounts {
    pub fn get(&self, op: LifecycleOp) -> usize {
        self.calls.lock().iter().filter(|o| **o == op).count()
    }

    pub fn order(&self) -> Vec<LifecycleOp> {
        self.calls.lock().clone()
    }

    pub fn imports(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    /// Whether the plugin instance has been dropped.
    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

pub struct ProbePlugin {
    id: String,
    descriptor: Option<PluginDescriptor>,
    failing: Vec<LifecycleOp>,
    accepts: Option<String>,
    counts: Arc<HookCounts>,
}

impl ProbePlugin {
    /// Probe with implementation id `id`, described with the same name.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            descriptor: Some(PluginDescriptor::new(id)),
            failing: Vec::new(),
            accepts: None,
            counts: Arc::new(HookCounts::default()),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.descriptor = Some(PluginDescriptor::new(name).with_version("1.0.0"));
        self
    }

    /// Drop the explicit metadata so the display name fallback applies.
    pub fn anonymous(mut self) -> Self {
        self.descriptor = None;
        self
    }

    pub fn failing(mut self, op: LifecycleOp) -> Self {
        self.failing.push(op);
        self
    }

    pub fn accepting(mut self, mime: &str) -> Self {
        self.accepts = Some(mime.to_string());
        self
    }

    pub fn counts(&self) -> Arc<HookCounts> {
        self.counts.clone()
    }

    fn hook(&self, op: LifecycleOp) -> PluginResult<()> {
        self.counts.calls.lock().push(op);
        if self.failing.contains(&op) {
            return Err(PluginError::initialization(&format!("{op} refused by probe")));
        }
        Ok(())
    }
}

impl ConverterPlugin for ProbePlugin {
    fn init(&mut self) -> PluginResult<()> {
        self.hook(LifecycleOp::Initialize)
    }

    fn destroy(&mut self) -> PluginResult<()> {
        self.hook(LifecycleOp::Destroy)
    }

    fn enable(&mut self) -> PluginResult<()> {
        self.hook(LifecycleOp::Enable)
    }

    fn disable(&mut self) -> PluginResult<()> {
        self.hook(LifecycleOp::Disable)
    }

    fn describe(&self) -> Option<PluginDescriptor> {
        self.descriptor.clone()
    }

    fn implementation_id(&self) -> String {
        self.id.clone()
    }

    fn display_name(&self) -> String {
        format!("probe:{}", self.id)
    }

    fn can_import(&self, payload: &DropPayload) -> bool {
        self.accepts.as_deref().is_some_and(|mime| payload.offers(mime))
    }

    fn import_data(&mut self, payload: &DropPayload) -> PluginResult<bool> {
        if !self.can_import(payload) {
            return Err(PluginError::conversion("unsupported payload"));
        }
        self.counts.imports.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

impl Drop for ProbePlugin {
    fn drop(&mut self) {
        self.counts.dropped.store(true, Ordering::SeqCst);
    }
}
