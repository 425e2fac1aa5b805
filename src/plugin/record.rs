//! Plugin record and lifecycle state machine.
//!
//! A record owns one plugin instance together with its descriptor and
//! lifecycle state. Every transition runs under the record's own lock, so
//! concurrent callers on one record are serialized and each hook runs at
//! most once per transition, while different records never contend.

use crate::core::{now, Error, Result, Timestamp};
use crate::plugin::interface::{ConverterPlugin, DropPayload, PluginDescriptor, PluginError};
use crate::plugin::listener::{LifecycleEvent, ListenerSet};
use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle state of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginState {
    /// Known to the registry but not initialized (also covers excluded plugins)
    Registered,
    /// Init hook succeeded
    Initialized,
    /// Selected and ready for conversions
    Enabled,
    /// Destroy hook succeeded; terminal
    Destroyed,
}

impl PluginState {
    /// Whether the init hook has run and the destroy hook has not.
    pub fn is_initialized(self) -> bool {
        matches!(self, PluginState::Initialized | PluginState::Enabled)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginState::Registered => write!(f, "registered"),
            PluginState::Initialized => write!(f, "initialized"),
            PluginState::Enabled => write!(f, "enabled"),
            PluginState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Lifecycle operations, one per plugin hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleOp {
    Initialize,
    Enable,
    Disable,
    Destroy,
}

impl std::fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleOp::Initialize => write!(f, "initialize"),
            LifecycleOp::Enable => write!(f, "enable"),
            LifecycleOp::Disable => write!(f, "disable"),
            LifecycleOp::Destroy => write!(f, "destroy"),
        }
    }
}

struct Slot {
    state: PluginState,
    /// Set by registry teardown; refuses initialize and enable
    closed: bool,
    /// Released once destroyed
    plugin: Option<Box<dyn ConverterPlugin>>,
}

/// Registry bookkeeping around one plugin instance.
pub struct PluginRecord {
    id: String,
    descriptor: PluginDescriptor,
    excluded: bool,
    registered_at: Timestamp,
    listeners: ListenerSet,
    slot: Mutex<Slot>,
}

impl PluginRecord {
    /// Wrap a plugin instance in the `Registered` state.
    ///
    /// `listeners` receives this record's initialized/destroyed events.
    pub fn new(
        plugin: Box<dyn ConverterPlugin>,
        listeners: ListenerSet,
        excluded: bool,
    ) -> Arc<Self> {
        let id = plugin.implementation_id();
        let descriptor = PluginDescriptor::of(plugin.as_ref());

        Arc::new(Self {
            id,
            descriptor,
            excluded,
            registered_at: now(),
            listeners,
            slot: Mutex::new(Slot {
                state: PluginState::Registered,
                closed: false,
                plugin: Some(plugin),
            }),
        })
    }

    /// Implementation identifier, unique within a registry.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Static metadata.
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Whether configuration excluded this plugin at registration.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// When the record was created.
    pub fn registered_at(&self) -> Timestamp {
        self.registered_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PluginState {
        self.slot.lock().state
    }

    /// Check if initialized (or enabled).
    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }

    /// Check if enabled.
    pub fn is_enabled(&self) -> bool {
        self.state() == PluginState::Enabled
    }

    /// Ordering key: display name, then id to separate equal names.
    pub(crate) fn sort_key(&self) -> (String, String) {
        (self.descriptor.name.clone(), self.id.clone())
    }

    /// Run the init hook. No-op when already initialized.
    ///
    /// Fails with [`Error::RegistryClosed`] once the record was shut down.
    pub fn initialize(self: &Arc<Self>) -> Result<()> {
        {
            let mut slot = self.slot.lock();
            if slot.closed {
                return Err(Error::RegistryClosed);
            }
            match slot.state {
                PluginState::Initialized | PluginState::Enabled => return Ok(()),
                PluginState::Destroyed => {
                    return Err(self.invalid(LifecycleOp::Initialize, slot.state))
                }
                PluginState::Registered => {}
            }
            if self.excluded {
                return Err(Error::Excluded(self.name().to_string()));
            }

            let state = slot.state;
            let plugin = slot
                .plugin
                .as_mut()
                .ok_or_else(|| self.invalid(LifecycleOp::Initialize, state))?;
            plugin
                .init()
                .map_err(|e| self.hook_failed(LifecycleOp::Initialize, e))?;
            slot.state = PluginState::Initialized;
        }

        tracing::debug!(plugin = %self.name(), "Plugin initialized");
        self.listeners.notify(LifecycleEvent::Initialized, self);
        Ok(())
    }

    /// Run the enable hook. No-op when already enabled.
    ///
    /// Fails with [`Error::RegistryClosed`] once the record was shut down.
    pub fn enable(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Err(Error::RegistryClosed);
        }
        match slot.state {
            PluginState::Enabled => return Ok(()),
            PluginState::Registered | PluginState::Destroyed => {
                return Err(self.invalid(LifecycleOp::Enable, slot.state))
            }
            PluginState::Initialized => {}
        }

        let state = slot.state;
        let plugin = slot
            .plugin
            .as_mut()
            .ok_or_else(|| self.invalid(LifecycleOp::Enable, state))?;
        plugin
            .enable()
            .map_err(|e| self.hook_failed(LifecycleOp::Enable, e))?;
        slot.state = PluginState::Enabled;

        tracing::debug!(plugin = %self.name(), "Plugin enabled");
        Ok(())
    }

    /// Run the disable hook. No-op unless enabled.
    pub fn disable(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.state != PluginState::Enabled {
            return Ok(());
        }
        self.disable_locked(&mut slot)
    }

    /// Run the destroy hook and release the instance.
    ///
    /// An enabled record is disabled first. A record that was never
    /// initialized, or is already destroyed, is left alone.
    pub fn destroy(self: &Arc<Self>) -> Result<()> {
        let destroyed = {
            let mut slot = self.slot.lock();
            self.destroy_locked(&mut slot)?
        };
        if destroyed {
            self.destroyed();
        }
        Ok(())
    }

    /// Refuse further initialize/enable calls, then destroy.
    ///
    /// Both steps happen under one lock acquisition, so no transition can
    /// slip in between.
    pub(crate) fn close(self: &Arc<Self>) -> Result<()> {
        let destroyed = {
            let mut slot = self.slot.lock();
            slot.closed = true;
            self.destroy_locked(&mut slot)?
        };
        if destroyed {
            self.destroyed();
        }
        Ok(())
    }

    /// Check if shut down by the registry.
    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// Ask the plugin whether it handles the payload. Only enabled plugins do.
    pub fn can_import(&self, payload: &DropPayload) -> bool {
        let slot = self.slot.lock();
        match (&slot.state, &slot.plugin) {
            (PluginState::Enabled, Some(plugin)) => plugin.can_import(payload),
            _ => false,
        }
    }

    /// Hand the payload to the plugin for conversion.
    pub fn import(&self, payload: &DropPayload) -> Result<bool> {
        let mut slot = self.slot.lock();
        if slot.state != PluginState::Enabled {
            return Err(Error::NotEnabled(self.name().to_string()));
        }
        let plugin = slot
            .plugin
            .as_mut()
            .ok_or_else(|| Error::NotEnabled(self.name().to_string()))?;

        plugin.import_data(payload).map_err(|source| {
            tracing::error!(plugin = %self.name(), error = %source, "Conversion failed");
            Error::Conversion {
                plugin: self.name().to_string(),
                source,
            }
        })
    }

    /// Returns whether the destroy hook ran.
    fn destroy_locked(&self, slot: &mut Slot) -> Result<bool> {
        match slot.state {
            PluginState::Registered | PluginState::Destroyed => return Ok(false),
            PluginState::Enabled => self.disable_locked(slot)?,
            PluginState::Initialized => {}
        }

        let state = slot.state;
        let plugin = slot
            .plugin
            .as_mut()
            .ok_or_else(|| self.invalid(LifecycleOp::Destroy, state))?;
        plugin
            .destroy()
            .map_err(|e| self.hook_failed(LifecycleOp::Destroy, e))?;
        slot.state = PluginState::Destroyed;
        slot.plugin = None;
        Ok(true)
    }

    fn destroyed(self: &Arc<Self>) {
        tracing::debug!(plugin = %self.name(), "Plugin destroyed");
        self.listeners.notify(LifecycleEvent::Destroyed, self);
    }

    fn disable_locked(&self, slot: &mut Slot) -> Result<()> {
        let state = slot.state;
        let plugin = slot
            .plugin
            .as_mut()
            .ok_or_else(|| self.invalid(LifecycleOp::Disable, state))?;
        plugin
            .disable()
            .map_err(|e| self.hook_failed(LifecycleOp::Disable, e))?;
        slot.state = PluginState::Initialized;

        tracing::debug!(plugin = %self.name(), "Plugin disabled");
        Ok(())
    }

    fn hook_failed(&self, operation: LifecycleOp, source: PluginError) -> Error {
        tracing::error!(
            plugin = %self.name(),
            %operation,
            error = %source,
            "Plugin hook failed"
        );
        Error::Lifecycle {
            plugin: self.name().to_string(),
            operation,
            source,
        }
    }

    fn invalid(&self, operation: LifecycleOp, state: PluginState) -> Error {
        Error::InvalidTransition {
            plugin: self.name().to_string(),
            operation,
            state,
        }
    }
}

impl std::fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRecord")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("excluded", &self.excluded)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::listener::testing::RecordingListener;
    use crate::plugin::probe::ProbePlugin;

    fn record_with(plugin: ProbePlugin) -> (Arc<PluginRecord>, Arc<RecordingListener>) {
        let listeners = ListenerSet::new();
        let recorder = RecordingListener::new();
        listeners.add(recorder.clone());
        (PluginRecord::new(Box::new(plugin), listeners, false), recorder)
    }

    #[test]
    fn test_new_record_is_registered() {
        let (record, _) = record_with(ProbePlugin::new("png").named("Png Shrinker"));

        assert_eq!(record.id(), "png");
        assert_eq!(record.name(), "Png Shrinker");
        assert_eq!(record.state(), PluginState::Registered);
        assert!(!record.is_excluded());
    }

    #[test]
    fn test_name_falls_back_to_display_name() {
        let (record, _) = record_with(ProbePlugin::new("zip").anonymous());

        assert_eq!(record.name(), "probe:zip");
        assert_eq!(record.id(), "zip");
        assert!(record.descriptor().version.is_empty());
    }

    #[test]
    fn test_full_lifecycle() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, recorder) = record_with(plugin);

        record.initialize().unwrap();
        assert_eq!(record.state(), PluginState::Initialized);
        record.enable().unwrap();
        assert_eq!(record.state(), PluginState::Enabled);
        record.disable().unwrap();
        assert_eq!(record.state(), PluginState::Initialized);
        record.destroy().unwrap();
        assert_eq!(record.state(), PluginState::Destroyed);

        assert_eq!(counts.get(LifecycleOp::Initialize), 1);
        assert_eq!(counts.get(LifecycleOp::Enable), 1);
        assert_eq!(counts.get(LifecycleOp::Disable), 1);
        assert_eq!(counts.get(LifecycleOp::Destroy), 1);
        assert_eq!(
            recorder.events(),
            vec![
                (LifecycleEvent::Initialized, "png".to_string()),
                (LifecycleEvent::Destroyed, "png".to_string()),
            ]
        );
    }

    #[test]
    fn test_repeated_transitions_are_noops() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, recorder) = record_with(plugin);

        record.initialize().unwrap();
        record.initialize().unwrap();
        record.enable().unwrap();
        record.enable().unwrap();
        record.disable().unwrap();
        record.disable().unwrap();
        record.destroy().unwrap();
        record.destroy().unwrap();

        for op in [
            LifecycleOp::Initialize,
            LifecycleOp::Enable,
            LifecycleOp::Disable,
            LifecycleOp::Destroy,
        ] {
            assert_eq!(counts.get(op), 1, "{op} ran more than once");
        }
        assert_eq!(recorder.count(LifecycleEvent::Initialized), 1);
        assert_eq!(recorder.count(LifecycleEvent::Destroyed), 1);
    }

    #[test]
    fn test_enable_requires_initialized() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, _) = record_with(plugin);

        let err = record.enable().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                operation: LifecycleOp::Enable,
                state: PluginState::Registered,
                ..
            }
        ));
        assert_eq!(record.state(), PluginState::Registered);
        assert_eq!(counts.get(LifecycleOp::Enable), 0);
    }

    #[test]
    fn test_destroy_from_registered_is_noop() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, recorder) = record_with(plugin);

        record.destroy().unwrap();
        assert_eq!(record.state(), PluginState::Registered);
        assert_eq!(counts.get(LifecycleOp::Destroy), 0);
        assert_eq!(recorder.count(LifecycleEvent::Destroyed), 0);
    }

    #[test]
    fn test_destroy_enabled_disables_first() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, _) = record_with(plugin);

        record.initialize().unwrap();
        record.enable().unwrap();
        record.destroy().unwrap();

        assert_eq!(record.state(), PluginState::Destroyed);
        assert_eq!(counts.get(LifecycleOp::Disable), 1);
        assert_eq!(counts.get(LifecycleOp::Destroy), 1);
        assert_eq!(
            counts.order(),
            vec![
                LifecycleOp::Initialize,
                LifecycleOp::Enable,
                LifecycleOp::Disable,
                LifecycleOp::Destroy,
            ]
        );
    }

    #[test]
    fn test_destroyed_record_cannot_be_reinitialized() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, _) = record_with(plugin);

        record.initialize().unwrap();
        record.destroy().unwrap();

        assert!(matches!(
            record.initialize(),
            Err(Error::InvalidTransition {
                state: PluginState::Destroyed,
                ..
            })
        ));
        assert!(record.enable().is_err());
        assert_eq!(counts.get(LifecycleOp::Initialize), 1);
        assert!(counts.dropped());
    }

    #[test]
    fn test_init_failure_keeps_registered() {
        let plugin = ProbePlugin::new("png").failing(LifecycleOp::Initialize);
        let (record, recorder) = record_with(plugin);

        let err = record.initialize().unwrap_err();
        assert!(err.is_plugin_failure());
        assert_eq!(record.state(), PluginState::Registered);
        assert_eq!(recorder.count(LifecycleEvent::Initialized), 0);
    }

    #[test]
    fn test_failed_hooks_keep_last_good_state() {
        let plugin = ProbePlugin::new("png")
            .failing(LifecycleOp::Disable)
            .failing(LifecycleOp::Destroy);
        let (record, recorder) = record_with(plugin);

        record.initialize().unwrap();
        record.enable().unwrap();

        assert!(record.disable().is_err());
        assert_eq!(record.state(), PluginState::Enabled);

        assert!(record.destroy().is_err());
        assert_eq!(record.state(), PluginState::Enabled);
        assert_eq!(recorder.count(LifecycleEvent::Destroyed), 0);
    }

    #[test]
    fn test_excluded_record_refuses_initialize() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let record = PluginRecord::new(Box::new(plugin), ListenerSet::new(), true);

        assert!(matches!(record.initialize(), Err(Error::Excluded(_))));
        assert_eq!(record.state(), PluginState::Registered);
        assert_eq!(counts.get(LifecycleOp::Initialize), 0);
    }

    #[test]
    fn test_close_destroys_and_refuses_restart() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, recorder) = record_with(plugin);

        record.initialize().unwrap();
        record.enable().unwrap();
        record.close().unwrap();

        assert_eq!(record.state(), PluginState::Destroyed);
        assert!(record.is_closed());
        assert_eq!(
            counts.order(),
            vec![
                LifecycleOp::Initialize,
                LifecycleOp::Enable,
                LifecycleOp::Disable,
                LifecycleOp::Destroy,
            ]
        );
        assert_eq!(recorder.count(LifecycleEvent::Destroyed), 1);
        assert!(matches!(record.initialize(), Err(Error::RegistryClosed)));
        assert!(matches!(record.enable(), Err(Error::RegistryClosed)));
    }

    #[test]
    fn test_close_never_initialized_record() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, _) = record_with(plugin);

        record.close().unwrap();

        assert_eq!(record.state(), PluginState::Registered);
        assert!(matches!(record.initialize(), Err(Error::RegistryClosed)));
        assert!(counts.order().is_empty());
    }

    /// Plugin whose init hook parks until the test releases it.
    struct Gated {
        entered: Arc<std::sync::Barrier>,
        release: Arc<std::sync::Barrier>,
    }

    impl ConverterPlugin for Gated {
        fn init(&mut self) -> crate::plugin::interface::PluginResult<()> {
            self.entered.wait();
            self.release.wait();
            Ok(())
        }

        fn implementation_id(&self) -> String {
            "gated".to_string()
        }
    }

    #[test]
    fn test_records_transition_independently() {
        let entered = Arc::new(std::sync::Barrier::new(2));
        let release = Arc::new(std::sync::Barrier::new(2));
        let gated = PluginRecord::new(
            Box::new(Gated {
                entered: entered.clone(),
                release: release.clone(),
            }),
            ListenerSet::new(),
            false,
        );
        let (other, _) = record_with(ProbePlugin::new("png"));

        std::thread::scope(|scope| {
            let blocked = scope.spawn(|| gated.initialize());

            // The gated record now holds its own lock inside the init hook
            entered.wait();
            other.initialize().unwrap();
            other.enable().unwrap();
            assert_eq!(other.state(), PluginState::Enabled);

            release.wait();
            blocked.join().unwrap().unwrap();
        });

        assert_eq!(gated.state(), PluginState::Initialized);
    }

    #[test]
    fn test_concurrent_initialize_runs_hook_once() {
        let plugin = ProbePlugin::new("png");
        let counts = plugin.counts();
        let (record, recorder) = record_with(plugin);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let record = record.clone();
                scope.spawn(move || record.initialize().unwrap());
            }
        });

        assert_eq!(counts.get(LifecycleOp::Initialize), 1);
        assert_eq!(recorder.count(LifecycleEvent::Initialized), 1);
        assert_eq!(record.state(), PluginState::Initialized);
    }

    #[test]
    fn test_import_requires_enabled() {
        let plugin = ProbePlugin::new("png").accepting("image/png");
        let counts = plugin.counts();
        let (record, _) = record_with(plugin);
        let payload = DropPayload::files(["/tmp/a.png"]).with_mime_type("image/png");

        record.initialize().unwrap();
        assert!(!record.can_import(&payload));
        assert!(matches!(record.import(&payload), Err(Error::NotEnabled(_))));

        record.enable().unwrap();
        assert!(record.can_import(&payload));
        assert!(!record.can_import(&DropPayload::text("hello")));
        assert!(record.import(&payload).unwrap());
        assert_eq!(counts.imports(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PluginState::Enabled.to_string(), "enabled");
        assert_eq!(LifecycleOp::Destroy.to_string(), "destroy");
        assert!(PluginState::Enabled.is_initialized());
        assert!(!PluginState::Destroyed.is_initialized());
    }
}
