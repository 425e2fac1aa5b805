//! Core utilities and common types for the converter runtime.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
