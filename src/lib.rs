//! Rig cross-validation library
//!
//! Normalizes a glTF scene and a rig interchange document into comparable
//! skeleton and skin snapshots, then diffs them under numeric tolerance.

pub mod error;
pub mod logging;
pub mod rig;
pub mod settings;

pub use error::{RigError, RigResult, Side};
pub use logging::{LogLevel, ResultExt, init_logging, send_log};
pub use rig::validate_rig;
pub use settings::{ValidationSettings, load_settings, save_settings};
