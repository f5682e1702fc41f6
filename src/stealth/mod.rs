//! Stealth Layer
//!
//! The signal override unit and its renditions:
//! - Spoofed values and the signals they replace
//! - In-process installation over a host environment
//! - JavaScript override script for live pages
//! - Probe for reading the signals back

pub mod overrides;
pub mod probe;
pub mod script;
pub mod signals;

pub use overrides::{install, override_parameter, InstallReport};
pub use probe::{probe_expression, SignalReport, PASSTHROUGH_PARAMETER};
pub use script::{override_script, signal_script};
pub use signals::{Signal, SignalValue};
