//! Signal override unit
//!
//! Installs the three fixed overrides into a [`HostEnvironment`]. Each
//! installation is independent: a host missing one binding still gets the
//! other two.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::host::{Getter, HostEnvironment, ParameterQuery};
use crate::stealth::signals::{
    spoofed_languages, spoofed_plugins, Signal, SignalValue, SPOOFED_WEBGL_RENDERER,
    SPOOFED_WEBGL_VENDOR, UNMASKED_RENDERER_WEBGL, UNMASKED_VENDOR_WEBGL,
};

/// Answer a WebGL parameter query: the two unmasked codes get fixed strings,
/// everything else goes to `original` unchanged.
pub fn override_parameter<F>(original: F, parameter: u32) -> SignalValue
where
    F: Fn(u32) -> SignalValue,
{
    match parameter {
        UNMASKED_VENDOR_WEBGL => SignalValue::from(SPOOFED_WEBGL_VENDOR),
        UNMASKED_RENDERER_WEBGL => SignalValue::from(SPOOFED_WEBGL_RENDERER),
        other => original(other),
    }
}

/// Compose [`override_parameter`] with a captured original
pub fn wrap_get_parameter(original: ParameterQuery) -> ParameterQuery {
    Arc::new(move |parameter| override_parameter(&*original, parameter))
}

/// Make every read of `navigator.languages` return `["en-US", "en"]`
pub fn install_languages(host: &mut dyn HostEnvironment) -> Result<()> {
    install_constant(host, Signal::Languages, spoofed_languages())
}

/// Make every read of `navigator.plugins` return `[1, 2, 3, 4, 5]`
pub fn install_plugins(host: &mut dyn HostEnvironment) -> Result<()> {
    install_constant(host, Signal::Plugins, spoofed_plugins())
}

fn install_constant(host: &mut dyn HostEnvironment, signal: Signal, value: SignalValue) -> Result<()> {
    let getter: Getter = Arc::new(move || value.clone());
    host.define_accessor(signal.owner(), signal.property(), getter)
}

/// Shadow `WebGLRenderingContext.prototype.getParameter` with the spoofing wrapper.
///
/// The current method is captured first and only ever called, never mutated.
/// Installing twice wraps the previous wrapper, so pass-through still ends
/// at the native method.
pub fn install_webgl(host: &mut dyn HostEnvironment) -> Result<()> {
    let signal = Signal::WebGlParameter;
    let original = host.method(signal.owner(), signal.property())?;
    host.replace_method(signal.owner(), signal.property(), wrap_get_parameter(original))
}

/// Install a single signal's override
pub fn install_signal(host: &mut dyn HostEnvironment, signal: Signal) -> Result<()> {
    match signal {
        Signal::Languages => install_languages(host),
        Signal::Plugins => install_plugins(host),
        Signal::WebGlParameter => install_webgl(host),
    }
}

/// Outcome of installing every override into one host
#[derive(Debug, Default)]
pub struct InstallReport {
    installed: Vec<Signal>,
    failed: Vec<(Signal, Error)>,
}

impl InstallReport {
    /// Signals whose override is now in place
    pub fn installed(&self) -> &[Signal] {
        &self.installed
    }

    /// Signals that could not be overridden, with the reason
    pub fn failed(&self) -> &[(Signal, Error)] {
        &self.failed
    }

    pub fn is_installed(&self, signal: Signal) -> bool {
        self.installed.contains(&signal)
    }

    /// All three overrides went in
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fail with the first installation error, if any
    pub fn into_result(self) -> Result<Vec<Signal>> {
        match self.failed.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.installed),
        }
    }
}

/// Install all overrides, each in its own failure boundary
pub fn install(host: &mut dyn HostEnvironment) -> InstallReport {
    let mut report = InstallReport::default();

    for signal in Signal::ALL {
        match install_signal(host, signal) {
            Ok(()) => {
                tracing::debug!("Installed override for {}", signal);
                report.installed.push(signal);
            }
            Err(e) => {
                tracing::warn!("Skipping override for {}: {}", signal, e);
                report.failed.push((signal, e));
            }
        }
    }

    tracing::info!(
        "Signal overrides installed: {}/{}",
        report.installed.len(),
        Signal::ALL.len()
    );
    report
}
