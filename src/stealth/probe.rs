//! Signal probe
//!
//! Reads the three signals the way a fingerprinting script would, from a
//! live page or from a [`PageContext`], and checks them against the spoofed
//! values.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::host::PageContext;
use crate::stealth::signals::{
    spoofed_languages, spoofed_plugins, Signal, SignalValue, SPOOFED_WEBGL_RENDERER,
    SPOOFED_WEBGL_VENDOR, UNMASKED_RENDERER_WEBGL, UNMASKED_VENDOR_WEBGL,
};

/// Parameter code used to observe `getParameter` pass-through
pub const PASSTHROUGH_PARAMETER: u32 = 7939;

/// What a page reader observes for each overridden signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalReport {
    pub languages: SignalValue,
    pub plugins: SignalValue,
    /// Whether a WebGL context (or class, in-process) was available to query
    pub webgl_available: bool,
    pub webgl_vendor: SignalValue,
    pub webgl_renderer: SignalValue,
    /// `getParameter(PASSTHROUGH_PARAMETER)`
    pub passthrough: SignalValue,
}

/// JavaScript expression returning a [`SignalReport`] as a plain object
pub fn probe_expression() -> String {
    format!(
        r#"(() => {{
    const report = {{
        languages: navigator.languages ? Array.from(navigator.languages) : null,
        plugins: navigator.plugins
            ? Array.from(navigator.plugins, p => (p !== null && typeof p === 'object') ? p.name : p)
            : null,
        webglAvailable: false,
        webglVendor: null,
        webglRenderer: null,
        passthrough: null
    }};
    try {{
        const gl = document.createElement('canvas').getContext('webgl');
        if (gl) {{
            report.webglAvailable = true;
            report.webglVendor = gl.getParameter({vendor});
            report.webglRenderer = gl.getParameter({renderer});
            report.passthrough = gl.getParameter({passthrough});
        }}
    }} catch (e) {{}}
    return report;
}})()"#,
        vendor = UNMASKED_VENDOR_WEBGL,
        renderer = UNMASKED_RENDERER_WEBGL,
        passthrough = PASSTHROUGH_PARAMETER,
    )
}

impl SignalReport {
    /// Read the signals out of an in-process page. Absent bindings read as `Null`.
    pub fn collect(ctx: &PageContext) -> Self {
        let read = |signal: Signal| {
            ctx.read(signal.owner(), signal.property())
                .unwrap_or(SignalValue::Null)
        };
        let webgl = Signal::WebGlParameter;
        let query = |parameter: u32| {
            ctx.call(webgl.owner(), webgl.property(), parameter)
                .unwrap_or(SignalValue::Null)
        };

        Self {
            languages: read(Signal::Languages),
            plugins: read(Signal::Plugins),
            webgl_available: ctx.has_class(webgl.owner()),
            webgl_vendor: query(UNMASKED_VENDOR_WEBGL),
            webgl_renderer: query(UNMASKED_RENDERER_WEBGL),
            passthrough: query(PASSTHROUGH_PARAMETER),
        }
    }

    /// Every signal that does not carry its spoofed value.
    ///
    /// WebGL checks are skipped when no WebGL context was available.
    pub fn mismatches(&self) -> Vec<Error> {
        let mut expected = vec![
            ("navigator.languages", spoofed_languages(), &self.languages),
            ("navigator.plugins", spoofed_plugins(), &self.plugins),
        ];
        if self.webgl_available {
            expected.push((
                "UNMASKED_VENDOR_WEBGL",
                SignalValue::from(SPOOFED_WEBGL_VENDOR),
                &self.webgl_vendor,
            ));
            expected.push((
                "UNMASKED_RENDERER_WEBGL",
                SignalValue::from(SPOOFED_WEBGL_RENDERER),
                &self.webgl_renderer,
            ));
        }

        expected
            .into_iter()
            .filter(|(_, want, got)| want != *got)
            .map(|(name, want, got)| Error::mismatch(name, want.to_string(), got.to_string()))
            .collect()
    }

    /// Fail with the first mismatch
    pub fn verify(&self) -> Result<()> {
        match self.mismatches().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stealth::overrides::install;

    #[test]
    fn test_unspoofed_page_reports_mismatches() {
        let ctx = PageContext::chrome_like();
        let report = SignalReport::collect(&ctx);
        assert!(report.webgl_available);
        assert_eq!(report.mismatches().len(), 4);
        assert!(matches!(report.verify(), Err(Error::SignalMismatch { .. })));
    }

    #[test]
    fn test_spoofed_page_verifies() {
        let mut ctx = PageContext::chrome_like();
        install(&mut ctx);
        let report = SignalReport::collect(&ctx);
        report.verify().unwrap();
        assert!(report.passthrough.is_null());
    }

    #[test]
    fn test_webgl_skipped_when_unavailable() {
        let mut ctx = PageContext::builder()
            .navigator(vec!["en-GB"], vec!["PDF Viewer"])
            .build();
        install(&mut ctx);
        let report = SignalReport::collect(&ctx);
        assert!(!report.webgl_available);
        assert!(report.webgl_vendor.is_null());
        report.verify().unwrap();
    }

    #[test]
    fn test_report_from_page_json() {
        let json = r#"{
            "languages": ["en-US", "en"],
            "plugins": [1, 2, 3, 4, 5],
            "webglAvailable": true,
            "webglVendor": "Intel Open Source Technology Center",
            "webglRenderer": "Mesa DRI Intel(R) Ivybridge Mobile ",
            "passthrough": null
        }"#;
        let report: SignalReport = serde_json::from_str(json).unwrap();
        report.verify().unwrap();
    }

    #[test]
    fn test_renderer_without_trailing_space_mismatches() {
        let json = r#"{
            "languages": ["en-US", "en"],
            "plugins": [1, 2, 3, 4, 5],
            "webglAvailable": true,
            "webglVendor": "Intel Open Source Technology Center",
            "webglRenderer": "Mesa DRI Intel(R) Ivybridge Mobile",
            "passthrough": null
        }"#;
        let report: SignalReport = serde_json::from_str(json).unwrap();
        let errors = report.mismatches();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("UNMASKED_RENDERER_WEBGL"));
    }

    #[test]
    fn test_probe_expression_queries_codes() {
        let expr = probe_expression();
        assert!(expr.contains("gl.getParameter(37445)"));
        assert!(expr.contains("gl.getParameter(37446)"));
        assert!(expr.contains("gl.getParameter(7939)"));
        assert!(expr.contains("webglAvailable"));
    }
}
