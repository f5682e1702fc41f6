//! Injected override script
//!
//! The override unit rendered as JavaScript, for installation into a real
//! page before any of its own scripts run. Values are serialized from the
//! same constants the in-process unit uses.

use serde_json::json;

use crate::stealth::signals::{
    Signal, SPOOFED_LANGUAGES, SPOOFED_PLUGINS, SPOOFED_WEBGL_RENDERER, SPOOFED_WEBGL_VENDOR,
    UNMASKED_RENDERER_WEBGL, UNMASKED_VENDOR_WEBGL,
};

/// Redefine a `navigator` accessor to return a constant
fn accessor_script(signal: Signal, literal: &str) -> String {
    format!(
        r#"
Object.defineProperty({owner}, '{property}', {{
    get: function () {{
        return {literal};
    }},
    configurable: true
}});
"#,
        owner = signal.owner(),
        property = signal.property(),
        literal = literal,
    )
}

/// Shadow `getParameter`; the original is called with the page's receiver
fn webgl_script() -> String {
    let signal = Signal::WebGlParameter;
    format!(
        r#"
const getParameter = {owner}.prototype.{method};
{owner}.prototype.{method} = function (parameter) {{
    // UNMASKED_VENDOR_WEBGL
    if (parameter === {vendor_code}) {{
        return {vendor};
    }}
    // UNMASKED_RENDERER_WEBGL
    if (parameter === {renderer_code}) {{
        return {renderer};
    }}
    return getParameter.call(this, parameter);
}};
"#,
        owner = signal.owner(),
        method = signal.property(),
        vendor_code = UNMASKED_VENDOR_WEBGL,
        renderer_code = UNMASKED_RENDERER_WEBGL,
        vendor = json!(SPOOFED_WEBGL_VENDOR),
        renderer = json!(SPOOFED_WEBGL_RENDERER),
    )
}

/// Script for one signal, guarded so a missing binding only skips itself
pub fn signal_script(signal: Signal) -> String {
    let body = match signal {
        Signal::Languages => accessor_script(signal, &json!(SPOOFED_LANGUAGES).to_string()),
        Signal::Plugins => accessor_script(signal, &json!(SPOOFED_PLUGINS).to_string()),
        Signal::WebGlParameter => webgl_script(),
    };
    format!("try {{{}}} catch (e) {{}}", body)
}

/// The complete override script, all signals in installation order
pub fn override_script() -> String {
    let scripts: Vec<String> = Signal::ALL.iter().map(|s| signal_script(*s)).collect();

    // Wrap in IIFE
    format!("(function(){{{}}})();", scripts.join("\n"))
}
