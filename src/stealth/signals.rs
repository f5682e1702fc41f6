//! Spoofed signal values
//!
//! The fixed values every page reader sees once the overrides are installed,
//! and the value type hosts use to hand signals back.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reported browser locale list
pub const SPOOFED_LANGUAGES: [&str; 2] = ["en-US", "en"];

/// Reported plugin list. Placeholder entries, not plugin descriptors.
pub const SPOOFED_PLUGINS: [i64; 5] = [1, 2, 3, 4, 5];

/// `UNMASKED_VENDOR_WEBGL` from `WEBGL_debug_renderer_info`
pub const UNMASKED_VENDOR_WEBGL: u32 = 37445;

/// `UNMASKED_RENDERER_WEBGL` from `WEBGL_debug_renderer_info`
pub const UNMASKED_RENDERER_WEBGL: u32 = 37446;

/// Vendor string returned for [`UNMASKED_VENDOR_WEBGL`]
pub const SPOOFED_WEBGL_VENDOR: &str = "Intel Open Source Technology Center";

/// Renderer string returned for [`UNMASKED_RENDERER_WEBGL`] (trailing space included)
pub const SPOOFED_WEBGL_RENDERER: &str = "Mesa DRI Intel(R) Ivybridge Mobile ";

/// A value read from a page: an accessor result or a parameter query result.
///
/// Covers every JSON shape `Runtime.evaluate` returns by value, so the same
/// type describes in-process hosts and real pages. Typed arrays such as
/// `MAX_VIEWPORT_DIMS` come back as index-keyed objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<SignalValue>),
    Map(BTreeMap<String, SignalValue>),
}

impl SignalValue {
    /// Borrow the string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the list payload, if any
    pub fn as_list(&self) -> Option<&[SignalValue]> {
        match self {
            SignalValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the object payload, if any
    pub fn as_map(&self) -> Option<&BTreeMap<String, SignalValue>> {
        match self {
            SignalValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SignalValue::Null)
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Null => f.write_str("null"),
            SignalValue::Bool(b) => write!(f, "{}", b),
            SignalValue::Int(i) => write!(f, "{}", i),
            SignalValue::Float(x) => write!(f, "{}", x),
            SignalValue::Str(s) => write!(f, "{:?}", s),
            SignalValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            SignalValue::Map(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{:?}:{}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for SignalValue {
    fn from(s: &str) -> Self {
        SignalValue::Str(s.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(s: String) -> Self {
        SignalValue::Str(s)
    }
}

impl From<i64> for SignalValue {
    fn from(i: i64) -> Self {
        SignalValue::Int(i)
    }
}

impl From<bool> for SignalValue {
    fn from(b: bool) -> Self {
        SignalValue::Bool(b)
    }
}

impl<T: Into<SignalValue>> From<Vec<T>> for SignalValue {
    fn from(items: Vec<T>) -> Self {
        SignalValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// `["en-US", "en"]` as a signal value
pub fn spoofed_languages() -> SignalValue {
    SPOOFED_LANGUAGES.to_vec().into()
}

/// `[1, 2, 3, 4, 5]` as a signal value
pub fn spoofed_plugins() -> SignalValue {
    SPOOFED_PLUGINS.to_vec().into()
}

/// The fingerprinting signals this crate overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Languages,
    Plugins,
    WebGlParameter,
}

impl Signal {
    /// All signals, in installation order
    pub const ALL: [Signal; 3] = [Signal::Languages, Signal::Plugins, Signal::WebGlParameter];

    /// Object (or class, for prototype methods) owning the binding
    pub fn owner(self) -> &'static str {
        match self {
            Signal::Languages | Signal::Plugins => "navigator",
            Signal::WebGlParameter => "WebGLRenderingContext",
        }
    }

    /// Property or method name of the binding
    pub fn property(self) -> &'static str {
        match self {
            Signal::Languages => "languages",
            Signal::Plugins => "plugins",
            Signal::WebGlParameter => "getParameter",
        }
    }

    /// Fully qualified binding path, as a page script would spell it
    pub fn binding(self) -> &'static str {
        match self {
            Signal::Languages => "navigator.languages",
            Signal::Plugins => "navigator.plugins",
            Signal::WebGlParameter => "WebGLRenderingContext.prototype.getParameter",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binding())
    }
}
