//! Host Environment
//!
//! The binding surface the overrides are installed into. A page's global
//! environment is passed in explicitly rather than reached through ambient
//! globals, so the override unit runs the same against a real embedder or
//! the in-memory [`PageContext`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::stealth::signals::SignalValue;

/// A read accessor installed on an object property
pub type Getter = Arc<dyn Fn() -> SignalValue + Send + Sync>;

/// A prototype method taking one integer parameter code (`getParameter`)
pub type ParameterQuery = Arc<dyn Fn(u32) -> SignalValue + Send + Sync>;

/// Mutable binding surface of a page's global environment
pub trait HostEnvironment {
    /// Redefine the read accessor for `object.property`.
    ///
    /// Fails with [`Error::SignalNotFound`] when `object` does not exist.
    fn define_accessor(&mut self, object: &str, property: &str, getter: Getter) -> Result<()>;

    /// Look up `class.prototype.name`.
    ///
    /// Fails with [`Error::SignalNotFound`] when the class or method does not exist.
    fn method(&self, class: &str, name: &str) -> Result<ParameterQuery>;

    /// Shadow `class.prototype.name` with `method`
    fn replace_method(&mut self, class: &str, name: &str, method: ParameterQuery) -> Result<()>;
}

enum Property {
    Data(SignalValue),
    Accessor(Getter),
}

impl Property {
    fn get(&self) -> SignalValue {
        match self {
            Property::Data(value) => value.clone(),
            Property::Accessor(getter) => getter(),
        }
    }
}

/// In-memory page global environment
///
/// Holds named objects with data or accessor properties, and classes whose
/// prototypes carry parameter-query methods.
#[derive(Default)]
pub struct PageContext {
    objects: HashMap<String, HashMap<String, Property>>,
    prototypes: HashMap<String, HashMap<String, ParameterQuery>>,
}

impl PageContext {
    /// An empty environment: no navigator, no WebGL
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PageContextBuilder {
        PageContextBuilder::default()
    }

    /// A desktop-Chrome-looking environment with real (unspoofed) values
    pub fn chrome_like() -> Self {
        Self::builder()
            .navigator(
                vec!["de-DE", "de", "en-US", "en"],
                vec!["PDF Viewer", "Chrome PDF Viewer", "Chromium PDF Viewer"],
            )
            .webgl(native_get_parameter)
            .build()
    }

    /// Read `object.property`. A missing property reads as `Null`.
    pub fn read(&self, object: &str, property: &str) -> Result<SignalValue> {
        let props = self
            .objects
            .get(object)
            .ok_or_else(|| Error::not_found(object))?;
        Ok(props
            .get(property)
            .map(Property::get)
            .unwrap_or(SignalValue::Null))
    }

    /// Call `class.prototype.method(parameter)`
    pub fn call(&self, class: &str, method: &str, parameter: u32) -> Result<SignalValue> {
        let query = self.method(class, method)?;
        Ok(query(parameter))
    }

    pub fn has_object(&self, object: &str) -> bool {
        self.objects.contains_key(object)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.prototypes.contains_key(class)
    }
}

impl HostEnvironment for PageContext {
    fn define_accessor(&mut self, object: &str, property: &str, getter: Getter) -> Result<()> {
        let props = self
            .objects
            .get_mut(object)
            .ok_or_else(|| Error::not_found(object))?;
        props.insert(property.to_string(), Property::Accessor(getter));
        Ok(())
    }

    fn method(&self, class: &str, name: &str) -> Result<ParameterQuery> {
        self.prototypes
            .get(class)
            .and_then(|proto| proto.get(name))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{}.prototype.{}", class, name)))
    }

    fn replace_method(&mut self, class: &str, name: &str, method: ParameterQuery) -> Result<()> {
        let proto = self
            .prototypes
            .get_mut(class)
            .ok_or_else(|| Error::not_found(class))?;
        proto.insert(name.to_string(), method);
        Ok(())
    }
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut objects: Vec<_> = self.objects.keys().collect();
        objects.sort();
        let mut classes: Vec<_> = self.prototypes.keys().collect();
        classes.sort();
        f.debug_struct("PageContext")
            .field("objects", &objects)
            .field("classes", &classes)
            .finish()
    }
}

/// Builder for [`PageContext`]
#[derive(Default)]
pub struct PageContextBuilder {
    context: PageContext,
}

impl PageContextBuilder {
    /// Add a `navigator` object with data properties for languages and plugins
    pub fn navigator(
        mut self,
        languages: impl Into<SignalValue>,
        plugins: impl Into<SignalValue>,
    ) -> Self {
        let props = self
            .context
            .objects
            .entry("navigator".to_string())
            .or_default();
        props.insert("languages".to_string(), Property::Data(languages.into()));
        props.insert("plugins".to_string(), Property::Data(plugins.into()));
        self
    }

    /// Add an arbitrary object with no properties
    pub fn object(mut self, name: &str) -> Self {
        self.context.objects.entry(name.to_string()).or_default();
        self
    }

    /// Add `WebGLRenderingContext` with the given native `getParameter`
    pub fn webgl<F>(mut self, get_parameter: F) -> Self
    where
        F: Fn(u32) -> SignalValue + Send + Sync + 'static,
    {
        self.context
            .prototypes
            .entry("WebGLRenderingContext".to_string())
            .or_default()
            .insert("getParameter".to_string(), Arc::new(get_parameter));
        self
    }

    pub fn build(self) -> PageContext {
        self.context
    }
}

/// `getParameter` as a desktop Chrome on NVIDIA hardware answers it
fn native_get_parameter(parameter: u32) -> SignalValue {
    match parameter {
        // VENDOR / RENDERER / VERSION
        0x1F00 => "WebKit".into(),
        0x1F01 => "WebKit WebGL".into(),
        0x1F02 => "WebGL 1.0 (OpenGL ES 2.0 Chromium)".into(),
        // SHADING_LANGUAGE_VERSION
        0x8B8C => "WebGL GLSL ES 1.0 (OpenGL ES GLSL ES 1.0 Chromium)".into(),
        // MAX_TEXTURE_SIZE
        0x0D33 => SignalValue::Int(16384),
        0x9245 => "Google Inc. (NVIDIA Corporation)".into(),
        0x9246 => {
            "ANGLE (NVIDIA, NVIDIA GeForce RTX 3080 Direct3D11 vs_5_0 ps_5_0, D3D11)".into()
        }
        _ => SignalValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_data_properties() {
        let ctx = PageContext::chrome_like();
        let languages = ctx.read("navigator", "languages").unwrap();
        assert_eq!(languages.as_list().map(|l| l.len()), Some(4));
        assert!(ctx.read("navigator", "doNotTrack").unwrap().is_null());
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let ctx = PageContext::new();
        assert!(ctx.read("navigator", "languages").unwrap_err().is_not_found());
        assert!(ctx
            .call("WebGLRenderingContext", "getParameter", 37445)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_define_accessor_requires_object() {
        let mut ctx = PageContext::new();
        let getter: Getter = Arc::new(|| SignalValue::Int(1));
        assert!(ctx
            .define_accessor("navigator", "plugins", getter.clone())
            .is_err());

        let mut ctx = PageContext::builder().object("navigator").build();
        ctx.define_accessor("navigator", "plugins", getter).unwrap();
        assert_eq!(ctx.read("navigator", "plugins").unwrap(), SignalValue::Int(1));
    }

    #[test]
    fn test_replace_method_shadows() {
        let mut ctx = PageContext::chrome_like();
        let native = ctx.method("WebGLRenderingContext", "getParameter").unwrap();
        ctx.replace_method(
            "WebGLRenderingContext",
            "getParameter",
            Arc::new(|_| SignalValue::Null),
        )
        .unwrap();
        assert!(ctx
            .call("WebGLRenderingContext", "getParameter", 0x1F00)
            .unwrap()
            .is_null());
        // The captured original is untouched
        assert_eq!(native(0x1F00), SignalValue::from("WebKit"));
    }

    #[test]
    fn test_replace_method_requires_class() {
        let mut ctx = PageContext::new();
        let err = ctx
            .replace_method("WebGLRenderingContext", "getParameter", Arc::new(|_| SignalValue::Null))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
