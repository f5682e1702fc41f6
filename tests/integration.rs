//! Integration tests for sigveil
//!
//! The host-level tests always run. Chrome-backed tests require Chrome:
//! run with `cargo test --test integration -- --ignored`

use std::sync::Arc;

use sigveil::host::ParameterQuery;
use sigveil::stealth::overrides::{install_languages, install_plugins, install_webgl};
use sigveil::stealth::signals::{spoofed_languages, spoofed_plugins};
use sigveil::{
    install, override_script, Browser, HostEnvironment, LaunchConfig, PageContext, Signal,
    SignalReport, SignalValue,
};

const WEBGL: &str = "WebGLRenderingContext";

/// Native getParameter that answers every code distinctly
fn vendor_specific(parameter: u32) -> SignalValue {
    SignalValue::Str(format!("native-{}", parameter))
}

fn chrome_available() -> bool {
    sigveil::find_chrome().is_ok() || LaunchConfig::from_env().chrome_path.is_some()
}

// =========================================================================
// In-process host
// =========================================================================

#[test]
fn test_end_to_end_scenario_in_process() {
    let mut page = PageContext::builder()
        .navigator(vec!["ja-JP", "ja"], vec!["PDF Viewer"])
        .webgl(vendor_specific)
        .build();

    assert!(install(&mut page).is_complete());

    assert_eq!(page.read("navigator", "languages").unwrap(), spoofed_languages());
    assert_eq!(page.read("navigator", "plugins").unwrap(), spoofed_plugins());
    assert_eq!(
        page.call(WEBGL, "getParameter", 37445).unwrap().as_str(),
        Some("Intel Open Source Technology Center")
    );
    assert_eq!(
        page.call(WEBGL, "getParameter", 37446).unwrap().as_str(),
        Some("Mesa DRI Intel(R) Ivybridge Mobile ")
    );
    assert_eq!(
        page.call(WEBGL, "getParameter", 7939).unwrap().as_str(),
        Some("native-7939")
    );
}

#[test]
fn test_reads_are_deterministic() {
    let mut page = PageContext::chrome_like();
    install(&mut page);

    let first = SignalReport::collect(&page);
    for _ in 0..100 {
        assert_eq!(SignalReport::collect(&page), first);
    }
}

#[test]
fn test_passthrough_fidelity_over_range() {
    let mut page = PageContext::builder().webgl(vendor_specific).build();
    install_webgl(&mut page).unwrap();

    for parameter in (0..40_000).step_by(7).chain([37444, 37447, u32::MAX]) {
        let got = page.call(WEBGL, "getParameter", parameter).unwrap();
        if parameter == 37445 || parameter == 37446 {
            continue;
        }
        assert_eq!(got, vendor_specific(parameter));
    }
}

#[test]
fn test_individual_installers() {
    let mut page = PageContext::chrome_like();

    install_plugins(&mut page).unwrap();
    assert_eq!(page.read("navigator", "plugins").unwrap(), spoofed_plugins());
    assert_ne!(page.read("navigator", "languages").unwrap(), spoofed_languages());

    install_languages(&mut page).unwrap();
    assert_eq!(page.read("navigator", "languages").unwrap(), spoofed_languages());
}

#[test]
fn test_reinstall_wraps_previous_override() {
    let mut page = PageContext::builder()
        .navigator(Vec::<&str>::new(), Vec::<i64>::new())
        .webgl(vendor_specific)
        .build();

    for _ in 0..3 {
        assert!(install(&mut page).is_complete());
    }

    assert_eq!(
        page.call(WEBGL, "getParameter", 37446).unwrap().as_str(),
        Some("Mesa DRI Intel(R) Ivybridge Mobile ")
    );
    assert_eq!(
        page.call(WEBGL, "getParameter", 3379).unwrap(),
        vendor_specific(3379)
    );
}

#[test]
fn test_empty_host_fails_every_signal_independently() {
    let mut page = PageContext::new();
    let report = install(&mut page);

    assert!(report.installed().is_empty());
    let failed: Vec<Signal> = report.failed().iter().map(|(s, _)| *s).collect();
    assert_eq!(failed, Signal::ALL.to_vec());
    assert!(report.failed().iter().all(|(_, e)| e.is_not_found()));
}

/// A host that exposes everything but refuses to redefine navigator accessors
struct FrozenNavigator(PageContext);

impl HostEnvironment for FrozenNavigator {
    fn define_accessor(
        &mut self,
        object: &str,
        property: &str,
        _getter: sigveil::host::Getter,
    ) -> sigveil::Result<()> {
        Err(sigveil::Error::not_found(format!("{}.{}", object, property)))
    }

    fn method(&self, class: &str, name: &str) -> sigveil::Result<ParameterQuery> {
        self.0.method(class, name)
    }

    fn replace_method(
        &mut self,
        class: &str,
        name: &str,
        method: ParameterQuery,
    ) -> sigveil::Result<()> {
        self.0.replace_method(class, name, method)
    }
}

#[test]
fn test_custom_host_environment() {
    let mut host = FrozenNavigator(PageContext::chrome_like());
    let report = install(&mut host);

    assert_eq!(report.installed(), &[Signal::WebGlParameter]);
    assert_eq!(report.failed().len(), 2);

    let query: ParameterQuery = host.method(WEBGL, "getParameter").unwrap();
    assert_eq!(query(37445).as_str(), Some("Intel Open Source Technology Center"));
    assert!(!Arc::ptr_eq(
        &query,
        &PageContext::chrome_like().method(WEBGL, "getParameter").unwrap()
    ));
}

#[test]
fn test_script_and_in_process_agree() {
    let script = override_script();
    let languages = serde_json::to_string(&spoofed_languages()).unwrap();
    let plugins = serde_json::to_string(&spoofed_plugins()).unwrap();
    assert!(script.contains(&languages));
    assert!(script.contains(&plugins));
}

#[test]
fn test_launch_with_missing_binary_fails() {
    let config = LaunchConfig {
        chrome_path: Some("/nonexistent/sigveil/chrome".into()),
        ..Default::default()
    };
    let result = tokio_test::block_on(Browser::launch_with_config(config));
    assert!(matches!(result, Err(sigveil::Error::Launch(_))));
}

// =========================================================================
// Live Chrome
// =========================================================================

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_end_to_end_scenario() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("data:text/html,<title>probe</title>")
        .await
        .expect("Failed to create page");

    let report = page.signals().await.expect("Failed to probe signals");
    assert_eq!(report.languages, spoofed_languages());
    assert_eq!(report.plugins, spoofed_plugins());
    if report.webgl_available {
        assert_eq!(
            report.webgl_vendor.as_str(),
            Some("Intel Open Source Technology Center")
        );
        assert_eq!(
            report.webgl_renderer.as_str(),
            Some("Mesa DRI Intel(R) Ivybridge Mobile ")
        );
    }

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_passthrough_keeps_receiver() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("data:text/html,<body></body>")
        .await
        .expect("Failed to create page");

    // VENDOR is always "WebKit" in Chrome; an unbound call would throw instead
    let vendor: Option<String> = page
        .evaluate(
            "(() => { const gl = document.createElement('canvas').getContext('webgl'); \
             return gl ? gl.getParameter(0x1F00) : null; })()",
        )
        .await
        .expect("Failed to query WebGL");
    if let Some(vendor) = vendor {
        assert_eq!(vendor, "WebKit");
    }

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_double_install() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser.new_blank_page().await.expect("Failed to create page");
    page.session()
        .add_script_to_evaluate_on_new_document(&override_script())
        .await
        .expect("Failed to add second script");
    page.goto("data:text/html,<body></body>")
        .await
        .expect("Failed to navigate");

    let report = page.verify_signals().await.expect("Signals not spoofed");
    assert_eq!(report.plugins, spoofed_plugins());

    browser.close().await.expect("Failed to close browser");
}
