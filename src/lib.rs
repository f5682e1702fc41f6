//! # Sigveil
//!
//! Fixed anti-fingerprinting overrides for three browser signals:
//!
//! | Signal | Reported value |
//! |---|---|
//! | `navigator.languages` | `["en-US", "en"]` |
//! | `navigator.plugins` | `[1, 2, 3, 4, 5]` |
//! | WebGL `getParameter(37445)` / `getParameter(37446)` | `"Intel Open Source Technology Center"` / `"Mesa DRI Intel(R) Ivybridge Mobile "` |
//!
//! Every other `getParameter` code passes through to the browser unchanged.
//!
//! The overrides come in two forms sharing one set of values: an in-process
//! installer over an injected [`HostEnvironment`], and a script installed
//! into live Chrome pages over CDP before any page script runs.
//!
//! ## In-process
//!
//! ```rust
//! use sigveil::{install, PageContext, SignalReport};
//!
//! let mut page = PageContext::chrome_like();
//! let report = install(&mut page);
//! assert!(report.is_complete());
//! SignalReport::collect(&page).verify().unwrap();
//! ```
//!
//! ## Live Chrome
//!
//! ```rust,no_run
//! use sigveil::Browser;
//!
//! #[tokio::main]
//! async fn main() -> sigveil::Result<()> {
//!     let browser = Browser::launch().await?;
//!     let page = browser.new_page("https://example.com").await?;
//!
//!     let signals = page.signals().await?;
//!     println!("{:?}", signals.languages);
//!     signals.verify()?;
//!
//!     browser.close().await?;
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod cdp;
pub mod error;
pub mod host;
pub mod page;
pub mod stealth;

// Re-exports
pub use browser::{find_chrome, Browser};
pub use error::{Error, Result};
pub use host::{HostEnvironment, PageContext};
pub use page::Page;
pub use stealth::{
    install, override_parameter, override_script, InstallReport, Signal, SignalReport,
    SignalValue,
};

/// Environment variable naming the Chrome binary
pub const CHROME_PATH_ENV: &str = "SIGVEIL_CHROME_PATH";

/// Environment variable toggling headless mode (`0`/`false` for a window)
pub const HEADLESS_ENV: &str = "SIGVEIL_HEADLESS";

/// Configuration for launching Chrome
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Headless mode
    pub headless: bool,
    /// Path to Chrome/Chromium binary (None = search well-known locations)
    pub chrome_path: Option<String>,
    /// Custom user agent (None = Chrome's own)
    pub user_agent: Option<String>,
    /// Pass `--disable-gpu`. Without a GPU, WebGL falls back to software or is absent.
    pub disable_gpu: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: None,
            disable_gpu: false,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl LaunchConfig {
    /// Create a visible (non-headless) config
    pub fn visible() -> Self {
        Self {
            headless: false,
            ..Default::default()
        }
    }

    /// Defaults, overridden by `SIGVEIL_CHROME_PATH` and `SIGVEIL_HEADLESS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(CHROME_PATH_ENV).filter(|p| !p.is_empty()) {
            config.chrome_path = Some(path);
        }
        if let Some(flag) = lookup(HEADLESS_ENV) {
            config.headless = !matches!(flag.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
        config
    }
}
