//! Browser Launcher
//!
//! Finds and launches Chrome, and opens pages with the override script
//! installed ahead of every document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cdp::{launch_chrome, Connection, Session, Transport};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::stealth::override_script;
use crate::LaunchConfig;

/// Global counter for unique user data directories
static BROWSER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Find Chrome in the usual install locations for this OS
pub fn find_chrome() -> Result<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "linux") {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[]
    };

    candidates
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .ok_or(Error::ChromeNotFound)
}

/// Chrome command line for a session
pub fn launch_args(config: &LaunchConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--disable-blink-features=AutomationControlled".into(),
        "--no-sandbox".into(),
        "--disable-dev-shm-usage".into(),
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
        "--start-maximized".into(),
        format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ),
    ];

    if let Some(ref user_agent) = config.user_agent {
        args.push(format!("--user-agent={}", user_agent));
    }
    if config.headless {
        args.push("--headless=new".into());
    }
    if config.disable_gpu {
        args.push("--disable-gpu".into());
    }

    args
}

/// A Chrome instance whose pages report the spoofed signals
pub struct Browser {
    connection: Connection,
    /// User data directory (cleaned up on close)
    user_data_dir: PathBuf,
    /// Override script (rendered once)
    override_script: String,
}

impl Browser {
    /// Launch with config from the environment
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(LaunchConfig::from_env()).await
    }

    /// Launch with custom config
    pub async fn launch_with_config(config: LaunchConfig) -> Result<Self> {
        let chrome_path = match &config.chrome_path {
            Some(p) => PathBuf::from(p),
            None => find_chrome()?,
        };

        let instance_id = BROWSER_COUNTER.fetch_add(1, Ordering::Relaxed);
        let user_data_dir = std::env::temp_dir().join(format!(
            "sigveil-{}-{}",
            std::process::id(),
            instance_id
        ));
        let _ = std::fs::remove_dir_all(&user_data_dir);
        std::fs::create_dir_all(&user_data_dir)?;

        match Self::connect(&chrome_path, &config, &user_data_dir).await {
            Ok(connection) => Ok(Self {
                connection,
                user_data_dir,
                override_script: override_script(),
            }),
            Err(e) => {
                let _ = std::fs::remove_dir_all(&user_data_dir);
                Err(e)
            }
        }
    }

    async fn connect(
        chrome_path: &Path,
        config: &LaunchConfig,
        user_data_dir: &Path,
    ) -> Result<Connection> {
        let mut args = launch_args(config);
        args.push(format!("--user-data-dir={}", user_data_dir.display()));

        tracing::info!("Launching Chrome from {:?}", chrome_path);
        let (child, ws_url) = launch_chrome(chrome_path, &args)?;
        let connection = Connection::new(Transport::new(child, &ws_url)?);

        let version = connection.version().await?;
        tracing::info!("Connected to Chrome: {}", version.product);
        Ok(connection)
    }

    /// Open a tab with overrides installed, without navigating
    async fn open_session(&self) -> Result<Session> {
        let target_id = self.connection.create_target("about:blank").await?;
        let session = self.connection.attach_to_target(&target_id).await?;
        session.page_enable().await?;

        // Must precede navigation so the overrides beat page scripts
        let identifier = session
            .add_script_to_evaluate_on_new_document(&self.override_script)
            .await?;
        tracing::debug!(
            "Override script installed on target {} (id={})",
            target_id,
            identifier
        );

        Ok(session)
    }

    /// Create a new page and navigate to URL
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let page = Page::new(self.open_session().await?);
        page.goto(url).await?;
        Ok(page)
    }

    /// Create a new page at about:blank.
    ///
    /// The overrides take effect on the first navigation.
    pub async fn new_blank_page(&self) -> Result<Page> {
        Ok(Page::new(self.open_session().await?))
    }

    /// Get the browser version
    pub async fn version(&self) -> Result<String> {
        Ok(self.connection.version().await?.product)
    }

    /// Close a page's tab
    pub async fn close_page(&self, page: Page) -> Result<bool> {
        self.connection.close_target(page.target_id()).await
    }

    /// Close the browser
    pub async fn close(self) -> Result<()> {
        self.connection.close().await?;
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        // The Transport's Drop impl kills the Chrome process
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
    }
}
