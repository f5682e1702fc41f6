//! Launch Chrome, open a page and print what it sees for each overridden signal
//!
//! Run with: cargo run --example verify_signals -- [url]

use sigveil::{Browser, LaunchConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data:text/html,<title>sigveil</title>".to_string());

    let browser = Browser::launch_with_config(LaunchConfig::from_env()).await?;
    println!("Browser version: {}", browser.version().await?);

    let page = browser.new_page(&url).await?;
    let report = page.signals().await?;

    println!("navigator.languages : {}", report.languages);
    println!("navigator.plugins   : {}", report.plugins);
    if report.webgl_available {
        println!("unmasked vendor     : {}", report.webgl_vendor);
        println!("unmasked renderer   : {}", report.webgl_renderer);
        println!("getParameter(7939)  : {}", report.passthrough);
    } else {
        println!("WebGL               : unavailable");
    }

    match report.verify() {
        Ok(()) => println!("All signals spoofed"),
        Err(e) => println!("Verification failed: {}", e),
    }

    browser.close().await?;
    Ok(())
}
