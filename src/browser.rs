//! Headless Chrome boundary.
//!
//! The pipeline never touches `headless_chrome` directly: it talks to a
//! [`PageSession`], which is a single structured call into the page
//! ("evaluate this script, hand back serialized JSON") plus scroll control.
//! [`ChromePage`] is the production implementation; tests script their own.

use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;

pub const SCROLL_METRICS_JS: &str = r#"
    (() => JSON.stringify({
        scrollHeight: Math.max(
            document.body ? document.body.scrollHeight : 0,
            document.documentElement ? document.documentElement.scrollHeight : 0
        ),
        viewportHeight: window.innerHeight
    }))()
"#;

/// Page geometry needed to plan lazy-load scroll passes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub viewport_height: f64,
}

/// The narrow slice of browser automation the extractor depends on.
pub trait PageSession {
    /// Run `script` in the page and return its value, if any.
    fn evaluate(&self, script: &str, await_promise: bool) -> Result<Option<serde_json::Value>>;

    /// URL the page is currently showing.
    fn current_url(&self) -> String;

    fn scroll_to(&self, y: f64) -> Result<()> {
        self.evaluate(&format!("window.scrollTo(0, {});", y.max(0.0).round()), false)?;
        Ok(())
    }

    fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        evaluate_json(self, SCROLL_METRICS_JS)
    }
}

/// Evaluate a script that returns `JSON.stringify(...)` and decode the payload.
pub fn evaluate_json<T, P>(page: &P, script: &str) -> Result<T>
where
    T: DeserializeOwned,
    P: PageSession + ?Sized,
{
    match page.evaluate(script, false)? {
        Some(serde_json::Value::String(raw)) => {
            serde_json::from_str(&raw).context("page script returned malformed JSON")
        }
        Some(other) => serde_json::from_value(other).context("page script returned an unexpected shape"),
        None => Err(anyhow!("page script returned no value")),
    }
}

/// An owned headless Chrome process. Dropping it shuts the browser down, so it
/// must outlive every [`ChromePage`] opened from it.
pub struct ChromeBrowser {
    browser: Browser,
}

impl ChromeBrowser {
    pub fn launch(config: &ExtractorConfig) -> Result<Self> {
        let ua_arg = format!("--user-agent={}", config.user_agent);
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--window-position=0,0"),
            OsStr::new("--hide-scrollbars"),
            OsStr::new("--headless=new"),
            OsStr::new(&ua_arg),
        ];

        let browser = Browser::new(LaunchOptions {
            headless: false, // new headless mode is selected via args
            window_size: Some((1920, 1080)),
            idle_browser_timeout: config.navigation_timeout + Duration::from_secs(60),
            args,
            ..Default::default()
        })
        .context("failed to launch headless Chrome")?;

        debug!("Chrome launched");
        Ok(Self { browser })
    }

    /// Open `url` in a fresh tab and wait until client-rendered content is
    /// likely present.
    pub async fn open(&self, url: &str, config: &ExtractorConfig) -> Result<ChromePage> {
        let tab = self.browser.new_tab().context("failed to open a browser tab")?;
        tab.set_default_timeout(config.navigation_timeout);

        info!("🌐 Navigating to {}", url);
        tab.navigate_to(url)
            .with_context(|| format!("navigation to {url} failed"))?;

        // Soft wait: ads and trackers often hold the load event hostage.
        match tab.wait_for_element_with_custom_timeout("body", config.navigation_timeout) {
            Ok(_) => debug!("page body present"),
            Err(e) => warn!("⚠️ body wait timed out: {}. Extracting anyway", e),
        }

        // Hydration
        sleep(config.hydration_wait).await;

        Ok(ChromePage { tab })
    }
}

/// A navigated Chrome tab.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl PageSession for ChromePage {
    fn evaluate(&self, script: &str, await_promise: bool) -> Result<Option<serde_json::Value>> {
        let result = self.tab.evaluate(script, await_promise)?;
        Ok(result.value)
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedPage {
        reply: Option<serde_json::Value>,
        scripts: Mutex<Vec<String>>,
    }

    impl PageSession for CannedPage {
        fn evaluate(&self, script: &str, _await_promise: bool) -> Result<Option<serde_json::Value>> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(self.reply.clone())
        }

        fn current_url(&self) -> String {
            "https://acme.test/".to_string()
        }
    }

    fn canned(reply: Option<serde_json::Value>) -> CannedPage {
        CannedPage {
            reply,
            scripts: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_evaluate_json_decodes_stringified_payload() {
        let page = canned(Some(json!(r#"{"scrollHeight": 4200, "viewportHeight": 900}"#)));
        let metrics = page.scroll_metrics().unwrap();
        assert_eq!(metrics.scroll_height, 4200.0);
        assert_eq!(metrics.viewport_height, 900.0);
    }

    #[test]
    fn test_evaluate_json_accepts_plain_objects() {
        let page = canned(Some(json!({"scrollHeight": 10, "viewportHeight": 5})));
        let metrics: ScrollMetrics = evaluate_json(&page, SCROLL_METRICS_JS).unwrap();
        assert_eq!(metrics.viewport_height, 5.0);
    }

    #[test]
    fn test_evaluate_json_errors_without_value() {
        let page = canned(None);
        assert!(page.scroll_metrics().is_err());
    }

    #[test]
    fn test_scroll_to_clamps_negative_offsets() {
        let page = canned(None);
        page.scroll_to(-40.0).unwrap();
        page.scroll_to(1799.6).unwrap();
        let scripts = page.scripts.lock().unwrap();
        assert_eq!(scripts[0], "window.scrollTo(0, 0);");
        assert_eq!(scripts[1], "window.scrollTo(0, 1800);");
    }
}
