//! Extractor tuning knobs.
//!
//! Every value here is calibration data tuned against real sites. Defaults are
//! kept as named constants; each one can be overridden through an
//! `EXTRACTOR_*` environment variable (see [`ExtractorConfig::from_env`]).

use std::time::Duration;

pub const DEFAULT_MAX_SCROLL_STEPS: u32 = 5;
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 500;
pub const DEFAULT_POST_SCROLL_SETTLE_MS: u64 = 2000;
pub const DEFAULT_HYDRATION_WAIT_MS: u64 = 4000;
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ICON_MAX_WIDTH: u32 = 50;
pub const DEFAULT_HERO_MIN: (u32, u32) = (800, 400);
pub const DEFAULT_PHOTO_LANDSCAPE_MIN: (u32, u32) = (400, 300);
pub const DEFAULT_PHOTO_PORTRAIT_MIN: (u32, u32) = (300, 400);
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Pixel thresholds used by the role classifier and the noise filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    /// Icons narrower than this are dropped as UI chrome.
    pub icon_max_width: u32,
    /// Strictly larger than this in both dimensions reads as a hero.
    pub hero_min: (u32, u32),
    /// Landscape photo floor (width, height).
    pub photo_landscape_min: (u32, u32),
    /// Portrait photo floor (width, height).
    pub photo_portrait_min: (u32, u32),
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            icon_max_width: DEFAULT_ICON_MAX_WIDTH,
            hero_min: DEFAULT_HERO_MIN,
            photo_landscape_min: DEFAULT_PHOTO_LANDSCAPE_MIN,
            photo_portrait_min: DEFAULT_PHOTO_PORTRAIT_MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Hard cap on lazy-load scroll passes.
    pub max_scroll_steps: u32,
    /// Wait after each scroll pass.
    pub scroll_settle: Duration,
    /// Wait after the scroll loop, before the snapshot.
    pub post_scroll_settle: Duration,
    /// Wait after `body` appears so client-side rendering can finish.
    pub hydration_wait: Duration,
    pub navigation_timeout: Duration,
    pub user_agent: String,
    pub thresholds: Thresholds,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_scroll_steps: DEFAULT_MAX_SCROLL_STEPS,
            scroll_settle: Duration::from_millis(DEFAULT_SCROLL_SETTLE_MS),
            post_scroll_settle: Duration::from_millis(DEFAULT_POST_SCROLL_SETTLE_MS),
            hydration_wait: Duration::from_millis(DEFAULT_HYDRATION_WAIT_MS),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl ExtractorConfig {
    /// Load overrides from the environment. Missing or unparsable values fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let size = |key: &str| lookup(key).and_then(|s| parse_size(&s));

        let max_scroll_steps = number("EXTRACTOR_MAX_SCROLL_STEPS")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.max_scroll_steps);
        let scroll_settle = number("EXTRACTOR_SCROLL_SETTLE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.scroll_settle);
        let post_scroll_settle = number("EXTRACTOR_POST_SCROLL_SETTLE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.post_scroll_settle);
        let hydration_wait = number("EXTRACTOR_HYDRATION_WAIT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.hydration_wait);
        let navigation_timeout = number("EXTRACTOR_NAVIGATION_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.navigation_timeout);
        let user_agent = lookup("EXTRACTOR_USER_AGENT")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.user_agent);
        let icon_max_width = number("EXTRACTOR_ICON_MAX_WIDTH")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.thresholds.icon_max_width);
        let hero_min = size("EXTRACTOR_HERO_MIN").unwrap_or(defaults.thresholds.hero_min);
        let photo_landscape_min =
            size("EXTRACTOR_PHOTO_LANDSCAPE_MIN").unwrap_or(defaults.thresholds.photo_landscape_min);
        let photo_portrait_min =
            size("EXTRACTOR_PHOTO_PORTRAIT_MIN").unwrap_or(defaults.thresholds.photo_portrait_min);

        Self {
            max_scroll_steps,
            scroll_settle,
            post_scroll_settle,
            hydration_wait,
            navigation_timeout,
            user_agent,
            thresholds: Thresholds {
                icon_max_width,
                hero_min,
                photo_landscape_min,
                photo_portrait_min,
            },
        }
    }

    /// Zero every fixed delay. Used by tests and offline runs.
    pub fn without_delays(mut self) -> Self {
        self.scroll_settle = Duration::ZERO;
        self.post_scroll_settle = Duration::ZERO;
        self.hydration_wait = Duration::ZERO;
        self
    }
}

/// `"800x400"` style size, width first.
fn parse_size(value: &str) -> Option<(u32, u32)> {
    let value = value.trim().to_ascii_lowercase();
    let (width, height) = value.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

/// Address the HTTP service listens on.
pub fn bind_addr() -> String {
    std::env::var("EXTRACTOR_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}
