//! Scroll passes that force intersection-observer lazy loaders to fire.

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::{PageSession, ScrollMetrics};
use crate::config::ExtractorConfig;

/// Viewport-sized offsets to visit, capped at `max_steps`.
pub fn plan_scroll_offsets(metrics: ScrollMetrics, max_steps: u32) -> Vec<f64> {
    let viewport = metrics.viewport_height;
    if !viewport.is_finite() || viewport <= 0.0 || !metrics.scroll_height.is_finite() {
        return Vec::new();
    }
    let needed = (metrics.scroll_height.max(0.0) / viewport).ceil() as u32;
    (1..=needed.min(max_steps))
        .map(|step| f64::from(step) * viewport)
        .collect()
}

/// Best-effort: scroll down in viewport steps, pausing after each, then return
/// to the top. Errors are logged and swallowed; extraction works against
/// whatever DOM exists afterwards.
///
/// Returns the number of completed scroll passes.
pub async fn trigger_lazy_load<P: PageSession + ?Sized>(page: &P, config: &ExtractorConfig) -> u32 {
    match scroll_passes(page, config).await {
        Ok(steps) => {
            debug!("lazy-load trigger finished after {} scroll passes", steps);
            steps
        }
        Err(e) => {
            warn!("⚠️ Lazy-load scrolling failed: {:#}", e);
            // Still try to leave the viewport at the top for the caller.
            if let Err(e) = page.scroll_to(0.0) {
                debug!("scroll reset failed: {:#}", e);
            }
            0
        }
    }
}

async fn scroll_passes<P: PageSession + ?Sized>(page: &P, config: &ExtractorConfig) -> Result<u32> {
    let metrics = page.scroll_metrics()?;
    let offsets = plan_scroll_offsets(metrics, config.max_scroll_steps);
    debug!(
        "page height {}px, viewport {}px, {} scroll passes",
        metrics.scroll_height,
        metrics.viewport_height,
        offsets.len()
    );

    let mut completed = 0;
    for y in offsets {
        page.scroll_to(y)?;
        sleep(config.scroll_settle).await;
        completed += 1;
    }
    page.scroll_to(0.0)?;
    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScrollRecorder {
        metrics: Option<(f64, f64)>,
        fail_scroll_after: Option<usize>,
        positions: Mutex<Vec<f64>>,
    }

    impl ScrollRecorder {
        fn new(scroll_height: f64, viewport_height: f64) -> Self {
            Self {
                metrics: Some((scroll_height, viewport_height)),
                fail_scroll_after: None,
                positions: Mutex::new(Vec::new()),
            }
        }

        fn positions(&self) -> Vec<f64> {
            self.positions.lock().unwrap().clone()
        }
    }

    impl PageSession for ScrollRecorder {
        fn evaluate(&self, _script: &str, _await_promise: bool) -> Result<Option<serde_json::Value>> {
            match self.metrics {
                Some((h, v)) => Ok(Some(json!({"scrollHeight": h, "viewportHeight": v}))),
                None => Err(anyhow!("Target closed")),
            }
        }

        fn current_url(&self) -> String {
            "https://acme.test/".to_string()
        }

        fn scroll_to(&self, y: f64) -> Result<()> {
            let mut positions = self.positions.lock().unwrap();
            if let Some(limit) = self.fail_scroll_after {
                if positions.len() >= limit {
                    return Err(anyhow!("Execution context was destroyed"));
                }
            }
            positions.push(y);
            Ok(())
        }
    }

    fn instant() -> ExtractorConfig {
        ExtractorConfig::default().without_delays()
    }

    #[test]
    fn test_plan_caps_at_max_steps() {
        let offsets = plan_scroll_offsets(
            ScrollMetrics {
                scroll_height: 20_000.0,
                viewport_height: 1000.0,
            },
            5,
        );
        assert_eq!(offsets, vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0]);
    }

    #[test]
    fn test_plan_short_page() {
        let offsets = plan_scroll_offsets(
            ScrollMetrics {
                scroll_height: 2500.0,
                viewport_height: 1000.0,
            },
            5,
        );
        assert_eq!(offsets, vec![1000.0, 2000.0, 3000.0]);
    }

    #[test]
    fn test_plan_degenerate_viewport() {
        let metrics = ScrollMetrics {
            scroll_height: 2500.0,
            viewport_height: 0.0,
        };
        assert!(plan_scroll_offsets(metrics, 5).is_empty());
    }

    #[tokio::test]
    async fn test_scrolls_then_returns_to_top() {
        let page = ScrollRecorder::new(3000.0, 1000.0);
        let steps = trigger_lazy_load(&page, &instant()).await;
        assert_eq!(steps, 3);
        assert_eq!(page.positions(), vec![1000.0, 2000.0, 3000.0, 0.0]);
    }

    #[tokio::test]
    async fn test_metrics_failure_is_swallowed() {
        let mut page = ScrollRecorder::new(0.0, 0.0);
        page.metrics = None;
        let steps = trigger_lazy_load(&page, &instant()).await;
        assert_eq!(steps, 0);
        assert_eq!(page.positions(), vec![0.0]);
    }

    #[tokio::test]
    async fn test_scroll_failure_mid_loop_is_swallowed() {
        let mut page = ScrollRecorder::new(10_000.0, 1000.0);
        page.fail_scroll_after = Some(2);
        let steps = trigger_lazy_load(&page, &instant()).await;
        assert_eq!(steps, 0);
        assert_eq!(page.positions(), vec![1000.0, 2000.0]);
    }
}
