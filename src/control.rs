/// Popup logic: view and edit the limit, reset the count

use crate::channel::Channel;
use crate::config::LimiterConfig;
use crate::error::LimiterError;
use crate::record::{Request, StoredRecord};
use crate::storage::Store;

pub const LIMIT_SAVED: &str = "Limit saved!";
pub const COUNT_RESET: &str = "Count reset!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelView {
    pub limit: u32,
    pub shorts_watched: u32,
}

/// Read a limit the way a browser reads an integer from a form field: leading
/// whitespace skipped, optional sign, then digits up to the first non-digit.
/// Anything that does not yield a positive integer is rejected.
pub fn parse_limit(input: &str) -> Result<u32, LimiterError> {
    let invalid = || LimiterError::InvalidLimit(input.to_string());

    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];

    if digits.is_empty() || negative {
        return Err(invalid());
    }
    match digits.parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(invalid()),
    }
}

pub struct ControlPanel<S, N> {
    store: S,
    monitors: N,
    config: LimiterConfig,
}

impl<S: Store, N: Channel> ControlPanel<S, N> {
    pub fn new(store: S, monitors: N, config: LimiterConfig) -> ControlPanel<S, N> {
        ControlPanel {
            store,
            monitors,
            config,
        }
    }

    pub async fn load(&self) -> Result<PanelView, LimiterError> {
        let record = self.store.load().await?;
        Ok(PanelView {
            limit: self.config.effective_limit(record.limit),
            shorts_watched: record.watched_or_default(),
        })
    }

    /// Validate and store a new limit. Nothing is written on invalid input.
    pub async fn save_limit(&self, input: &str) -> Result<u32, LimiterError> {
        let limit = parse_limit(input)?;
        self.store.save(StoredRecord::with_limit(limit)).await?;
        log::info!("Limit set to {}", limit);
        Ok(limit)
    }

    /// Zero the stored count and tell open page monitors about it.
    ///
    /// Monitors stamp `lastReset` themselves. With no monitor open the reset still
    /// stands.
    pub async fn reset(&self) -> Result<(), LimiterError> {
        self.store.save(StoredRecord::watched(0)).await?;
        if let Err(e) = self.monitors.send(Request::Reset).await {
            log::warn!("Reset stored but no page monitor was notified: {}", e);
        }
        Ok(())
    }
}
