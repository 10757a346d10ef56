/// Limiter configuration: defaults tuned to the host site's markup

use crate::error::LimiterError;
use regex::Regex;
use serde::Deserialize;
use url::Url;
use wasm_bindgen::JsValue;

pub const DEFAULT_LIMIT: u32 = 10;
pub const RESET_INTERVAL_HOURS: i64 = 24;

/// Everything the monitor needs to know about the host page.
///
/// The selectors and element ids track the video site's markup and have to be
/// kept in sync with it by hand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimiterConfig {
    pub default_limit: u32,
    pub reset_interval_hours: i64,
    pub shorts_path_pattern: String,
    pub hidden_selectors: Vec<String>,
    pub media_container: String,
    pub anchor_id: String,
    pub counter_id: String,
    pub counter_value_id: String,
    pub style_id: String,
    pub continuous_silence: bool,
    pub monitor_tab_pattern: String,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        LimiterConfig {
            default_limit: DEFAULT_LIMIT,
            reset_interval_hours: RESET_INTERVAL_HOURS,
            shorts_path_pattern: "^/shorts/".to_string(),
            hidden_selectors: vec![
                "ytd-reel-video-renderer".to_string(),
                "ytd-shorts".to_string(),
                "ytd-reel-shelf-renderer".to_string(),
            ],
            media_container: "ytd-reel-video-renderer".to_string(),
            anchor_id: "end".to_string(),
            counter_id: "yt-shorts-counter".to_string(),
            counter_value_id: "yt-shorts-count-value".to_string(),
            style_id: "youtube-shorts-limiter-style".to_string(),
            continuous_silence: true,
            monitor_tab_pattern: "*://*.youtube.com/*".to_string(),
        }
    }
}

impl LimiterConfig {
    /// Overlay a JS object on the defaults. Missing keys keep their default.
    pub fn from_js(value: JsValue) -> LimiterConfig {
        if value.is_null() || value.is_undefined() {
            return LimiterConfig::default();
        }
        match serde_wasm_bindgen::from_value::<LimiterConfig>(value) {
            Ok(config) => config.or_default(),
            Err(e) => {
                log::warn!("Ignoring invalid limiter config: {}", e);
                LimiterConfig::default()
            }
        }
    }

    /// The limit must be at least 1 and the reset interval at least an hour.
    pub fn validate(&self) -> Result<(), LimiterError> {
        if self.default_limit == 0 {
            return Err(LimiterError::Config(
                "defaultLimit must be greater than 0".to_string(),
            ));
        }
        if self.reset_interval_hours <= 0 {
            return Err(LimiterError::Config(
                "resetIntervalHours must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// This config if it validates, the defaults otherwise.
    pub fn or_default(self) -> LimiterConfig {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                log::warn!("Ignoring invalid limiter config: {}", e);
                LimiterConfig::default()
            }
        }
    }

    /// The page-wide rule that hides every Shorts container.
    pub fn hide_rule(&self) -> String {
        format!(
            "{} {{\n  display: none !important;\n}}\n",
            self.hidden_selectors.join(",\n")
        )
    }

    /// Zero is not a usable limit, so it falls back to the default too.
    pub fn effective_limit(&self, stored: Option<u32>) -> u32 {
        stored.filter(|limit| *limit > 0).unwrap_or(self.default_limit)
    }
}

/// Recognises Shorts routes from a location href.
#[derive(Debug, Clone)]
pub struct ShortsMatcher {
    pattern: Regex,
}

impl ShortsMatcher {
    pub fn new(config: &LimiterConfig) -> Result<ShortsMatcher, LimiterError> {
        let pattern = Regex::new(&config.shorts_path_pattern)
            .map_err(|e| LimiterError::Config(format!("shortsPathPattern: {}", e)))?;
        Ok(ShortsMatcher { pattern })
    }

    pub fn is_short(&self, href: &str) -> bool {
        match Url::parse(href) {
            Ok(url) => self.pattern.is_match(url.path()),
            // Not an absolute URL: treat it as a bare path
            Err(_) => self.pattern.is_match(href),
        }
    }
}
