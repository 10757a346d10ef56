/// Shorts Limiter - Chrome Extension that caps daily YouTube Shorts
/// Built with Rust + WASM + Yew

mod background;
mod channel;
mod config;
mod content;
mod control;
mod error;
mod js;
mod monitor;
mod observer;
mod page;
mod record;
mod schedule;
mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

use config::LimiterConfig;
use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the page monitor on the video site
#[wasm_bindgen]
pub fn start_monitor() {
    content::start(LimiterConfig::default());
}

// Same, with a JS object overriding parts of the default config
#[wasm_bindgen]
pub fn start_monitor_with_config(config: JsValue) {
    content::start(LimiterConfig::from_js(config));
}

// Start the persistence bridge in the background worker
#[wasm_bindgen]
pub fn start_background() {
    background::start(LimiterConfig::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
