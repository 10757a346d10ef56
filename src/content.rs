/// Boot sequence of the page monitor inside the video site's page

use crate::channel::{RuntimeChannel, add_request_listener};
use crate::config::LimiterConfig;
use crate::monitor::PageMonitor;
use crate::observer::{self, DocumentObserver};
use crate::page::DomPage;
use crate::record::Request;
use crate::schedule::SystemClock;
use crate::storage::ChromeStore;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

type ContentMonitor = PageMonitor<DomPage, RuntimeChannel, ChromeStore, SystemClock>;

pub fn start(config: LimiterConfig) {
    let page = DomPage::new(Rc::new(config.clone()));
    let monitor = match PageMonitor::new(page, RuntimeChannel, ChromeStore, SystemClock, config) {
        Ok(monitor) => Rc::new(monitor),
        Err(e) => {
            log::error!("Shorts limiter not started: {}", e);
            return;
        }
    };

    listen_for_reset(Rc::clone(&monitor));

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        log::error!("Shorts limiter not started: no document");
        return;
    };

    if document.ready_state() == "loading" {
        let on_ready = Closure::once(move || boot(monitor));
        if let Err(e) = document
            .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())
        {
            log::error!("Failed to wait for DOMContentLoaded: {}", crate::error::describe(&e));
        }
        on_ready.forget();
    } else {
        boot(monitor);
    }
}

fn boot(monitor: Rc<ContentMonitor>) {
    {
        let monitor = Rc::clone(&monitor);
        spawn_local(async move {
            monitor.initialize().await;
        });
    }
    // Navigations seen before initialize finishes wait inside on_navigation
    observer::watch(&DocumentObserver, monitor, |task| spawn_local(task));
}

fn listen_for_reset(monitor: Rc<ContentMonitor>) {
    add_request_listener(move |request: Request| {
        if !matches!(request, Request::Reset) {
            return None;
        }
        let monitor = Rc::clone(&monitor);
        Some(async move { monitor.handle_reset().await })
    });
}
