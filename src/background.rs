/// Persistence bridge: the background worker's side of the durable record

use crate::channel::add_request_listener;
use crate::config::LimiterConfig;
use crate::record::{Request, Response, StoredRecord};
use crate::storage::{ChromeStore, Store};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onInstalled"], js_name = addListener)]
    fn add_installed_listener(callback: &Closure<dyn FnMut(JsValue)>);
}

pub struct Bridge<S: Store> {
    store: S,
    config: LimiterConfig,
}

impl<S: Store> Bridge<S> {
    /// An invalid config is replaced by the defaults, so the bridge never answers a limit of 0.
    pub fn new(store: S, config: LimiterConfig) -> Bridge<S> {
        Bridge {
            store,
            config: config.or_default(),
        }
    }

    /// Answer a request meant for the bridge. `reset` goes to page monitors, not here.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        match request {
            Request::UpdateShortsWatched { count } => Some(self.set_counter(count).await),
            Request::GetLimit => Some(Response::Limit {
                limit: self.get_limit().await,
            }),
            Request::Reset => None,
        }
    }

    /// Stored limit, or the default. Never fails.
    pub async fn get_limit(&self) -> u32 {
        match self.store.load().await {
            Ok(record) => self.config.effective_limit(record.limit),
            Err(e) => {
                log::warn!("{}; answering with the default limit", e);
                self.config.default_limit
            }
        }
    }

    pub async fn set_counter(&self, count: u32) -> Response {
        match self.store.save(StoredRecord::watched(count)).await {
            Ok(()) => Response::ack(),
            Err(e) => {
                log::error!("Failed to store shortsWatched={}: {}", count, e);
                Response::Ack { success: false }
            }
        }
    }

    /// Seed the default limit on install/update without touching a user-set one.
    pub async fn on_installed(&self) {
        match self.store.load().await {
            Ok(record) if record.limit.is_some_and(|limit| limit > 0) => {
                log::debug!("Keeping stored limit {:?}", record.limit);
            }
            Ok(_) => match self.store.save(StoredRecord::with_limit(self.config.default_limit)).await {
                Ok(()) => log::info!("Seeded default limit of {}", self.config.default_limit),
                Err(e) => log::error!("Failed to seed default limit: {}", e),
            },
            Err(e) => log::warn!("{}; not seeding the default limit", e),
        }
    }
}

/// Wire the bridge to `chrome.runtime.onMessage` and `chrome.runtime.onInstalled`.
pub fn start(config: LimiterConfig) {
    let bridge = Rc::new(Bridge::new(ChromeStore, config));

    {
        let bridge = Rc::clone(&bridge);
        add_request_listener(move |request: Request| {
            if matches!(request, Request::Reset) {
                return None;
            }
            let bridge = Rc::clone(&bridge);
            Some(async move {
                bridge
                    .handle(request)
                    .await
                    .unwrap_or(Response::Ack { success: false })
            })
        });
    }

    let on_installed = Closure::wrap(Box::new(move |_details: JsValue| {
        let bridge = Rc::clone(&bridge);
        spawn_local(async move {
            bridge.on_installed().await;
        });
    }) as Box<dyn FnMut(JsValue)>);
    add_installed_listener(&on_installed);
    on_installed.forget();

    log::info!("Shorts limiter background bridge started");
}
