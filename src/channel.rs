/// Request/response messaging between the extension contexts

use crate::error::{LimiterError, describe};
use crate::js;
use crate::record::{Request, Response};
use std::future::Future;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    async fn runtime_send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_message_listener(callback: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>);

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    async fn tabs_send_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;
}

/// One request, one reply. No timeout, no retry.
#[allow(async_fn_in_trait)]
pub trait Channel {
    async fn send(&self, request: Request) -> Result<Response, LimiterError>;
}

/// `chrome.runtime.sendMessage`: page script or popup to the background worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeChannel;

impl Channel for RuntimeChannel {
    async fn send(&self, request: Request) -> Result<Response, LimiterError> {
        let message = js::to_js(&request).map_err(LimiterError::Channel)?;
        let reply = runtime_send_message(message)
            .await
            .map_err(|e| LimiterError::Channel(describe(&e)))?;
        decode_reply(reply)
    }
}

/// `chrome.tabs.sendMessage` to every open tab on the video site.
///
/// Succeeds when at least one page monitor acknowledged.
#[derive(Debug, Clone)]
pub struct TabsChannel {
    url_pattern: String,
}

#[derive(serde::Deserialize)]
struct TabRef {
    id: Option<i32>,
}

impl TabsChannel {
    pub fn new(url_pattern: impl Into<String>) -> TabsChannel {
        TabsChannel {
            url_pattern: url_pattern.into(),
        }
    }
}

impl Channel for TabsChannel {
    async fn send(&self, request: Request) -> Result<Response, LimiterError> {
        let query = js::to_js(&serde_json::json!({ "url": self.url_pattern }))
            .map_err(LimiterError::Channel)?;
        let tabs_js = tabs_query(query)
            .await
            .map_err(|e| LimiterError::Channel(format!("Failed to query tabs: {}", describe(&e))))?;
        let tabs: Vec<TabRef> = js::from_js(tabs_js).map_err(LimiterError::Channel)?;

        let mut delivered = None;
        let mut last_error = None;
        for tab_id in tabs.into_iter().filter_map(|tab| tab.id) {
            let message = js::to_js(&request).map_err(LimiterError::Channel)?;
            match tabs_send_message(tab_id, message).await {
                Ok(reply) => match decode_reply(reply) {
                    Ok(response) => delivered = Some(response),
                    Err(e) => last_error = Some(e),
                },
                Err(e) => {
                    log::debug!("Tab {} did not take the message: {}", tab_id, describe(&e));
                    last_error = Some(LimiterError::Channel(describe(&e)));
                }
            }
        }

        match (delivered, last_error) {
            (Some(response), _) => Ok(response),
            (None, Some(e)) => Err(e),
            (None, None) => Err(LimiterError::Channel("No page monitor is open".to_string())),
        }
    }
}

fn decode_reply(reply: JsValue) -> Result<Response, LimiterError> {
    if reply.is_null() || reply.is_undefined() {
        return Err(LimiterError::UnexpectedReply("empty reply".to_string()));
    }
    js::from_js(reply).map_err(LimiterError::UnexpectedReply)
}

/// Persist the counter through the background bridge.
pub async fn update_shorts_watched<C: Channel>(channel: &C, count: u32) -> Result<(), LimiterError> {
    match channel.send(Request::UpdateShortsWatched { count }).await? {
        Response::Ack { success: true } => Ok(()),
        other => Err(LimiterError::UnexpectedReply(format!("{:?}", other))),
    }
}

/// Ask the background bridge for the stored limit.
pub async fn get_limit<C: Channel>(channel: &C) -> Result<u32, LimiterError> {
    match channel.send(Request::GetLimit).await? {
        Response::Limit { limit } if limit > 0 => Ok(limit),
        other => Err(LimiterError::UnexpectedReply(format!("{:?}", other))),
    }
}

/// Register `handler` on `chrome.runtime.onMessage`.
///
/// Messages that do not decode as a `Request`, or that the handler declines,
/// are left for other listeners. Accepted ones are answered asynchronously.
pub fn add_request_listener<H, F>(handler: H)
where
    H: Fn(Request) -> Option<F> + 'static,
    F: Future<Output = Response> + 'static,
{
    let callback = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| -> JsValue {
            let request: Request = match js::from_js(message) {
                Ok(request) => request,
                Err(e) => {
                    log::debug!("Ignoring message: {}", e);
                    return JsValue::FALSE;
                }
            };

            let Some(reply) = handler(request) else {
                return JsValue::FALSE;
            };

            spawn_local(async move {
                let response = reply.await;
                match js::to_js(&response) {
                    Ok(value) => {
                        // The sender may be gone already (tab closed, popup dismissed)
                        if let Err(e) = send_response.call1(&JsValue::UNDEFINED, &value) {
                            log::debug!("Reply not delivered: {}", describe(&e));
                        }
                    }
                    Err(e) => log::error!("{}", e),
                }
            });

            // Keep sendResponse alive for the async reply
            JsValue::TRUE
        },
    )
        as Box<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>);

    add_message_listener(&callback);

    // Listeners live for the lifetime of the context
    callback.forget();
}
