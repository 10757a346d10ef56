/// Durable store access: chrome.storage.sync behind a small async trait

use crate::error::{LimiterError, describe};
use crate::js;
use crate::record::StoredRecord;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = get)]
    async fn sync_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = set)]
    async fn sync_set(items: JsValue) -> Result<JsValue, JsValue>;
}

/// Per-key last-writer-wins key/value persistence.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn load(&self) -> Result<StoredRecord, LimiterError>;

    /// Write only the keys present in `patch`.
    async fn save(&self, patch: StoredRecord) -> Result<(), LimiterError>;
}

impl<S: Store> Store for Rc<S> {
    async fn load(&self) -> Result<StoredRecord, LimiterError> {
        (**self).load().await
    }

    async fn save(&self, patch: StoredRecord) -> Result<(), LimiterError> {
        (**self).save(patch).await
    }
}

/// `chrome.storage.sync`, available to the page script, the background worker
/// and the popup alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl Store for ChromeStore {
    async fn load(&self) -> Result<StoredRecord, LimiterError> {
        let keys = js::to_js(&StoredRecord::KEYS).map_err(LimiterError::Storage)?;
        let items = sync_get(keys)
            .await
            .map_err(|e| LimiterError::Storage(format!("Failed to read storage: {}", describe(&e))))?;

        if items.is_null() || items.is_undefined() {
            return Ok(StoredRecord::default());
        }
        js::from_js(items).map_err(LimiterError::Storage)
    }

    async fn save(&self, patch: StoredRecord) -> Result<(), LimiterError> {
        let items = js::to_js(&patch).map_err(LimiterError::Storage)?;
        sync_set(items)
            .await
            .map_err(|e| LimiterError::Storage(format!("Failed to write storage: {}", describe(&e))))?;
        Ok(())
    }
}
