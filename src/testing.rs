/// In-memory stand-ins for the browser used by the unit tests

use crate::background::Bridge;
use crate::channel::Channel;
use crate::config::LimiterConfig;
use crate::error::LimiterError;
use crate::page::Page;
use crate::record::{Request, Response, StoredRecord};
use crate::schedule::Clock;
use crate::storage::Store;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures::future::poll_fn;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::task::Poll;

#[derive(Default)]
pub struct MemoryStore {
    record: RefCell<StoredRecord>,
    failing: Cell<bool>,
    slow_loads: Cell<bool>,
}

impl MemoryStore {
    pub fn with(record: StoredRecord) -> MemoryStore {
        MemoryStore {
            record: RefCell::new(record),
            failing: Cell::new(false),
            slow_loads: Cell::new(false),
        }
    }

    /// Every load yields to the executor once before answering.
    pub fn slow_loads(&self, slow: bool) {
        self.slow_loads.set(slow);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn snapshot(&self) -> StoredRecord {
        self.record.borrow().clone()
    }
}

impl Store for MemoryStore {
    async fn load(&self) -> Result<StoredRecord, LimiterError> {
        if self.slow_loads.get() {
            yield_once().await;
        }
        if self.failing.get() {
            return Err(LimiterError::Storage("quota exceeded".to_string()));
        }
        Ok(self.snapshot())
    }

    async fn save(&self, patch: StoredRecord) -> Result<(), LimiterError> {
        if self.failing.get() {
            return Err(LimiterError::Storage("quota exceeded".to_string()));
        }
        self.record.borrow_mut().merge(patch);
        Ok(())
    }
}

async fn yield_once() {
    let mut yielded = false;
    poll_fn(|cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
}

/// Delivers requests straight to a bridge over the shared store.
pub struct BridgeChannel {
    bridge: Bridge<Rc<MemoryStore>>,
    disconnected: Cell<bool>,
    sent: RefCell<Vec<Request>>,
}

impl BridgeChannel {
    pub fn new(store: Rc<MemoryStore>) -> BridgeChannel {
        BridgeChannel {
            bridge: Bridge::new(store, LimiterConfig::default()),
            disconnected: Cell::new(false),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn disconnect(&self, disconnected: bool) {
        self.disconnected.set(disconnected);
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.borrow().clone()
    }
}

impl Channel for BridgeChannel {
    async fn send(&self, request: Request) -> Result<Response, LimiterError> {
        if self.disconnected.get() {
            return Err(LimiterError::Channel(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            ));
        }
        self.sent.borrow_mut().push(request.clone());
        self.bridge
            .handle(request)
            .await
            .ok_or_else(|| LimiterError::UnexpectedReply("no reply".to_string()))
    }
}

/// Records page side effects instead of touching a DOM.
pub struct FakePage {
    pub href: RefCell<String>,
    pub style_rules: Cell<usize>,
    pub silenced: Cell<usize>,
    pub silence_loops: Cell<usize>,
    pub anchor_present: Cell<bool>,
    pub counters: Cell<usize>,
    pub counter_text: RefCell<Option<String>>,
}

impl Default for FakePage {
    fn default() -> Self {
        FakePage {
            href: RefCell::new("https://www.youtube.com/".to_string()),
            style_rules: Cell::new(0),
            silenced: Cell::new(0),
            silence_loops: Cell::new(0),
            anchor_present: Cell::new(true),
            counters: Cell::new(0),
            counter_text: RefCell::new(None),
        }
    }
}

impl FakePage {
    /// The page replaced the anchor element and everything in it.
    pub fn replace_anchor(&self) {
        self.counters.set(0);
        *self.counter_text.borrow_mut() = None;
    }
}

impl Page for FakePage {
    fn href(&self) -> Option<String> {
        Some(self.href.borrow().clone())
    }

    fn apply_hide_style(&self) -> Result<(), LimiterError> {
        if self.style_rules.get() == 0 {
            self.style_rules.set(1);
        }
        Ok(())
    }

    fn remove_hide_style(&self) -> Result<(), LimiterError> {
        self.style_rules.set(0);
        Ok(())
    }

    fn silence_shorts_media(&self) {
        self.silenced.set(self.silenced.get() + 1);
    }

    fn keep_silencing(&self) {
        self.silence_loops.set(self.silence_loops.get() + 1);
    }

    fn insert_counter(&self) -> bool {
        if !self.anchor_present.get() || self.counters.get() > 0 {
            return false;
        }
        self.counters.set(1);
        *self.counter_text.borrow_mut() = Some(String::new());
        true
    }

    fn set_counter_text(&self, count: u32) {
        if self.counters.get() > 0 {
            *self.counter_text.borrow_mut() = Some(count.to_string());
        }
    }
}

pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> FixedClock {
        FixedClock { now: Cell::new(now) }
    }

    pub fn advance(&self, by: TimeDelta) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<K: Clock> Clock for Rc<K> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<P: Page> Page for Rc<P> {
    fn href(&self) -> Option<String> {
        (**self).href()
    }

    fn apply_hide_style(&self) -> Result<(), LimiterError> {
        (**self).apply_hide_style()
    }

    fn remove_hide_style(&self) -> Result<(), LimiterError> {
        (**self).remove_hide_style()
    }

    fn silence_shorts_media(&self) {
        (**self).silence_shorts_media()
    }

    fn keep_silencing(&self) {
        (**self).keep_silencing()
    }

    fn insert_counter(&self) -> bool {
        (**self).insert_counter()
    }

    fn set_counter_text(&self, count: u32) {
        (**self).set_counter_text(count)
    }
}

impl<C: Channel> Channel for Rc<C> {
    async fn send(&self, request: Request) -> Result<Response, LimiterError> {
        (**self).send(request).await
    }
}

/// Resolves on the next animation frame, after pending mutation callbacks.
#[cfg(target_arch = "wasm32")]
pub async fn next_frame() {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .request_animation_frame(&resolve)
            .unwrap();
    });
    wasm_bindgen_futures::JsFuture::from(promise).await.unwrap();
}
