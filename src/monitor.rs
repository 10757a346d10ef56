/// Page monitor: counts Shorts navigations and enforces the daily limit
///
/// All state lives on the monitor itself. The browser-facing pieces (DOM,
/// messaging, storage, clock) come in through traits so the whole flow can
/// run against fakes.

use crate::channel::{self, Channel};
use crate::config::{LimiterConfig, ShortsMatcher};
use crate::error::LimiterError;
use crate::page::Page;
use crate::record::{Response, StoredRecord};
use crate::schedule::{self, Clock};
use crate::storage::Store;
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use std::cell::{Cell, RefCell};

pub struct PageMonitor<P, C, S, K> {
    page: P,
    channel: C,
    store: S,
    clock: K,
    config: LimiterConfig,
    matcher: ShortsMatcher,
    shorts_watched: Cell<u32>,
    limit: Cell<u32>,
    shorts_hidden: Cell<bool>,
    last_location: RefCell<Option<String>>,
    initialized: Shared<oneshot::Receiver<()>>,
    mark_initialized: RefCell<Option<oneshot::Sender<()>>>,
}

impl<P: Page, C: Channel, S: Store, K: Clock> PageMonitor<P, C, S, K> {
    pub fn new(
        page: P,
        channel: C,
        store: S,
        clock: K,
        config: LimiterConfig,
    ) -> Result<Self, LimiterError> {
        config.validate()?;
        let matcher = ShortsMatcher::new(&config)?;
        let (mark_initialized, initialized) = oneshot::channel();
        Ok(PageMonitor {
            page,
            channel,
            store,
            clock,
            limit: Cell::new(config.default_limit),
            config,
            matcher,
            shorts_watched: Cell::new(0),
            shorts_hidden: Cell::new(false),
            last_location: RefCell::new(None),
            initialized: initialized.shared(),
            mark_initialized: RefCell::new(Some(mark_initialized)),
        })
    }

    pub fn shorts_watched(&self) -> u32 {
        self.shorts_watched.get()
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn is_hidden(&self) -> bool {
        self.shorts_hidden.get()
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Daily reset check, load the mirrors, show the counter, enforce.
    pub async fn initialize(&self) {
        self.reset_if_needed().await;

        match self.store.load().await {
            Ok(record) => {
                self.shorts_watched.set(record.watched_or_default());
                self.limit.set(self.config.effective_limit(record.limit));
            }
            Err(e) => log::warn!("{}; starting from local state", e),
        }

        self.page.insert_counter();
        self.refresh_counter();
        self.enforce();

        // Release navigations that arrived while the mirrors were loading
        if let Some(mark) = self.mark_initialized.borrow_mut().take() {
            let _ = mark.send(());
        }
    }

    /// Zero the counter if the last reset is at least one interval old (or never happened).
    pub async fn reset_if_needed(&self) -> bool {
        let last_reset = match self.store.load().await {
            Ok(record) => record.last_reset,
            Err(e) => {
                log::warn!("{}; skipping the daily reset check", e);
                return false;
            }
        };

        let now = self.clock.now();
        let interval = schedule::interval_hours(self.config.reset_interval_hours);
        if !schedule::reset_due(last_reset.as_deref(), now, interval) {
            return false;
        }

        self.shorts_watched.set(0);
        if let Err(e) = self.store.save(StoredRecord::reset_at(schedule::stamp(now))).await {
            log::warn!("Failed to persist the daily reset: {}", e);
        }
        self.exit_hidden();
        self.refresh_counter();
        log::info!(
            "Shorts watched have been reset after {} hours.",
            self.config.reset_interval_hours
        );
        true
    }

    /// Remember `href` as the last seen location. True only when it changed.
    pub fn note_location(&self, href: &str) -> bool {
        let mut last = self.last_location.borrow_mut();
        if last.as_deref() == Some(href) {
            return false;
        }
        *last = Some(href.to_string());
        true
    }

    /// Navigation handler, run for every mutation batch.
    ///
    /// The location check happens before the first await, so any number of
    /// batches for one navigation count it once. Counting waits for
    /// `initialize` so a view is never added to the default mirror of 0.
    pub async fn on_navigation(&self, href: &str) {
        if !self.note_location(href) {
            return;
        }
        if self.initialized.clone().await.is_err() {
            return;
        }
        if self.is_hidden() {
            self.page.silence_shorts_media();
        }
        if self.matcher.is_short(href) {
            self.count_view().await;
        }
    }

    /// Count one Shorts view, persist it, pick up the current limit and enforce.
    pub async fn count_view(&self) {
        let count = self.shorts_watched.get().saturating_add(1);
        self.shorts_watched.set(count);

        if let Err(e) = channel::update_shorts_watched(&self.channel, count).await {
            log::warn!("Failed to persist shortsWatched={}: {}", count, e);
        }
        self.refresh_counter();

        match channel::get_limit(&self.channel).await {
            Ok(limit) => self.limit.set(limit),
            Err(e) => log::warn!("{}; keeping limit {}", e, self.limit.get()),
        }

        self.enforce();
    }

    /// Hidden state follows `shorts_watched >= limit`.
    pub fn enforce(&self) {
        if self.shorts_watched.get() >= self.limit.get() {
            self.enter_hidden();
        } else {
            self.exit_hidden();
        }
    }

    pub fn enter_hidden(&self) {
        if self.shorts_hidden.replace(true) {
            return;
        }

        if let Err(e) = self.page.apply_hide_style() {
            log::error!("Error hiding YouTube Shorts: {}", e);
        }
        self.page.silence_shorts_media();
        if self.config.continuous_silence {
            self.page.keep_silencing();
        }
        log::info!("YouTube Shorts have been hidden and audio stopped. You have reached your limit.");
    }

    pub fn exit_hidden(&self) {
        if !self.shorts_hidden.replace(false) {
            return;
        }

        match self.page.remove_hide_style() {
            Ok(()) => log::info!("YouTube Shorts are now visible."),
            Err(e) => log::error!("Error showing YouTube Shorts: {}", e),
        }
    }

    /// Structural handler: put the counter back when the page rebuilds its anchor.
    pub fn on_structure_change(&self, added_ids: &[String]) {
        if added_ids.iter().any(|id| *id == self.config.anchor_id) && self.page.insert_counter() {
            self.refresh_counter();
        }
    }

    /// The popup reset the count.
    pub async fn handle_reset(&self) -> Response {
        self.shorts_watched.set(0);
        self.exit_hidden();
        self.refresh_counter();

        if let Err(e) = channel::update_shorts_watched(&self.channel, 0).await {
            log::warn!("Failed to persist the reset count: {}", e);
        }
        let stamp = schedule::stamp(self.clock.now());
        let patch = StoredRecord {
            last_reset: Some(stamp),
            ..StoredRecord::default()
        };
        if let Err(e) = self.store.save(patch).await {
            log::warn!("Failed to stamp lastReset: {}", e);
        }

        log::info!("Limit reset!");
        Response::ack()
    }

    fn refresh_counter(&self) {
        self.page.set_counter_text(self.shorts_watched.get());
    }
}
