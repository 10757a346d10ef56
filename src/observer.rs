/// DOM observation: turns page mutations into monitor events

use crate::channel::Channel;
use crate::error::describe;
use crate::monitor::PageMonitor;
use crate::page::Page;
use crate::schedule::Clock;
use crate::storage::Store;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node};

pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// One batch of DOM mutations, reduced to what the monitor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBatch {
    pub href: String,
    pub added_ids: Vec<String>,
}

/// Something that reports mutation batches under the document.
pub trait DomObserver {
    /// Start a new observation; `callback` runs once per batch.
    fn observe(&self, callback: Box<dyn FnMut(MutationBatch)>);
}

/// Hook the monitor's navigation and structural handlers up to `observer`.
///
/// The current location counts as already seen, so only later navigations are
/// counted.
pub fn watch<O, P, C, S, K, F>(observer: &O, monitor: Rc<PageMonitor<P, C, S, K>>, spawn: F)
where
    O: DomObserver,
    P: Page + 'static,
    C: Channel + 'static,
    S: Store + 'static,
    K: Clock + 'static,
    F: Fn(LocalTask) + 'static,
{
    if let Some(href) = monitor.page().href() {
        monitor.note_location(&href);
    }

    {
        let monitor = Rc::clone(&monitor);
        observer.observe(Box::new(move |batch: MutationBatch| {
            let monitor = Rc::clone(&monitor);
            spawn(Box::pin(async move {
                monitor.on_navigation(&batch.href).await;
            }));
        }));
    }

    observer.observe(Box::new(move |batch: MutationBatch| {
        monitor.on_structure_change(&batch.added_ids);
    }));
}

/// `MutationObserver` on the document, `childList` + `subtree`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentObserver;

impl DomObserver for DocumentObserver {
    fn observe(&self, mut callback: Box<dyn FnMut(MutationBatch)>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let on_mutations = Closure::wrap(Box::new(move |records: js_sys::Array, _observer: MutationObserver| {
            let href = web_sys::window()
                .and_then(|window| window.location().href().ok())
                .unwrap_or_default();
            callback(MutationBatch {
                href,
                added_ids: added_element_ids(&records),
            });
        }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

        let observer = match MutationObserver::new(on_mutations.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                log::error!("Failed to create MutationObserver: {}", describe(&e));
                return;
            }
        };

        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        let target: &Node = &document;
        if let Err(e) = observer.observe_with_options(target, &options) {
            log::error!("Failed to observe the document: {}", describe(&e));
            return;
        }

        // Observers run for the lifetime of the page
        on_mutations.forget();
    }
}

fn added_element_ids(records: &js_sys::Array) -> Vec<String> {
    let mut ids = Vec::new();
    for record in records.iter() {
        let Ok(record) = record.dyn_into::<MutationRecord>() else {
            continue;
        };
        let added = record.added_nodes();
        for index in 0..added.length() {
            if let Some(element) = added.item(index).and_then(|node| node.dyn_into::<Element>().ok()) {
                let id = element.id();
                if !id.is_empty() {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimiterConfig;
    use crate::record::StoredRecord;
    use crate::schedule::stamp;
    use crate::testing::{BridgeChannel, FakePage, FixedClock, MemoryStore};
    use futures::executor::block_on;
    use futures::future::join_all;
    use std::cell::RefCell;

    /// Hands batches to every registered callback on demand.
    #[derive(Default)]
    struct FakeObserver {
        callbacks: RefCell<Vec<Box<dyn FnMut(MutationBatch)>>>,
    }

    impl FakeObserver {
        fn fire(&self, href: &str, added_ids: &[&str]) {
            let batch = MutationBatch {
                href: href.to_string(),
                added_ids: added_ids.iter().map(|id| id.to_string()).collect(),
            };
            for callback in self.callbacks.borrow_mut().iter_mut() {
                callback(batch.clone());
            }
        }
    }

    impl DomObserver for FakeObserver {
        fn observe(&self, callback: Box<dyn FnMut(MutationBatch)>) {
            self.callbacks.borrow_mut().push(callback);
        }
    }

    type Monitor = PageMonitor<Rc<FakePage>, BridgeChannel, Rc<MemoryStore>, FixedClock>;

    fn setup(landing: &str, limit: u32) -> (Rc<FakePage>, Rc<Monitor>, FakeObserver, Rc<RefCell<Vec<LocalTask>>>) {
        let page = Rc::new(FakePage::default());
        *page.href.borrow_mut() = landing.to_string();
        let store = Rc::new(MemoryStore::with(StoredRecord {
            shorts_watched: Some(0),
            limit: Some(limit),
            last_reset: Some(stamp(FixedClock::default().now())),
        }));
        let monitor = Rc::new(
            PageMonitor::new(
                Rc::clone(&page),
                BridgeChannel::new(Rc::clone(&store)),
                store,
                FixedClock::default(),
                LimiterConfig::default(),
            )
            .unwrap(),
        );
        block_on(monitor.initialize());

        let observer = FakeObserver::default();
        let tasks: Rc<RefCell<Vec<LocalTask>>> = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&tasks);
        watch(&observer, Rc::clone(&monitor), move |task| queue.borrow_mut().push(task));
        (page, monitor, observer, tasks)
    }

    fn run(tasks: &Rc<RefCell<Vec<LocalTask>>>) {
        let pending: Vec<LocalTask> = tasks.borrow_mut().drain(..).collect();
        block_on(join_all(pending));
    }

    #[test]
    fn test_two_observations_registered() {
        let (_, _, observer, _) = setup("https://www.youtube.com/", 10);
        assert_eq!(observer.callbacks.borrow().len(), 2);
    }

    #[test]
    fn test_landing_page_is_not_counted() {
        let (_, monitor, observer, tasks) = setup("https://www.youtube.com/shorts/first", 10);

        observer.fire("https://www.youtube.com/shorts/first", &[]);
        run(&tasks);

        assert_eq!(monitor.shorts_watched(), 0);
    }

    #[test]
    fn test_each_navigation_counts_once_across_batches() {
        let (_, monitor, observer, tasks) = setup("https://www.youtube.com/", 10);

        for id in ["a", "b", "c"] {
            let href = format!("https://www.youtube.com/shorts/{}", id);
            observer.fire(&href, &[]);
            observer.fire(&href, &["player"]);
            observer.fire(&href, &[]);
        }
        run(&tasks);

        assert_eq!(monitor.shorts_watched(), 3);
    }

    #[test]
    fn test_anchor_rebuild_reinserts_counter() {
        let (page, _, observer, tasks) = setup("https://www.youtube.com/", 10);
        page.replace_anchor();

        observer.fire("https://www.youtube.com/", &["end"]);
        run(&tasks);

        assert_eq!(page.counters.get(), 1);
        assert_eq!(page.counter_text.borrow().as_deref(), Some("0"));
    }

    #[test]
    fn test_limit_reached_through_observer() {
        let (page, monitor, observer, tasks) = setup("https://www.youtube.com/", 2);

        observer.fire("https://www.youtube.com/shorts/a", &[]);
        observer.fire("https://www.youtube.com/shorts/b", &[]);
        run(&tasks);

        assert!(monitor.is_hidden());
        assert_eq!(page.style_rules.get(), 1);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use crate::config::LimiterConfig;
    use crate::record::StoredRecord;
    use crate::schedule::stamp;
    use crate::testing::{BridgeChannel, FakePage, FixedClock, MemoryStore, next_frame};
    use wasm_bindgen_futures::spawn_local;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    async fn test_document_observer_counts_a_history_navigation() {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();
        let history = window.history().unwrap();
        let start_href = window.location().href().unwrap();

        let page = Rc::new(FakePage::default());
        *page.href.borrow_mut() = start_href.clone();
        let store = Rc::new(MemoryStore::with(StoredRecord {
            shorts_watched: Some(0),
            limit: Some(10),
            last_reset: Some(stamp(FixedClock::default().now())),
        }));
        let monitor = Rc::new(
            PageMonitor::new(
                Rc::clone(&page),
                BridgeChannel::new(Rc::clone(&store)),
                Rc::clone(&store),
                FixedClock::default(),
                LimiterConfig::default(),
            )
            .unwrap(),
        );
        monitor.initialize().await;
        watch(&DocumentObserver, Rc::clone(&monitor), |task| spawn_local(task));

        history
            .push_state_with_url(&JsValue::NULL, "", Some("/shorts/abc123"))
            .unwrap();
        page.replace_anchor();
        let anchor = document.create_element("div").unwrap();
        anchor.set_id("end");
        document.body().unwrap().append_child(&anchor).unwrap();
        next_frame().await;
        next_frame().await;

        assert_eq!(monitor.shorts_watched(), 1);
        assert_eq!(store.snapshot().shorts_watched, Some(1));
        // The added anchor reached the structural handler
        assert_eq!(page.counters.get(), 1);

        anchor.remove();
        history
            .push_state_with_url(&JsValue::NULL, "", Some(&start_href))
            .unwrap();
    }
}
