/// DOM side effects of the page monitor

use crate::config::LimiterConfig;
use crate::error::{LimiterError, describe};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlMediaElement};

const COUNTER_STYLE: &str = "display: inline-flex; align-items: center; justify-content: center; \
background-color: #282828; color: #FFFFFF; border: 1px solid #FF0000; border-radius: 2px; \
padding: 2px 6px; font-size: 14px; font-weight: bold; margin-right: 16px;";

/// What the monitor is allowed to do to the host page.
pub trait Page {
    fn href(&self) -> Option<String>;

    /// Inject the hide rule. Calling it again must not add a second rule.
    fn apply_hide_style(&self) -> Result<(), LimiterError>;

    fn remove_hide_style(&self) -> Result<(), LimiterError>;

    /// Pause and rewind every Shorts player currently in the page.
    fn silence_shorts_media(&self);

    /// Keep silencing on every animation frame for as long as the hide rule is in place.
    fn keep_silencing(&self);

    /// Put the counter badge into the anchor. False if there is no anchor or the
    /// badge is already there.
    fn insert_counter(&self) -> bool;

    fn set_counter_text(&self, count: u32);
}

/// `Page` over the real document.
#[derive(Clone)]
pub struct DomPage {
    config: Rc<LimiterConfig>,
    silencing: Rc<Cell<bool>>,
}

impl DomPage {
    pub fn new(config: Rc<LimiterConfig>) -> DomPage {
        DomPage {
            config,
            silencing: Rc::new(Cell::new(false)),
        }
    }

    fn document(&self) -> Option<Document> {
        web_sys::window().and_then(|window| window.document())
    }

    fn style_present(&self) -> bool {
        self.document()
            .and_then(|document| document.get_element_by_id(&self.config.style_id))
            .is_some()
    }

    fn create_counter(&self, document: &Document) -> Result<Element, JsValue> {
        let counter = document.create_element("div")?;
        counter.set_id(&self.config.counter_id);
        counter.set_attribute("style", COUNTER_STYLE)?;

        let label = document.create_element("span")?;
        label.set_text_content(Some("Shorts: "));
        label.set_attribute("style", "margin-right: 4px;")?;

        let value = document.create_element("span")?;
        value.set_id(&self.config.counter_value_id);
        value.set_attribute("style", "color: #FF0000;")?;

        counter.append_child(&label)?;
        counter.append_child(&value)?;
        Ok(counter)
    }
}

impl Page for DomPage {
    fn href(&self) -> Option<String> {
        web_sys::window().and_then(|window| window.location().href().ok())
    }

    fn apply_hide_style(&self) -> Result<(), LimiterError> {
        let document = self
            .document()
            .ok_or_else(|| LimiterError::Dom("no document".to_string()))?;

        let style = match document.get_element_by_id(&self.config.style_id) {
            Some(style) => style,
            None => {
                let style = document
                    .create_element("style")
                    .map_err(|e| LimiterError::Dom(describe(&e)))?;
                style.set_id(&self.config.style_id);
                style
            }
        };
        style.set_text_content(Some(&self.config.hide_rule()));

        let head = document
            .head()
            .ok_or_else(|| LimiterError::Dom("no <head> to hold the hide rule".to_string()))?;
        // Appending an attached node moves it, so there is never a second copy
        head.append_child(&style)
            .map_err(|e| LimiterError::Dom(describe(&e)))?;
        Ok(())
    }

    fn remove_hide_style(&self) -> Result<(), LimiterError> {
        if let Some(style) = self
            .document()
            .and_then(|document| document.get_element_by_id(&self.config.style_id))
        {
            style.remove();
        }
        Ok(())
    }

    fn silence_shorts_media(&self) {
        let Some(document) = self.document() else {
            return;
        };
        let videos = match document.query_selector_all("video") {
            Ok(videos) => videos,
            Err(e) => {
                log::error!("Failed to query videos: {}", describe(&e));
                return;
            }
        };

        for index in 0..videos.length() {
            let Some(media) = videos
                .item(index)
                .and_then(|node| node.dyn_into::<HtmlMediaElement>().ok())
            else {
                continue;
            };
            let in_shorts = media
                .closest(&self.config.media_container)
                .ok()
                .flatten()
                .is_some();
            if in_shorts {
                if let Err(e) = media.pause() {
                    log::error!("Failed to pause Shorts video: {}", describe(&e));
                }
                media.set_current_time(0.0);
            }
        }
    }

    fn keep_silencing(&self) {
        if self.silencing.replace(true) {
            return;
        }

        // The frame callback has to hold a handle to itself to reschedule
        let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let next = Rc::clone(&frame);
        let page = self.clone();

        *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !page.style_present() {
                page.silencing.set(false);
                // Drop the closure, ending the loop
                next.borrow_mut().take();
                return;
            }
            page.silence_shorts_media();
            if let Some(callback) = next.borrow().as_ref() {
                request_frame(callback);
            }
        }) as Box<dyn FnMut()>));

        if let Some(callback) = frame.borrow().as_ref() {
            request_frame(callback);
        }
    }

    fn insert_counter(&self) -> bool {
        let Some(document) = self.document() else {
            return false;
        };
        let Some(anchor) = document.get_element_by_id(&self.config.anchor_id) else {
            return false;
        };
        if document.get_element_by_id(&self.config.counter_id).is_some() {
            return false;
        }

        let inserted = self
            .create_counter(&document)
            .and_then(|counter| anchor.insert_before(&counter, anchor.first_child().as_ref()));
        match inserted {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to insert Shorts counter: {}", describe(&e));
                false
            }
        }
    }

    fn set_counter_text(&self, count: u32) {
        if let Some(value) = self
            .document()
            .and_then(|document| document.get_element_by_id(&self.config.counter_value_id))
        {
            value.set_text_content(Some(&count.to_string()));
        }
    }
}

fn request_frame(callback: &Closure<dyn FnMut()>) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {}", describe(&e));
        }
    }
}
