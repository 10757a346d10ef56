/// Popup UI: current count, limit editor, reset

use crate::channel::TabsChannel;
use crate::config::LimiterConfig;
use crate::control::{COUNT_RESET, ControlPanel, LIMIT_SAVED};
use crate::storage::ChromeStore;
use crate::ui::components::CountDisplay;
use patternfly_yew::prelude::*;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

type PopupPanel = ControlPanel<ChromeStore, TabsChannel>;

#[derive(Clone, PartialEq)]
enum Status {
    Idle,
    Saved(String),
    Error(String),
}

fn build_panel() -> Rc<PopupPanel> {
    let config = LimiterConfig::default();
    let monitors = TabsChannel::new(config.monitor_tab_pattern.clone());
    Rc::new(ControlPanel::new(ChromeStore, monitors, config))
}

#[function_component(App)]
pub fn app() -> Html {
    let panel = use_memo((), |_| build_panel());
    let limit_input = use_state(|| LimiterConfig::default().default_limit.to_string());
    let saved_limit = use_state(|| LimiterConfig::default().default_limit);
    let watched = use_state(|| 0u32);
    let status = use_state(|| Status::Idle);

    // Load current limit and count on mount
    {
        let panel = Rc::clone(&*panel);
        let limit_input = limit_input.clone();
        let saved_limit = saved_limit.clone();
        let watched = watched.clone();
        let status = status.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match panel.load().await {
                    Ok(view) => {
                        limit_input.set(view.limit.to_string());
                        saved_limit.set(view.limit);
                        watched.set(view.shorts_watched);
                    }
                    Err(e) => status.set(Status::Error(format!("Failed to load: {}", e))),
                }
            });
            || ()
        });
    }

    let on_limit_input = {
        let limit_input = limit_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                limit_input.set(input.value());
            }
        })
    };

    let on_save = {
        let panel = Rc::clone(&*panel);
        let limit_input = limit_input.clone();
        let saved_limit = saved_limit.clone();
        let status = status.clone();

        Callback::from(move |_| {
            let panel = Rc::clone(&panel);
            let input = (*limit_input).clone();
            let saved_limit = saved_limit.clone();
            let status = status.clone();

            spawn_local(async move {
                match panel.save_limit(&input).await {
                    Ok(limit) => {
                        saved_limit.set(limit);
                        status.set(Status::Saved(LIMIT_SAVED.to_string()));
                    }
                    Err(e) => status.set(Status::Error(e.to_string())),
                }
            });
        })
    };

    let on_reset = {
        let panel = Rc::clone(&*panel);
        let watched = watched.clone();
        let status = status.clone();

        Callback::from(move |_| {
            let panel = Rc::clone(&panel);
            let watched = watched.clone();
            let status = status.clone();

            spawn_local(async move {
                match panel.reset().await {
                    Ok(()) => {
                        watched.set(0);
                        status.set(Status::Saved(COUNT_RESET.to_string()));
                    }
                    Err(e) => status.set(Status::Error(format!("Reset failed: {}", e))),
                }
            });
        })
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Shorts Limiter"}</h1>

            <CountDisplay watched={*watched} limit={*saved_limit} />

            <div class="flex-column-gap">
                <label class="limit-label">{"Daily limit"}</label>
                <input
                    id="limit"
                    class="pf-v5-c-form-control"
                    type="number"
                    min="1"
                    value={(*limit_input).clone()}
                    oninput={on_limit_input}
                />
                <Button onclick={on_save} variant={ButtonVariant::Primary} block={true}>
                    {"Save limit"}
                </Button>
                <Button onclick={on_reset} variant={ButtonVariant::Secondary} block={true}>
                    {"Reset count"}
                </Button>
            </div>

            {match &*status {
                Status::Saved(msg) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                        </Alert>
                    </div>
                },
                Status::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                Status::Idle => html! {}
            }}
        </div>
    }
}
