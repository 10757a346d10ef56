/// Reusable UI components

use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct CountDisplayProps {
    pub watched: u32,
    pub limit: u32,
}

/// "n / limit" with a bar that turns red once the limit is reached.
#[function_component(CountDisplay)]
pub fn count_display(props: &CountDisplayProps) -> Html {
    let progress = progress_percent(props.watched, props.limit);
    let color = if props.watched >= props.limit {
        "#FF0000"
    } else {
        "#5B4FE8"
    };

    html! {
        <div class="count-display">
            <p class="count-text">
                {"Shorts watched today: "}
                <span id="shorts-watched" class="count-value">{props.watched}</span>
                {format!(" / {}", props.limit)}
            </p>
            <div class="progress-container">
                <div style={format!("width: {}%; background-color: {}; height: 100%; transition: width 0.3s ease;", progress, color)}>
                </div>
            </div>
        </div>
    }
}

pub fn progress_percent(watched: u32, limit: u32) -> u8 {
    if limit == 0 {
        return 100;
    }
    let percent = (u64::from(watched) * 100 / u64::from(limit)).min(100);
    percent as u8
}
