use super::super::{Model, Msg};
use yew::prelude::*;

/// Title bar with the serving model's health.
pub fn render_header(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-crosshairs"></i> {" Detection Studio"}</h1>
            <p class="subtitle">{"Predict, annotate and retrain the object detector"}</p>
            { render_health_badge(model) }
            { render_model_details(model, ctx) }
        </header>
    }
}

fn render_health_badge(model: &Model) -> Html {
    match &model.health {
        None => html! {
            <span class="health-badge unknown">
                <i class="fa-solid fa-spinner fa-spin"></i>{" Checking service..."}
            </span>
        },
        Some(health) if health.is_ok() => html! {
            <span class="health-badge ok" title={health.status.clone().unwrap_or_default()}>
                <i class="fa-solid fa-circle-check"></i>{ format!(" {}", health.summary()) }
            </span>
        },
        Some(health) => html! {
            <span class="health-badge down" title={health.error.clone().unwrap_or_default()}>
                <i class="fa-solid fa-triangle-exclamation"></i>{" Service unavailable"}
            </span>
        },
    }
}

fn render_model_details(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(details) = model.health.as_ref().and_then(|h| h.active_model_details()) else {
        return html! {};
    };
    html! {
        <div class="model-details">
            <button class="link-btn" onclick={ctx.link().callback(|_| Msg::ToggleModelDetails)}>
                <i class={classes!("fa-solid", if model.model_expanded { "fa-chevron-up" } else { "fa-chevron-down" })}></i>
                {" Active model"}
            </button>
            if model.model_expanded {
                <pre>{ details }</pre>
            }
        </div>
    }
}
