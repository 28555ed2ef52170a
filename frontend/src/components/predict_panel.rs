use super::super::{Model, Msg, PreviewEntry};
use super::utils::{debounce, spinner_label, take_picked_images};
use shared::PredictItem;
use web_sys::HtmlInputElement;
use yew::prelude::*;

pub fn render_predict_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    let handle_change = link.callback(|e: Event| {
        let files = take_picked_images(&e);
        if !files.is_empty() {
            Msg::PredictFilesPicked(files)
        } else {
            Msg::SetError(Some("No valid image files selected.".into()))
        }
    });

    let handle_threshold = link.callback(|e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::SetScoreThreshold(input.value().parse().unwrap_or(0.0))
    });

    let disabled = model.predict_busy || model.previews.is_empty();

    html! {
        <section class="panel predict-panel">
            <h2><i class="fa-solid fa-magnifying-glass"></i>{" Predict"}</h2>
            <div class="panel-controls">
                <input
                    type="file"
                    id="predict-input"
                    multiple=true
                    accept="image/*"
                    onchange={handle_change}
                />
                <label class="threshold">
                    { format!("Score threshold: {:.2}", model.score_threshold) }
                    <input
                        type="range"
                        min="0"
                        max="1"
                        step="0.05"
                        value={model.score_threshold.to_string()}
                        oninput={handle_threshold}
                    />
                </label>
                <button
                    class="analyze-btn"
                    disabled={disabled}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Predict)
                    })}
                >
                    { spinner_label(model.predict_busy, "Predicting...", html! {
                        <><i class="fa-solid fa-play"></i>{" Predict"}</>
                    }) }
                </button>
            </div>
            <div class="preview-grid">
                { for model.previews.iter().enumerate().map(|(index, preview)| {
                    render_preview(preview, model.predict_results.get(index))
                }) }
            </div>
            { render_unmatched_results(model) }
        </section>
    }
}

fn render_preview(preview: &PreviewEntry, result: Option<&PredictItem>) -> Html {
    html! {
        <figure class="preview-card" key={preview.id.to_string()}>
            <canvas class="preview-canvas" ref={preview.canvas.clone()}></canvas>
            <figcaption>
                <span class="filename">{ preview.file.name() }</span>
                { result.map(render_result_summary).unwrap_or_default() }
            </figcaption>
        </figure>
    }
}

fn render_result_summary(item: &PredictItem) -> Html {
    if !item.ok {
        return html! {
            <p class="result failed">
                <i class="fa-solid fa-circle-exclamation"></i>
                { format!(" {}", item.error.as_deref().unwrap_or("Prediction failed")) }
            </p>
        };
    }

    let detections = item.detections();
    let found = item.found.unwrap_or(!detections.is_empty());
    html! {
        <div class="result">
            { item.inference_ms.map(|ms| html! {
                <p class="inference-time">{ format!("{:.0} ms", ms) }</p>
            }).unwrap_or_default() }
            if found {
                <ul class="detections">
                    { for detections.iter().map(|d| html! { <li>{ d.caption() }</li> }) }
                </ul>
            } else {
                <p class="no-detections">
                    { item.message.as_deref().unwrap_or("No objects detected above the threshold.") }
                </p>
            }
        </div>
    }
}

// results with no matching preview, e.g. a transport failure reported as a single item
fn render_unmatched_results(model: &Model) -> Html {
    if model.predict_results.len() <= model.previews.len() {
        return html! {};
    }
    html! {
        <div class="unmatched-results">
            { for model.predict_results[model.previews.len()..].iter().map(render_result_summary) }
        </div>
    }
}
