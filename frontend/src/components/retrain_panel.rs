use super::super::{Model, Msg};
use super::utils::{render_action_result, spinner_label};
use shared::ProgressSnapshot;
use yew::prelude::*;

fn format_loss(loss: Option<f64>) -> String {
    loss.map_or_else(|| "--".to_string(), |v| format!("{:.4}", v))
}

pub fn render_retrain_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    html! {
        <section class="panel retrain-panel">
            <h2><i class="fa-solid fa-arrows-rotate"></i>{" Retrain"}</h2>
            <div class="panel-controls">
                <button
                    class="analyze-btn"
                    onclick={link.callback(|_| Msg::Retrain)}
                    disabled={model.retrain_busy}
                >
                    { spinner_label(model.retrain_busy, "Retraining...", html! {
                        <><i class="fa-solid fa-dumbbell"></i>{" Retrain"}</>
                    }) }
                </button>
                <button onclick={link.callback(|_| Msg::ReloadModel)} disabled={model.reload_busy}>
                    { spinner_label(model.reload_busy, "Reloading...", html! {
                        <><i class="fa-solid fa-cloud-arrow-down"></i>{" Reload model"}</>
                    }) }
                </button>
            </div>
            { render_action_result(model.retrain_result.as_ref()) }
            { render_progress(&model.progress) }
            if !model.progress_log.is_empty() {
                <details class="progress-log">
                    <summary>
                        {"Raw progress"}
                        if model.progress_malformed > 0 {
                            <span class="skipped">
                                { format!(" ({} unreadable line(s) skipped)", model.progress_malformed) }
                            </span>
                        }
                    </summary>
                    <pre>{ model.progress_log.clone() }</pre>
                </details>
            }
        </section>
    }
}

fn render_progress(progress: &ProgressSnapshot) -> Html {
    let fraction = progress.progress_fraction();
    let epochs = if progress.epochs_total > 0 {
        format!("{}/{}", progress.epoch, progress.epochs_total)
    } else {
        "--".to_string()
    };

    html! {
        <div class="progress">
            <div class="progress-row">
                <span class={classes!("status", progress.status.to_string().to_lowercase())}>
                    { progress.status.to_string() }
                </span>
                <span>{ format!("Epoch {}", epochs) }</span>
                if !progress.status.is_terminal() {
                    <span>{ format!("ETA {}", progress.format_eta()) }</span>
                }
            </div>
            <div class="meter">
                <div
                    class="meter-fill"
                    style={format!("width: {:.1}%", fraction.unwrap_or(0.0) * 100.0)}
                ></div>
            </div>
            <div class="progress-row">
                <span>{ format!("train loss {}", format_loss(progress.train_loss)) }</span>
                <span>{ format!("val loss {}", format_loss(progress.val_loss)) }</span>
            </div>
        </div>
    }
}
