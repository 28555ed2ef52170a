use super::super::{Model, Msg};
use crate::polling::PollKind;
use yew::prelude::*;

pub fn render_logs_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let live = model.pollers.is_running(PollKind::Logs);
    html! {
        <section class="panel logs-panel">
            <div class="panel-header">
                <h2><i class="fa-solid fa-terminal"></i>{" Service logs"}</h2>
                <span class={classes!("live-indicator", live.then_some("live"))}>
                    { if live { "live" } else { "paused" } }
                </span>
                <button onclick={ctx.link().callback(|_| Msg::ToggleLogs)}>
                    { if model.show_logs { "Hide" } else { "Show" } }
                </button>
            </div>
            if model.show_logs {
                <pre class="logs">
                    { if model.logs.is_empty() { "No log output yet." } else { model.logs.as_str() } }
                </pre>
            }
        </section>
    }
}
