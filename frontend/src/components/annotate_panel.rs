use super::super::{Model, Msg};
use super::utils::{render_action_result, spinner_label, take_picked_images};
use web_sys::{HtmlSelectElement, HtmlTextAreaElement};
use yew::prelude::*;

pub fn render_annotate_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    let handle_change = link.callback(|e: Event| match take_picked_images(&e).into_iter().next() {
        Some(file) => Msg::AnnotFilePicked(file),
        None => Msg::SetError(Some("No valid image file selected.".into())),
    });

    let handle_class = link.callback(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        Msg::SelectClass(select.value())
    });

    let session = &model.session;
    let has_image = session.image_size().is_some();
    let box_count = session.boxes().len();

    html! {
        <section class="panel annotate-panel">
            <h2><i class="fa-solid fa-vector-square"></i>{" Annotate"}</h2>
            <div class="panel-controls">
                <input type="file" id="annot-input" accept="image/*" onchange={handle_change} />
                <label>
                    {"Class: "}
                    <select onchange={handle_class}>
                        { for session.catalog().names().map(|name| html! {
                            <option value={name.to_string()} selected={name == session.selected_class()}>
                                { name }
                            </option>
                        }) }
                    </select>
                </label>
            </div>

            if model.annot.is_some() {
                <canvas
                    class="annot-canvas"
                    ref={model.annot_canvas.clone()}
                    onmousedown={link.callback(Msg::PointerDown)}
                    onmousemove={link.callback(Msg::PointerMove)}
                    onmouseup={link.callback(|_| Msg::PointerUp)}
                    onmouseleave={link.callback(|_| Msg::PointerLeave)}
                ></canvas>
            } else {
                <p class="placeholder">{"Pick an image, then drag on it to draw boxes."}</p>
            }

            <div class="panel-controls">
                <span class="box-count">{ format!("{} box(es)", box_count) }</span>
                <button onclick={link.callback(|_| Msg::RemoveLastBox)} disabled={box_count == 0}>
                    <i class="fa-solid fa-rotate-left"></i>{" Undo"}
                </button>
                <button onclick={link.callback(|_| Msg::ClearBoxes)} disabled={box_count == 0}>
                    <i class="fa-solid fa-trash-can"></i>{" Clear"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={link.callback(|_| Msg::SaveAnnotated)}
                    disabled={model.new_data_busy || !has_image}
                >
                    { spinner_label(model.new_data_busy, "Saving...", html! {
                        <><i class="fa-solid fa-floppy-disk"></i>{" Save to dataset"}</>
                    }) }
                </button>
            </div>

            if box_count > 0 {
                <pre class="yolo-preview">{ session.export_yolo() }</pre>
            }
            { render_manual_upload(model, ctx) }
            { render_action_result(model.new_data_result.as_ref()) }
        </section>
    }
}

// Upload a file with label text typed by hand, for images labelled elsewhere.
fn render_manual_upload(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let handle_file = link.callback(|e: Event| match take_picked_images(&e).into_iter().next() {
        Some(file) => Msg::ManualFilePicked(file),
        None => Msg::SetError(Some("No valid image file selected.".into())),
    });
    let handle_labels = link.callback(|e: InputEvent| {
        let area: HtmlTextAreaElement = e.target_unchecked_into();
        Msg::SetManualLabels(area.value())
    });

    html! {
        <details class="manual-upload">
            <summary>{"Upload with label text"}</summary>
            <input type="file" accept="image/*" onchange={handle_file} />
            if let Some(file) = &model.manual_file {
                <span class="filename">{ file.name() }</span>
            }
            <textarea
                rows="4"
                value={model.manual_labels.clone()}
                oninput={handle_labels}
            />
            <button
                onclick={link.callback(|_| Msg::SaveManual)}
                disabled={model.new_data_busy || model.manual_file.is_none()}
            >
                { spinner_label(model.new_data_busy, "Saving...", html! {
                    <><i class="fa-solid fa-upload"></i>{" Save"}</>
                }) }
            </button>
        </details>
    }
}
