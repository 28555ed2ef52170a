use super::super::{AnnotationImage, Model, Msg, PreviewEntry};
use crate::api::ApiError;
use crate::canvas;
use crate::components::utils::generate_id;
use crate::polling::PollKind;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_storage::{LocalStorage, Storage};
use gloo_timers::callback::Timeout;
use shared::api::{HealthResponse, NewDataResponse, PredictMultiResponse, RetrainResponse};
use shared::annotation::{image_dimensions, manual_label_text};
use shared::{overlay, ActionResult, ImageSize, PredictItem};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlCanvasElement, HtmlImageElement, MouseEvent};
use yew::prelude::*;

const RELOAD_SETTLE_MS: u32 = 1200;

/// Creates an `<img>` for `url` and reports back once it has decoded.
fn image_element<F>(url: &ObjectUrl, on_load: F) -> Option<(HtmlImageElement, EventListener)>
where
    F: FnOnce(HtmlImageElement) + 'static,
{
    let image = match HtmlImageElement::new() {
        Ok(image) => image,
        Err(e) => {
            log::error!("Could not create image element: {:?}", e);
            return None;
        }
    };
    let loaded = image.clone();
    let listener = EventListener::once(&image, "load", move |_| on_load(loaded));
    image.set_src(&url.to_string());
    Some((image, listener))
}

fn natural_size(image: &HtmlImageElement) -> ImageSize {
    ImageSize::new(image.natural_width(), image.natural_height())
}

// Prediction

pub fn handle_predict_files(model: &mut Model, ctx: &Context<Model>, files: Vec<GlooFile>) -> bool {
    // replacing the list drops the previous object URLs; a predict still in
    // flight belongs to the old list and is ignored when it lands
    model.previews.clear();
    model.predict_results.clear();
    model.predict_generation.bump();
    model.predict_busy = false;
    model.error = None;

    for file in files {
        let id = generate_id();
        let url = ObjectUrl::from(file.clone());
        let link = ctx.link().clone();
        let listener = image_element(&url, move |image| {
            link.send_message(Msg::PreviewImageLoaded(id, image));
        })
        .map(|(_, listener)| listener);

        model.previews.push(PreviewEntry {
            id,
            file,
            _url: url,
            image: None,
            canvas: NodeRef::default(),
            _onload: listener,
        });
    }

    true
}

pub fn handle_preview_loaded(model: &mut Model, id: u64, image: HtmlImageElement) -> bool {
    match model.previews.iter_mut().find(|p| p.id == id) {
        Some(preview) => {
            preview.image = Some(image);
            preview._onload = None;
            true
        }
        None => false,
    }
}

pub fn handle_predict(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.previews.is_empty() {
        model.error = Some("No images selected for prediction.".into());
        return true;
    }

    model.predict_busy = true;
    model.predict_results.clear();
    model.error = None;

    let files: Vec<GlooFile> = model.previews.iter().map(|p| p.file.clone()).collect();
    let threshold = model.score_threshold;
    let generation = model.predict_generation.current();
    let api = model.api.clone();
    let link = ctx.link().clone();
    spawn_local(async move {
        let result = api.predict_multi(&files, threshold).await;
        link.send_message(Msg::PredictDone(generation, result));
    });

    true
}

pub fn handle_predict_done(
    model: &mut Model,
    generation: u64,
    result: Result<PredictMultiResponse, ApiError>,
) -> bool {
    if !model.predict_generation.is_current(generation) {
        log::debug!("Dropping predict results for a replaced file list");
        return false;
    }
    model.predict_busy = false;
    match result {
        Ok(response) => {
            log::info!("Received {} prediction results", response.results.len());
            model.predict_results = response.results;
        }
        Err(e) => {
            log::error!("Prediction failed: {}", e);
            model.predict_results = vec![PredictItem::failed(e)];
        }
    }
    true
}

// Annotation

pub fn handle_annot_file(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    let generation = model.annot_generation.bump();

    model.session.unload();
    model.new_data_result = None;

    let url = ObjectUrl::from(file.clone());
    let link = ctx.link().clone();
    let listener = image_element(&url, move |image| {
        link.send_message(Msg::AnnotImageLoaded(generation, image));
    })
    .map(|(_, listener)| listener);

    let link = ctx.link().clone();
    let reader_file = file.clone();
    spawn_local(async move {
        let bytes = gloo_file::futures::read_as_bytes(&reader_file)
            .await
            .map_err(|e| e.to_string());
        link.send_message(Msg::AnnotBytesRead(generation, bytes));
    });

    // the previous URL is revoked when the old AnnotationImage drops
    model.annot = Some(AnnotationImage {
        generation,
        file,
        _url: url,
        image: None,
        _onload: listener,
    });
    true
}

// Whichever of the header read and the `<img>` decode finishes first sizes the
// session; the other one only confirms it, so boxes drawn in between survive.
pub fn handle_annot_bytes(model: &mut Model, generation: u64, bytes: Result<Vec<u8>, String>) -> bool {
    if !model.annot_generation.is_current(generation) {
        return false;
    }

    match bytes.and_then(|bytes| image_dimensions(&bytes).map_err(|e| e.to_string())) {
        Ok(size) => {
            if model.session.adopt_image_size(size) {
                log::info!("Annotating {}x{} image", size.width, size.height);
                return true;
            }
            false
        }
        Err(e) if model.session.image_size().is_some() => {
            log::warn!("Using decoded image size, header unreadable: {}", e);
            false
        }
        Err(e) => {
            log::error!("Could not read annotation image: {}", e);
            model.new_data_result = Some(ActionResult::failed(e));
            true
        }
    }
}

pub fn handle_annot_image(model: &mut Model, generation: u64, image: HtmlImageElement) -> bool {
    match model.annot.as_mut() {
        Some(annot) if annot.generation == generation => {
            if model.session.adopt_image_size(natural_size(&image)) {
                model.new_data_result = None;
            }
            annot.image = Some(image);
            annot._onload = None;
            true
        }
        _ => false,
    }
}

fn annot_canvas(model: &Model) -> Option<HtmlCanvasElement> {
    model.annot_canvas.cast::<HtmlCanvasElement>()
}

pub fn handle_pointer_down(model: &mut Model, event: &MouseEvent) -> bool {
    let Some(canvas) = annot_canvas(model) else {
        return false;
    };
    let at = canvas::pointer_position(&canvas, event);
    match model.session.begin_box(at) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Ignoring pointer down: {}", e);
            false
        }
    }
}

pub fn handle_pointer_move(model: &mut Model, event: &MouseEvent) -> bool {
    if !model.session.is_drawing() {
        return false;
    }
    let Some(canvas) = annot_canvas(model) else {
        return false;
    };
    let at = canvas::pointer_position(&canvas, event);
    model.session.update_box(at).is_ok()
}

pub fn handle_pointer_up(model: &mut Model) -> bool {
    if !model.session.is_drawing() {
        return false;
    }
    match model.session.commit_box() {
        Ok(Some(stored)) => log::debug!("Added box for class {}", stored.class_id),
        Ok(None) => {}
        Err(e) => log::warn!("Ignoring pointer up: {}", e),
    }
    true
}

pub fn handle_save_annotated(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(file) = model.annot.as_ref().map(|a| a.file.clone()) else {
        model.new_data_result = Some(ActionResult::failed("No image selected."));
        return true;
    };
    let labels = match model.session.prepare_upload() {
        Ok(labels) => labels,
        Err(e) => {
            model.new_data_result = Some(ActionResult::failed(e));
            return true;
        }
    };

    upload_new_data(model, ctx, file, labels)
}

/// Uploads a picked file with hand-written label text, bypassing the canvas.
pub fn handle_save_manual(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(file) = model.manual_file.clone() else {
        model.new_data_result = Some(ActionResult::failed("No image selected."));
        return true;
    };
    match manual_label_text(&model.manual_labels) {
        Ok(labels) => upload_new_data(model, ctx, file, labels),
        Err(e) => {
            model.new_data_result = Some(ActionResult::failed(e));
            true
        }
    }
}

fn upload_new_data(model: &mut Model, ctx: &Context<Model>, file: GlooFile, labels: String) -> bool {
    if model.new_data_busy {
        return false;
    }
    model.new_data_busy = true;
    model.new_data_result = None;

    let api = model.api.clone();
    let link = ctx.link().clone();
    spawn_local(async move {
        let result = api.upload_new_data(&file, &labels).await;
        link.send_message(Msg::NewDataDone(result));
    });
    true
}

pub fn handle_new_data_done(
    model: &mut Model,
    ctx: &Context<Model>,
    result: Result<NewDataResponse, ApiError>,
) -> bool {
    model.new_data_busy = false;
    model.new_data_result = Some(match result {
        Ok(response) => response.into(),
        Err(e) => {
            log::error!("Upload of new data failed: {}", e);
            ActionResult::failed(e)
        }
    });
    ctx.link().send_message(Msg::Poll(PollKind::Logs));
    ctx.link().send_message(Msg::Poll(PollKind::Health));
    true
}

// Retraining

pub fn handle_retrain(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.retrain_busy {
        return false;
    }
    log::info!("Retrain requested");
    model.retrain_busy = true;
    model.retrain_result = None;

    let api = model.api.clone();
    let link = ctx.link().clone();
    spawn_local(async move {
        let result = api.retrain().await;
        link.send_message(Msg::RetrainDone(result));
    });
    true
}

pub fn handle_retrain_done(
    model: &mut Model,
    ctx: &Context<Model>,
    result: Result<RetrainResponse, ApiError>,
) -> bool {
    model.retrain_busy = false;
    match result {
        Ok(response) => {
            let done = response.is_done();
            model.retrain_result = Some(response.into());
            if done {
                // new weights are only served after a reload
                ctx.link().send_message(Msg::ReloadModel);
            } else {
                ctx.link().send_message(Msg::Poll(PollKind::Health));
            }
        }
        Err(e) => {
            log::error!("Retrain failed: {}", e);
            model.retrain_result = Some(ActionResult::failed(e));
        }
    }
    ctx.link().send_message(Msg::Poll(PollKind::Logs));
    true
}

pub fn handle_reload(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.reload_busy {
        return false;
    }
    model.reload_busy = true;

    let api = model.api.clone();
    let link = ctx.link().clone();
    spawn_local(async move {
        let result = api.reload_model().await;
        link.send_message(Msg::ReloadDone(result));
    });
    true
}

pub fn handle_reload_done(model: &mut Model, ctx: &Context<Model>, result: Result<(), ApiError>) -> bool {
    ctx.link().send_message(Msg::Poll(PollKind::Health));
    ctx.link().send_message(Msg::Poll(PollKind::Logs));

    match result {
        Ok(()) => {
            // keep the button disabled briefly so the new model shows up in health first
            let link = ctx.link().clone();
            model.reload_settle = Some(Timeout::new(RELOAD_SETTLE_MS, move || {
                link.send_message(Msg::ReloadSettled);
            }));
        }
        Err(e) => {
            log::error!("Model reload failed: {}", e);
            model.reload_busy = false;
            model.error = Some(format!("Model reload failed: {}", e));
        }
    }
    true
}

// Polling

pub fn handle_poll(model: &mut Model, ctx: &Context<Model>, kind: PollKind) {
    if !model.pollers.begin(kind) {
        return;
    }

    let api = model.api.clone();
    let link = ctx.link().clone();
    let log_lines = model.config.log_lines;
    let progress_lines = model.config.progress_lines;
    let timeout_ms = model.pollers.fetch_timeout_ms(kind);

    spawn_local(async move {
        match kind {
            PollKind::Logs => {
                let text = api.logs(log_lines, timeout_ms).await.map_err(|e| {
                    gloo_console::debug!(format!("Log poll failed: {}", e));
                });
                link.send_message(Msg::LogsFetched(text.ok()));
            }
            PollKind::Progress => {
                let text = api.retrain_progress(progress_lines, timeout_ms).await.map_err(|e| {
                    gloo_console::debug!(format!("Progress poll failed: {}", e));
                });
                link.send_message(Msg::ProgressFetched(text.ok()));
            }
            PollKind::Health => {
                let health = api.health(timeout_ms).await.unwrap_or_else(|e| {
                    log::debug!("Health poll failed: {}", e);
                    HealthResponse::failed(e)
                });
                link.send_message(Msg::HealthFetched(health));
            }
        }
    });
}

// Canvas painting

pub fn paint_canvases(model: &Model) {
    for (index, preview) in model.previews.iter().enumerate() {
        let (Some(canvas), Some(image)) = (preview.canvas.cast::<HtmlCanvasElement>(), preview.image.as_ref())
        else {
            continue;
        };
        let scene = overlay::render(natural_size(image), model.predict_results.get(index));
        if let Err(e) = canvas::paint(&canvas, image, &scene) {
            log::error!("Failed to draw preview {}: {:?}", preview.id, e);
        }
    }

    let image = model.annot.as_ref().and_then(|a| a.image.as_ref());
    if let (Some(canvas), Some(image), Some(scene)) = (annot_canvas(model), image, model.session.scene()) {
        if let Err(e) = canvas::paint(&canvas, image, &scene) {
            log::error!("Failed to draw annotation canvas: {:?}", e);
        }
    }
}

// UI

pub fn apply_theme(theme: &str) {
    let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    else {
        return;
    };
    let classes = body.class_list();
    let result = if theme == "dark" {
        classes.add_1("dark-mode")
    } else {
        classes.remove_1("dark-mode")
    };
    if let Err(e) = result {
        log::warn!("Could not apply theme: {:?}", e);
    }
}

pub fn handle_toggle_theme(model: &mut Model) -> bool {
    model.theme = if model.theme == "light" { "dark" } else { "light" }.to_string();
    apply_theme(&model.theme);
    if let Err(e) = LocalStorage::set(super::super::THEME_KEY, &model.theme) {
        log::warn!("Could not persist theme: {}", e);
    }
    true
}
