mod api;
mod canvas;
mod components;
mod generation;
mod polling;

use api::{ApiClient, ApiError};
use components::handlers;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_storage::{LocalStorage, Storage};
use generation::Generation;
use gloo_timers::callback::Timeout;
use polling::{PollKind, Pollers};
use shared::api::{HealthResponse, NewDataResponse, PredictMultiResponse, RetrainResponse};
use shared::progress::{classify_line, LineOutcome, ProgressSnapshot};
use shared::annotation::SAMPLE_LABEL_TEXT;
use shared::{ActionResult, AnnotationSession, ClientConfig, PredictItem};
use web_sys::{HtmlImageElement, MouseEvent};
use yew::prelude::*;

const CONFIG_KEY: &str = "detection_studio.config";
const THEME_KEY: &str = "detection_studio.theme";

// Models
struct PreviewEntry {
    id: u64,
    file: GlooFile,
    _url: ObjectUrl,
    image: Option<HtmlImageElement>,
    canvas: NodeRef,
    _onload: Option<EventListener>,
}

/// The image currently open in the annotator.
struct AnnotationImage {
    generation: u64,
    file: GlooFile,
    _url: ObjectUrl,
    image: Option<HtmlImageElement>,
    _onload: Option<EventListener>,
}

// Yew msg components
enum Msg {
    // Prediction
    PredictFilesPicked(Vec<GlooFile>),
    PreviewImageLoaded(u64, HtmlImageElement),
    SetScoreThreshold(f64),
    Predict,
    PredictDone(u64, Result<PredictMultiResponse, ApiError>),

    // Annotation
    AnnotFilePicked(GlooFile),
    AnnotBytesRead(u64, Result<Vec<u8>, String>),
    AnnotImageLoaded(u64, HtmlImageElement),
    SelectClass(String),
    PointerDown(MouseEvent),
    PointerMove(MouseEvent),
    PointerUp,
    PointerLeave,
    RemoveLastBox,
    ClearBoxes,
    SaveAnnotated,
    ManualFilePicked(GlooFile),
    SetManualLabels(String),
    SaveManual,
    NewDataDone(Result<NewDataResponse, ApiError>),

    // Retraining
    Retrain,
    RetrainDone(Result<RetrainResponse, ApiError>),
    ReloadModel,
    ReloadDone(Result<(), ApiError>),
    ReloadSettled,

    // Polling
    Poll(PollKind),
    LogsFetched(Option<String>),
    ProgressFetched(Option<String>),
    HealthFetched(HealthResponse),

    // UI states
    SetError(Option<String>),
    ToggleLogs,
    ToggleModelDetails,
    ToggleTheme,
}

// Main component
struct Model {
    config: ClientConfig,
    api: ApiClient,

    previews: Vec<PreviewEntry>,
    predict_results: Vec<PredictItem>,
    score_threshold: f64,
    predict_busy: bool,
    predict_generation: Generation,

    session: AnnotationSession,
    annot: Option<AnnotationImage>,
    annot_generation: Generation,
    annot_canvas: NodeRef,
    manual_file: Option<GlooFile>,
    manual_labels: String,
    new_data_busy: bool,
    new_data_result: Option<ActionResult>,

    retrain_busy: bool,
    retrain_result: Option<ActionResult>,
    reload_busy: bool,
    reload_settle: Option<Timeout>,

    progress: ProgressSnapshot,
    progress_log: String,
    progress_malformed: usize,
    logs: String,
    show_logs: bool,
    health: Option<HealthResponse>,
    model_expanded: bool,
    pollers: Pollers,

    error: Option<String>,
    theme: String,
}

fn load_config() -> ClientConfig {
    match LocalStorage::get::<ClientConfig>(CONFIG_KEY) {
        Ok(config) => match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Ignoring stored config: {}", e);
                ClientConfig::default()
            }
        },
        Err(gloo_storage::errors::StorageError::KeyNotFound(_)) => ClientConfig::default(),
        Err(e) => {
            log::warn!("Could not read stored config: {}", e);
            ClientConfig::default()
        }
    }
}

// Yew component implementation
impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let config = load_config();
        let theme = LocalStorage::get::<String>(THEME_KEY).unwrap_or_else(|_| "light".to_string());
        handlers::apply_theme(&theme);

        let mut model = Self {
            api: ApiClient::new(config.api_base.clone()),
            previews: Vec::new(),
            predict_results: Vec::new(),
            score_threshold: config.score_threshold,
            predict_busy: false,
            predict_generation: Generation::default(),
            session: config.annotation_session(),
            annot: None,
            annot_generation: Generation::default(),
            annot_canvas: NodeRef::default(),
            manual_file: None,
            manual_labels: SAMPLE_LABEL_TEXT.to_string(),
            new_data_busy: false,
            new_data_result: None,
            retrain_busy: false,
            retrain_result: None,
            reload_busy: false,
            reload_settle: None,
            progress: ProgressSnapshot::default(),
            progress_log: String::new(),
            progress_malformed: 0,
            logs: String::new(),
            show_logs: true,
            health: None,
            model_expanded: false,
            pollers: Pollers::from_config(&config),
            error: None,
            theme,
            config,
        };

        model.pollers.start_all(ctx.link());
        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // Prediction
            Msg::PredictFilesPicked(files) => handlers::handle_predict_files(self, ctx, files),
            Msg::PreviewImageLoaded(id, image) => handlers::handle_preview_loaded(self, id, image),
            Msg::SetScoreThreshold(value) => {
                self.score_threshold = value.clamp(0.0, 1.0);
                true
            }
            Msg::Predict => handlers::handle_predict(self, ctx),
            Msg::PredictDone(generation, result) => {
                handlers::handle_predict_done(self, generation, result)
            }

            // Annotation
            Msg::AnnotFilePicked(file) => handlers::handle_annot_file(self, ctx, file),
            Msg::AnnotBytesRead(generation, bytes) => {
                handlers::handle_annot_bytes(self, generation, bytes)
            }
            Msg::AnnotImageLoaded(generation, image) => {
                handlers::handle_annot_image(self, generation, image)
            }
            Msg::SelectClass(name) => self.session.select_class(&name),
            Msg::PointerDown(event) => handlers::handle_pointer_down(self, &event),
            Msg::PointerMove(event) => handlers::handle_pointer_move(self, &event),
            Msg::PointerUp => handlers::handle_pointer_up(self),
            Msg::PointerLeave => {
                let was_drawing = self.session.is_drawing();
                self.session.cancel_box();
                was_drawing
            }
            Msg::RemoveLastBox => self.session.remove_last_box().is_some(),
            Msg::ClearBoxes => {
                self.session.clear_boxes();
                true
            }
            Msg::SaveAnnotated => handlers::handle_save_annotated(self, ctx),
            Msg::ManualFilePicked(file) => {
                self.manual_file = Some(file);
                self.new_data_result = None;
                true
            }
            Msg::SetManualLabels(text) => {
                self.manual_labels = text;
                false
            }
            Msg::SaveManual => handlers::handle_save_manual(self, ctx),
            Msg::NewDataDone(result) => handlers::handle_new_data_done(self, ctx, result),

            // Retraining
            Msg::Retrain => handlers::handle_retrain(self, ctx),
            Msg::RetrainDone(result) => handlers::handle_retrain_done(self, ctx, result),
            Msg::ReloadModel => handlers::handle_reload(self, ctx),
            Msg::ReloadDone(result) => handlers::handle_reload_done(self, ctx, result),
            Msg::ReloadSettled => {
                self.reload_busy = false;
                self.reload_settle = None;
                true
            }

            // Polling
            Msg::Poll(kind) => {
                handlers::handle_poll(self, ctx, kind);
                false
            }
            Msg::LogsFetched(text) => {
                self.pollers.finish(PollKind::Logs);
                match text {
                    Some(text) if text != self.logs => {
                        self.logs = text;
                        true
                    }
                    _ => false,
                }
            }
            Msg::ProgressFetched(text) => {
                self.pollers.finish(PollKind::Progress);
                match text {
                    Some(text) => {
                        self.progress = shared::progress::parse(&text);
                        self.progress_malformed = text
                            .lines()
                            .filter(|line| {
                                matches!(classify_line(line), LineOutcome::Malformed)
                            })
                            .count();
                        self.progress_log = text;
                        true
                    }
                    None => false,
                }
            }
            Msg::HealthFetched(health) => {
                self.pollers.finish(PollKind::Health);
                self.health = Some(health);
                true
            }

            // UI states
            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::ToggleLogs => {
                self.show_logs = !self.show_logs;
                true
            }
            Msg::ToggleModelDetails => {
                self.model_expanded = !self.model_expanded;
                true
            }
            Msg::ToggleTheme => handlers::handle_toggle_theme(self),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { components::header::render_header(self, ctx) }
                { components::theme_toggle::render_theme_toggle(&self.theme, ctx.link()) }

                <main class="main-content">
                    { components::utils::render_error_message(self) }
                    { components::predict_panel::render_predict_panel(self, ctx) }
                    { components::annotate_panel::render_annotate_panel(self, ctx) }
                    { components::retrain_panel::render_retrain_panel(self, ctx) }
                    { components::logs_panel::render_logs_panel(self, ctx) }
                </main>

                <footer class="app-footer">
                    <p>{"Detection Studio | Rust WASM"}</p>
                </footer>
            </div>
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        handlers::paint_canvases(self);
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.pollers.stop_all();
        // object URLs are revoked when dropped
        self.previews.clear();
        self.annot = None;
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
