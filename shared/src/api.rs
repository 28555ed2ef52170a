//! Wire types and endpoint paths of the detection service.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const FIELD_IMAGES: &str = "images";
pub const FIELD_IMAGE: &str = "image";
pub const FIELD_SCORE_THRESHOLD: &str = "score_threshold";
pub const FIELD_YOLO_LABEL_TEXT: &str = "yolo_label_text";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in the pixel space the model ran on.
    pub xyxy: [f64; 4],
    pub score: f64,
    pub label: String,
}

impl Detection {
    /// `"car 87.5%"`
    pub fn caption(&self) -> String {
        format!("{} {:.1}%", self.label, self.score * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictItem {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub image_w: Option<f64>,
    #[serde(default)]
    pub image_h: Option<f64>,
    #[serde(default)]
    pub inference_ms: Option<f64>,
    #[serde(default)]
    pub found: Option<bool>,
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PredictItem {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn detections(&self) -> &[Detection] {
        self.detections.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictMultiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub results: Vec<PredictItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active_model: Option<serde_json::Value>,
    #[serde(default)]
    pub registered_model: Option<String>,
    #[serde(default)]
    pub production_version: Option<u32>,
    #[serde(default)]
    pub latest_version: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            ok: Some(false),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok.unwrap_or(false) && self.error.is_none()
    }

    /// Short model description for the header badge.
    pub fn summary(&self) -> String {
        let name = self.registered_model.as_deref().unwrap_or("model");
        match (self.production_version, self.latest_version) {
            (Some(v), _) => format!("{} v{} (Production)", name, v),
            (None, Some(v)) => format!("{} v{}", name, v),
            (None, None) => name.to_string(),
        }
    }

    /// Pretty-printed `active_model` block for the expandable details view.
    pub fn active_model_details(&self) -> Option<String> {
        match &self.active_model {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => serde_json::to_string_pretty(value).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewDataResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub saved_image: Option<String>,
    #[serde(default)]
    pub saved_label: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrainResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub notebook: Option<String>,
}

impl RetrainResponse {
    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some("DONE")
    }
}

/// Inline outcome of a user-triggered action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionResult {
    pub ok: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            ok: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<NewDataResponse> for ActionResult {
    fn from(resp: NewDataResponse) -> Self {
        match (resp.ok, resp.error) {
            (true, _) => Self::success(format!(
                "Saved {} / {}",
                resp.saved_image.as_deref().unwrap_or("image"),
                resp.saved_label.as_deref().unwrap_or("label")
            )),
            (false, error) => Self::failed(error.unwrap_or_else(|| "upload rejected".into())),
        }
    }
}

impl From<RetrainResponse> for ActionResult {
    fn from(resp: RetrainResponse) -> Self {
        let status = resp.status.clone().unwrap_or_else(|| "UNKNOWN".into());
        match resp.error {
            Some(error) => Self::failed(format!("{}: {}", status, error)),
            None if resp.is_done() => Self::success(format!("Retrain finished ({})", status)),
            None => Self::failed(format!("Retrain ended with status {}", status)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    PredictMulti,
    NewData,
    Retrain,
    ReloadModel,
    Logs { lines: u32 },
    RetrainProgress { lines: u32 },
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/health",
            Endpoint::PredictMulti => "/predict-multi",
            Endpoint::NewData => "/new-data",
            Endpoint::Retrain => "/retrain",
            Endpoint::ReloadModel => "/reload-model",
            Endpoint::Logs { .. } => "/logs",
            Endpoint::RetrainProgress { .. } => "/retrain-progress",
        }
    }

    /// Full URL. Text endpoints get a `ts` cache buster so polls are never served stale.
    pub fn url(&self, base: &str, cache_buster: u64) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Endpoint::Logs { lines } | Endpoint::RetrainProgress { lines } => {
                format!("{}{}?lines={}&ts={}", base, self.path(), lines, cache_buster)
            }
            _ => format!("{}{}", base, self.path()),
        }
    }
}
