use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use gloo_timers::callback::Timeout;
use js_sys::Date;
use serde::de::DeserializeOwned;
use shared::api::{
    Endpoint, HealthResponse, NewDataResponse, PredictMultiResponse, RetrainResponse,
    FIELD_IMAGE, FIELD_IMAGES, FIELD_SCORE_THRESHOLD, FIELD_YOLO_LABEL_TEXT,
};
use thiserror::Error;
use web_sys::{AbortController, AbortSignal, FormData};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] gloo_net::Error),
    #[error("Server error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Could not build form data")]
    Form,
    #[error("Could not arm request timeout")]
    Deadline,
}

/// Aborts the request carrying its signal once the timer fires. Dropping it
/// before then disarms the timer.
struct Deadline {
    controller: AbortController,
    _timer: Timeout,
}

impl Deadline {
    fn after(timeout_ms: u32) -> Result<Self, ApiError> {
        let controller = AbortController::new().map_err(|_| ApiError::Deadline)?;
        let handle = controller.clone();
        let timer = Timeout::new(timeout_ms, move || handle.abort());
        Ok(Self {
            controller,
            _timer: timer,
        })
    }

    fn signal(&self) -> AbortSignal {
        self.controller.signal()
    }
}

/// Thin client over the detection service endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiClient {
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        endpoint.url(&self.base, Date::now() as u64)
    }

    pub async fn health(&self, timeout_ms: u32) -> Result<HealthResponse, ApiError> {
        let deadline = Deadline::after(timeout_ms)?;
        let resp = Request::get(&self.url(Endpoint::Health))
            .abort_signal(Some(&deadline.signal()))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn predict_multi(
        &self,
        files: &[GlooFile],
        score_threshold: f64,
    ) -> Result<PredictMultiResponse, ApiError> {
        let form = FormData::new().map_err(|_| ApiError::Form)?;
        for file in files {
            form.append_with_blob_and_filename(FIELD_IMAGES, file.as_ref(), &file.name())
                .map_err(|_| ApiError::Form)?;
        }
        form.append_with_str(FIELD_SCORE_THRESHOLD, &score_threshold.to_string())
            .map_err(|_| ApiError::Form)?;

        let resp = Request::post(&self.url(Endpoint::PredictMulti))
            .body(form)?
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn upload_new_data(
        &self,
        file: &GlooFile,
        yolo_labels: &str,
    ) -> Result<NewDataResponse, ApiError> {
        let form = FormData::new().map_err(|_| ApiError::Form)?;
        form.append_with_blob_and_filename(FIELD_IMAGE, file.as_ref(), &file.name())
            .map_err(|_| ApiError::Form)?;
        form.append_with_str(FIELD_YOLO_LABEL_TEXT, yolo_labels)
            .map_err(|_| ApiError::Form)?;

        let resp = Request::post(&self.url(Endpoint::NewData))
            .body(form)?
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn retrain(&self) -> Result<RetrainResponse, ApiError> {
        let resp = Request::post(&self.url(Endpoint::Retrain))
            .json(&serde_json::json!({}))?
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn reload_model(&self) -> Result<(), ApiError> {
        let resp = Request::post(&self.url(Endpoint::ReloadModel))
            .json(&serde_json::json!({}))?
            .send()
            .await?;
        checked(resp).await.map(|_| ())
    }

    pub async fn logs(&self, lines: u32, timeout_ms: u32) -> Result<String, ApiError> {
        self.text(Endpoint::Logs { lines }, timeout_ms).await
    }

    pub async fn retrain_progress(&self, lines: u32, timeout_ms: u32) -> Result<String, ApiError> {
        self.text(Endpoint::RetrainProgress { lines }, timeout_ms).await
    }

    async fn text(&self, endpoint: Endpoint, timeout_ms: u32) -> Result<String, ApiError> {
        let deadline = Deadline::after(timeout_ms)?;
        let resp = Request::get(&self.url(endpoint))
            .abort_signal(Some(&deadline.signal()))
            .send()
            .await?;
        // the body read stays under the same deadline
        Ok(checked(resp).await?.text().await?)
    }
}

async fn checked(resp: Response) -> Result<Response, ApiError> {
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    Ok(checked(resp).await?.json::<T>().await?)
}
