use crate::config::UploadConfig;
use crate::image_file::ImageFile;
use crate::prediction::{PredictionApi, PredictionClientError, PredictionResponse};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

pub const PREDICTION_FAILED_MESSAGE: &str =
    "Failed to get prediction. Please check if the server is running.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please select an image file")]
    NotAnImage,
    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { limit_mb: u64 },
}

pub fn validate_file(file: &ImageFile, max_file_size_bytes: u64) -> Result<(), UploadError> {
    if !file.is_image() {
        return Err(UploadError::NotAnImage);
    }
    if file.size() > max_file_size_bytes {
        return Err(UploadError::TooLarge {
            limit_mb: max_file_size_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Checking,
    Ready,
    Starting,
    Offline,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Checking => "Checking server...",
            ServerStatus::Ready => "Server ready ✅",
            ServerStatus::Starting => "Server starting...",
            ServerStatus::Offline => "Server offline ❌",
        }
    }

    pub fn from_health(body: &Value) -> Self {
        match body.get("model_loaded").and_then(Value::as_bool) {
            Some(true) => ServerStatus::Ready,
            _ => ServerStatus::Starting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictOutcome {
    /// Nothing selected, or a request is already in flight.
    Skipped,
    Predicted,
    Failed,
}

#[derive(Debug, Clone)]
pub struct UploadState {
    pub selected_file: Option<ImageFile>,
    /// Data URL preview of `selected_file`, filled in once encoded.
    pub selected_image: Option<String>,
    pub is_drag_over: bool,
    pub is_loading: bool,
    pub prediction: Option<PredictionResponse>,
    pub error_message: Option<String>,
    pub show_error_animation: bool,
    pub server_status: ServerStatus,
    selection: u64,
}

impl Default for UploadState {
    fn default() -> Self {
        Self {
            selected_file: None,
            selected_image: None,
            is_drag_over: false,
            is_loading: false,
            prediction: None,
            error_message: None,
            show_error_animation: false,
            server_status: ServerStatus::Checking,
            selection: 0,
        }
    }
}

/// Owns the page state and turns user events into state changes and calls
/// against the prediction service.
///
/// The state lock is never held across an `.await`. Overlapping
/// predictions are prevented only by the loading flag: a response that
/// arrives after the image was cleared or replaced still lands in the state.
pub struct UploadController {
    client: Arc<dyn PredictionApi>,
    config: UploadConfig,
    state: Arc<Mutex<UploadState>>,
}

impl UploadController {
    pub fn new(client: Arc<dyn PredictionApi>, config: UploadConfig) -> Self {
        Self {
            client,
            config,
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.config.max_file_size_bytes
    }

    pub fn snapshot(&self) -> UploadState {
        self.state.lock().clone()
    }

    pub fn on_drag_over(&self) {
        self.state.lock().is_drag_over = true;
    }

    pub fn on_drag_leave(&self) {
        self.state.lock().is_drag_over = false;
    }

    /// Only the first dropped file is considered.
    pub async fn on_drop(&self, files: Vec<ImageFile>) -> Option<Result<(), UploadError>> {
        self.state.lock().is_drag_over = false;
        self.on_file_selected(files).await
    }

    pub async fn on_file_selected(
        &self,
        files: Vec<ImageFile>,
    ) -> Option<Result<(), UploadError>> {
        let file = files.into_iter().next()?;
        Some(self.handle_file(file).await)
    }

    #[instrument(skip(self, file), fields(file = %file.name, size = file.size()))]
    pub async fn handle_file(&self, file: ImageFile) -> Result<(), UploadError> {
        if let Err(err) = validate_file(&file, self.config.max_file_size_bytes) {
            tracing::warn!("Rejected file {}: {}", file.name, err);
            self.show_error(err.to_string());
            return Err(err);
        }

        let selection = {
            let mut state = self.state.lock();
            state.selection += 1;
            state.selected_file = Some(file.clone());
            state.selected_image = None;
            state.error_message = None;
            state.prediction = None;
            state.selection
        };

        match tokio::task::spawn_blocking(move || file.to_data_url()).await {
            Ok(preview) => {
                let mut state = self.state.lock();
                // cleared or replaced while encoding
                if state.selection == selection && state.selected_file.is_some() {
                    state.selected_image = Some(preview);
                }
            }
            Err(e) => tracing::error!("Preview encoding failed: {:?}", e),
        }

        Ok(())
    }

    /// Uploads the selected file to `/predict`.
    pub async fn predict(&self) -> PredictOutcome {
        let file = {
            let mut state = self.state.lock();
            let file = match state.selected_file.clone() {
                Some(file) if !state.is_loading => file,
                _ => return PredictOutcome::Skipped,
            };
            Self::start_loading(&mut state);
            file
        };

        let result = self.client.predict_from_file(&file).await;
        self.finish_prediction(result)
    }

    /// Sends the preview data URL to `/predict_base64`.
    pub async fn predict_preview(&self) -> PredictOutcome {
        let preview = {
            let mut state = self.state.lock();
            let preview = match state.selected_image.clone() {
                Some(preview) if !state.is_loading => preview,
                _ => return PredictOutcome::Skipped,
            };
            Self::start_loading(&mut state);
            preview
        };

        let result = self.client.predict_from_base64(&preview).await;
        self.finish_prediction(result)
    }

    fn start_loading(state: &mut UploadState) {
        state.is_loading = true;
        state.error_message = None;
        state.prediction = None;
    }

    fn finish_prediction(
        &self,
        result: Result<PredictionResponse, PredictionClientError>,
    ) -> PredictOutcome {
        match result {
            Ok(prediction) => {
                tracing::info!(
                    "Predicted {} with confidence {:.3}",
                    prediction.predicted_class,
                    prediction.confidence
                );
                let mut state = self.state.lock();
                state.prediction = Some(prediction);
                state.is_loading = false;
                PredictOutcome::Predicted
            }
            Err(e) => {
                tracing::error!("Prediction request failed: {}", e);
                self.show_error(PREDICTION_FAILED_MESSAGE);
                self.state.lock().is_loading = false;
                PredictOutcome::Failed
            }
        }
    }

    pub fn clear_image(&self) {
        let mut state = self.state.lock();
        state.selected_file = None;
        state.selected_image = None;
        state.prediction = None;
        state.error_message = None;
    }

    #[instrument(skip(self))]
    pub async fn check_server_health(&self) -> ServerStatus {
        let status = match self.client.check_health().await {
            Ok(body) => ServerStatus::from_health(&body),
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                ServerStatus::Offline
            }
        };

        tracing::info!("Prediction service status: {}", status.as_str());
        self.state.lock().server_status = status;
        status
    }

    /// Sets the error text and raises the shake flag, which drops back
    /// after the configured delay. Requires a Tokio runtime.
    pub fn show_error(&self, message: impl Into<String>) {
        {
            let mut state = self.state.lock();
            state.error_message = Some(message.into());
            state.show_error_animation = true;
        }

        let state = self.state.clone();
        let delay = self.config.get_error_animation_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.lock().show_error_animation = false;
        });
    }
}
