use crate::config::PredictionServiceConfig;
use crate::image_file::ImageFile;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictionClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Prediction service answered with status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictedClass {
    Cat,
    Dog,
}

impl PredictedClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictedClass::Cat => "cat",
            PredictedClass::Dog => "dog",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PredictedClass::Cat => "Cat",
            PredictedClass::Dog => "Dog",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PredictedClass::Cat => "🐱",
            PredictedClass::Dog => "🐶",
        }
    }
}

impl fmt::Display for PredictedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_class: PredictedClass,
    pub confidence: f64,
    #[serde(default)]
    pub raw_prediction: f64,
}

#[derive(Serialize)]
struct Base64Request<'a> {
    image: &'a str,
}

/// Calls made against the remote classification service.
#[async_trait]
pub trait PredictionApi: Send + Sync + 'static {
    async fn predict_from_file(
        &self,
        file: &ImageFile,
    ) -> Result<PredictionResponse, PredictionClientError>;

    async fn predict_from_base64(
        &self,
        data: &str,
    ) -> Result<PredictionResponse, PredictionClientError>;

    async fn check_health(&self) -> Result<serde_json::Value, PredictionClientError>;
}

/// HTTP client for the remote service. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(config: &PredictionServiceConfig) -> Result<Self, PredictionClientError> {
        Self::with_base_url(config.get_address(), config.get_request_timeout())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, PredictionClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PredictionClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PredictionClientError::Status(status));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PredictionApi for PredictionClient {
    #[instrument(skip(self, file), fields(file = %file.name, size = file.size()))]
    async fn predict_from_file(
        &self,
        file: &ImageFile,
    ) -> Result<PredictionResponse, PredictionClientError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(self.endpoint("predict"))
            .multipart(form)
            .send()
            .await?;

        Self::decode(response).await
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn predict_from_base64(
        &self,
        data: &str,
    ) -> Result<PredictionResponse, PredictionClientError> {
        let response = self
            .http
            .post(self.endpoint("predict_base64"))
            .json(&Base64Request { image: data })
            .send()
            .await?;

        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn check_health(&self) -> Result<serde_json::Value, PredictionClientError> {
        let response = self.http.get(self.endpoint("health")).send().await?;
        Self::decode(response).await
    }
}
