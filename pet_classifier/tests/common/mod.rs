#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

/// In-process stand-in for the remote classification service.
#[derive(Clone)]
pub struct ClassifierStandIn {
    pub model_loaded: bool,
    /// `None` answers every prediction with a 500.
    pub prediction: Option<Value>,
    pub parts: Arc<Mutex<Vec<ReceivedPart>>>,
    pub base64_bodies: Arc<Mutex<Vec<Value>>>,
}

impl ClassifierStandIn {
    pub fn new(model_loaded: bool, prediction: Option<Value>) -> Self {
        Self {
            model_loaded,
            prediction,
            parts: Arc::new(Mutex::new(Vec::new())),
            base64_bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn cat() -> Self {
        Self::new(
            true,
            Some(json!({"predicted_class": "cat", "confidence": 0.92, "raw_prediction": 0.08})),
        )
    }

    fn answer(&self) -> (StatusCode, Json<Value>) {
        match &self.prediction {
            Some(body) => (StatusCode::OK, Json(body.clone())),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Model not loaded"})),
            ),
        }
    }

    pub async fn spawn(self) -> SocketAddr {
        let router = Router::new()
            .route("/health", get(health))
            .route("/predict", post(predict))
            .route("/predict_base64", post(predict_base64))
            .with_state(self);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}

async fn health(State(stand_in): State<ClassifierStandIn>) -> Json<Value> {
    Json(json!({"status": "healthy", "model_loaded": stand_in.model_loaded}))
}

async fn predict(
    State(stand_in): State<ClassifierStandIn>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut has_image = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        has_image |= name == "image";
        stand_in.parts.lock().push(ReceivedPart {
            field: name,
            file_name,
            content_type,
            len,
        });
    }

    if !has_image {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No image provided"})),
        );
    }
    stand_in.answer()
}

async fn predict_base64(
    State(stand_in): State<ClassifierStandIn>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let has_image = body.get("image").is_some();
    stand_in.base64_bodies.lock().push(body);

    if !has_image {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No image data provided"})),
        );
    }
    stand_in.answer()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
