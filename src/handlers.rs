use std::time::Instant;

use actix_multipart::{Multipart, MultipartError};
use actix_web::error::BlockingError;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::ModelError;
use crate::models::{ErrorBody, PredictionOutcome};
use crate::service::PredictError;
use crate::state::AppState;

pub const PING_MESSAGE: &str = "Hello, I am alive";
pub const FILE_FIELD: &str = "file";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing multipart field `file`.")]
    MissingFile,
    #[error("Upload exceeds the {limit} byte limit.")]
    PayloadTooLarge { limit: usize },
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Prediction failed: {0}")]
    Inference(#[from] ModelError),
    #[error("Prediction was interrupted.")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Inference(_) | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(PING_MESSAGE)
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();

    let bytes = read_upload(payload, state.max_upload_bytes)
        .await
        .map_err(|e| {
            error!("[{}] rejected upload: {}", request_id, e);
            e
        })?;

    let started = Instant::now();
    let worker_state = state.clone();
    let outcome = web::block(move || worker_state.service.predict(&bytes)).await?;

    match outcome {
        Ok(prediction) => {
            info!(
                "[{}] predicted {} ({:.4}) in {:?}",
                request_id,
                prediction.class_label.label(),
                prediction.confidence,
                started.elapsed()
            );
            Ok(HttpResponse::Ok().json(PredictionOutcome::from(prediction)))
        }
        Err(PredictError::Decode(e)) => {
            warn!("[{}] failed to read the image: {}", request_id, e);
            Ok(HttpResponse::Ok().json(PredictionOutcome::decode_failure()))
        }
        Err(PredictError::Model(e)) => {
            error!("[{}] model inference failed: {}", request_id, e);
            Err(ApiError::Inference(e))
        }
    }
}

/// Collects the first `file` field of the form, skipping any other field.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;

        if field.content_disposition().get_name() != Some(FILE_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if bytes.len() + data.len() > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&data);
        }
        return Ok(bytes);
    }

    Err(ApiError::MissingFile)
}
