use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::{Receipt, ReceiptId};
use super::points::{RuleSet, RuleSetError};
use super::repository::{ReceiptRepository, RepositoryError, RuleStore};
use super::service::{ReceiptService, ReceiptServiceError};

const INVALID_RECEIPT: &str = "The receipt is invalid.";
const RECEIPT_NOT_FOUND: &str = "No receipt found for that ID.";
const RULES_UPLOAD_FIELD: &str = "file";

/// Router builder exposing receipt processing and rule configuration endpoints.
pub fn receipt_router<R, S>(service: Arc<ReceiptService<R, S>>) -> Router
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    Router::new()
        .route("/receipts/process", post(process_handler::<R, S>))
        .route("/receipts/:receipt_id/points", get(points_handler::<R, S>))
        .route(
            "/config/rules",
            get(get_rules_handler::<R, S>).put(update_rules_handler::<R, S>),
        )
        .with_state(service)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn process_handler<R, S>(
    State(service): State<Arc<ReceiptService<R, S>>>,
    payload: Result<axum::Json<Receipt>, JsonRejection>,
) -> Response
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    let receipt = match payload {
        Ok(axum::Json(receipt)) => receipt,
        Err(rejection) => {
            warn!(error = %rejection, "rejected receipt payload");
            return error_response(StatusCode::BAD_REQUEST, INVALID_RECEIPT);
        }
    };

    match service.process(receipt) {
        Ok(record) => (StatusCode::OK, axum::Json(json!({ "id": record.id }))).into_response(),
        Err(ReceiptServiceError::Validation(error)) => {
            let payload = json!({
                "error": INVALID_RECEIPT,
                "violations": error.messages(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing receipt: {other}"),
        ),
    }
}

pub(crate) async fn points_handler<R, S>(
    State(service): State<Arc<ReceiptService<R, S>>>,
    Path(receipt_id): Path<String>,
) -> Response
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    match service.points(&ReceiptId(receipt_id)) {
        Ok(points) => (StatusCode::OK, axum::Json(json!({ "points": points }))).into_response(),
        Err(ReceiptServiceError::Repository(RepositoryError::NotFound)) => {
            error_response(StatusCode::NOT_FOUND, RECEIPT_NOT_FOUND)
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub(crate) async fn get_rules_handler<R, S>(
    State(service): State<Arc<ReceiptService<R, S>>>,
) -> Response
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    match service.rules().and_then(|rules| Ok(rules.to_yaml_string()?)) {
        Ok(yaml) => (StatusCode::OK, yaml).into_response(),
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub(crate) async fn update_rules_handler<R, S>(
    State(service): State<Arc<ReceiptService<R, S>>>,
    mut multipart: Multipart,
) -> Response
where
    R: ReceiptRepository + 'static,
    S: RuleStore + 'static,
{
    let upload = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(RULES_UPLOAD_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.text().await {
                    Ok(text) => break Some((file_name, text)),
                    Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break None,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
        }
    };

    let Some((file_name, text)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "missing rules file upload");
    };

    if !(file_name.ends_with(".yml") || file_name.ends_with(".yaml")) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Only YAML files are allowed (.yml, .yaml)",
        );
    }

    let rules = match RuleSet::from_yaml_str(&text) {
        Ok(rules) => rules,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };

    match service
        .replace_rules(rules)
        .and_then(|rules| Ok(rules.to_yaml_string()?))
    {
        Ok(yaml) => (StatusCode::OK, yaml).into_response(),
        Err(ReceiptServiceError::Rules(err @ RuleSetError::Invalid(_))) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}
