use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::application::error::ErrorReport;
use crate::application::products::{
    CACHE_CLEAR_FAILED, CACHE_CLEARED, ClearOutcome, FetchOptions, IMPORT_SUCCESS, ProductError,
};
use crate::domain::types::{PostStatus, PostType};

use super::error::{ApiError, product_error_response};
use super::models::{FetchProductRequest, ImportProductRequest, LookupFailure, StatusMessage};
use super::state::ApiState;

const IMPORT_NOT_CONFIGURED: &str = "Import is not configured.";

fn invalid_body(rejection: JsonRejection) -> Response {
    ApiError::bad_request("Invalid request body", Some(rejection.body_text())).into_response()
}

pub async fn fetch_product(
    State(state): State<ApiState>,
    payload: Result<Json<FetchProductRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    let options = FetchOptions {
        test_connection: request.test_connection,
    };

    match state
        .products
        .fetch_by_identifiers(&request.asin, options)
        .await
    {
        Ok(fetched) => match fetched.body_json() {
            Ok(body) => Json(body).into_response(),
            Err(err) => {
                let mut response = (
                    StatusCode::BAD_GATEWAY,
                    Json(LookupFailure::new(ProductError::NoProductFound.public_message())),
                )
                    .into_response();
                ErrorReport::from_error(
                    "infra::http::api::fetch_product",
                    StatusCode::BAD_GATEWAY,
                    &err,
                )
                .attach(&mut response);
                response
            }
        },
        Err(err) => product_error_response(
            "infra::http::api::fetch_product",
            &err,
            LookupFailure::new(err.public_message()),
        ),
    }
}

pub async fn import_product(
    State(state): State<ApiState>,
    payload: Result<Json<ImportProductRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    let Some(importer) = state.importer.as_ref() else {
        let mut response = (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusMessage::error(IMPORT_NOT_CONFIGURED)),
        )
            .into_response();
        ErrorReport::from_message(
            "infra::http::api::import_product",
            StatusCode::SERVICE_UNAVAILABLE,
            "no database configured for imports",
        )
        .attach(&mut response);
        return response;
    };

    let status = match parse_or_default::<PostStatus>(request.post_status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };
    let post_type = match parse_or_default::<PostType>(request.post_type.as_deref()) {
        Ok(post_type) => post_type,
        Err(response) => return response,
    };

    match importer
        .import_by_identifiers(&request.asin, status, post_type)
        .await
    {
        Ok(summary) => {
            info!(
                target = "infra::http::api::import_product",
                imported = summary.imported(),
                "import request completed"
            );
            Json(StatusMessage::success(IMPORT_SUCCESS)).into_response()
        }
        Err(err) => product_error_response(
            "infra::http::api::import_product",
            &err,
            StatusMessage::error(err.public_message()),
        ),
    }
}

pub async fn clear_cache(State(state): State<ApiState>) -> Response {
    let body = match state.products.clear_cache() {
        ClearOutcome::Cleared { .. } => StatusMessage::success(CACHE_CLEARED),
        ClearOutcome::Failed => StatusMessage::error(CACHE_CLEAR_FAILED),
    };
    Json(body).into_response()
}

/// Blank or missing values fall back to the default variant.
fn parse_or_default<T>(raw: Option<&str>) -> Result<T, Response>
where
    T: FromStr<Err = crate::domain::error::DomainError> + Default,
{
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(T::default()),
        Some(value) => T::from_str(value).map_err(|err| {
            let mut response = (
                StatusCode::BAD_REQUEST,
                Json(StatusMessage::error(err.to_string())),
            )
                .into_response();
            ErrorReport::from_error(
                "infra::http::api::import_product",
                StatusCode::BAD_REQUEST,
                &err,
            )
            .attach(&mut response);
            response
        }),
    }
}
