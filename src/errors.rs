use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

use crate::store::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        FieldError::new(field, format!("{field} is required"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Errors during validation")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal(#[source] StoreError),
}

impl ApiError {
    /// Wraps a combined validation failure; the list is sorted so clients
    /// always see field errors in a stable order.
    pub fn validation(mut errors: Vec<FieldError>) -> Self {
        errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
        ApiError::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(message) => ApiError::NotFound(message),
            other => ApiError::Internal(other),
        }
    }
}

/// Flattens `validator`'s per-field map into `{field, message}` entries,
/// with field names translated to their wire spelling.
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut list = Vec::new();
    for (field, violations) in errors.field_errors() {
        for violation in violations {
            let message = violation
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            list.push(FieldError::new(camel_case(field), message));
        }
    }
    list
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Maps JSON bodies the deserializer rejects outright (malformed syntax,
/// wrong field types) into the uniform 400 envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("invalid JSON body: {err}")).into())
}

/// Same treatment for query strings the extractor cannot parse.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("invalid query string: {err}")).into()
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors_list: Option<&'a [FieldError]>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors_list = match self {
            ApiError::Validation(errors) => Some(errors.as_slice()),
            _ => None,
        };
        if let ApiError::Internal(source) = self {
            // Full detail stays server-side; the client gets a generic message.
            error!("unhandled internal error: {source:?}");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            message: self.to_string(),
            errors_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404() {
        let err = ApiError::from(StoreError::NotFound("No product with id abc".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No product with id abc");
    }

    #[test]
    fn store_io_failure_maps_to_500_with_generic_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ApiError::from(StoreError::from(io));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn validation_errors_are_sorted_by_field() {
        let err = ApiError::validation(vec![
            FieldError::new("rate", "rate must be an integer between 1 and 5"),
            FieldError::required("comment"),
        ]);
        match err {
            ApiError::Validation(list) => {
                assert_eq!(list[0].field, "comment");
                assert_eq!(list[1].field, "rate");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn field_names_are_camel_cased() {
        assert_eq!(camel_case("image_url"), "imageUrl");
        assert_eq!(camel_case("price"), "price");
    }
}
