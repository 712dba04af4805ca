use {
    axum::{
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    serde_json::json,
    sleuth_plugins::{InvokeError, NotFoundError},
};

/// An invocation failure on its way to the HTTP client.
///
/// The body always carries the error `kind` and a user-safe `message`;
/// validation failures add the failing `fields` and internal failures their
/// `incident` id.
#[derive(Debug)]
pub struct ApiError(pub InvokeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InvokeError::NotFound(_) => StatusCode::NOT_FOUND,
            InvokeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            InvokeError::Plugin(_) => StatusCode::BAD_REQUEST,
            InvokeError::Definition(_) | InvokeError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            InvokeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<InvokeError> for ApiError {
    fn from(err: InvokeError) -> Self {
        Self(err)
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.0.kind(),
            "message": self.0.user_message(),
        });
        match &self.0 {
            InvokeError::Validation(e) => body["fields"] = json!(e.errors),
            InvokeError::Internal { incident } => body["incident"] = json!(incident.to_string()),
            _ => {},
        }
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use sleuth_plugins::{FieldError, FieldIssue, ValidationError};

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let not_found = ApiError::from(NotFoundError::Entity {
            entity: "ghost".into(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError(InvokeError::Plugin("nope".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(InvokeError::Cancelled).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let invalid = ApiError(InvokeError::Validation(ValidationError {
            entity: "website".into(),
            errors: vec![FieldError {
                label: "Domain".into(),
                field: "domain".into(),
                issue: FieldIssue::Missing,
            }],
        }));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
