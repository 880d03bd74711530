use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body whose rejections use the API error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        email: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/login");
        if let Some(value) = content_type {
            builder = builder.header(CONTENT_TYPE, value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_well_formed_body_is_extracted() {
        let JsonBody(login) = JsonBody::<Login>::from_request(
            request(Some("application/json"), r#"{"email":"anna@retouch.app"}"#),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(login.email, "anna@retouch.app");
    }

    #[tokio::test]
    async fn test_rejections_become_validation_errors() {
        for (content_type, body) in [
            (Some("application/json"), r#"{"email":1}"#),
            (Some("application/json"), "{not json"),
            (None, r#"{"email":"anna@retouch.app"}"#),
        ] {
            let err = JsonBody::<Login>::from_request(request(content_type, body), &())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?} -> {:?}", body, err);
        }
    }
}
