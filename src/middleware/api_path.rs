use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Path` extractor whose rejections render as an [`AppError`] JSON body
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            // Missing or unsupported params mean the route table is wrong
            Err(rejection) if rejection.status().is_server_error() => {
                Err(AppError::Internal(rejection.body_text()))
            }
            Err(rejection) => Err(AppError::InvalidInput(rejection.body_text())),
        }
    }
}
