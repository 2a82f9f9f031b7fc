use super::error::AppError;
use crate::database::models::UserId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// The caller is authenticated upstream (token handling is delegated); the
/// proxy forwards the resolved account id in this header.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Copy, Clone)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let id = raw.parse::<i32>().map_err(|_| AppError::Unauthorized)?;
        Ok(CurrentUser(UserId::new(id)))
    }
}

#[cfg(test)]
fn extract(request: axum::http::Request<()>) -> Result<CurrentUser, AppError> {
    let (mut parts, ()) = request.into_parts();
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(CurrentUser::from_request_parts(&mut parts, &()))
}

#[test]
fn current_user_from_header() {
    let request = axum::http::Request::builder()
        .header(USER_ID_HEADER, "7")
        .body(())
        .unwrap();
    let user = extract(request).unwrap();
    assert_eq!(user.0, UserId::new(7));
}

#[test]
fn current_user_missing_header() {
    let request = axum::http::Request::builder().body(()).unwrap();
    assert!(matches!(extract(request), Err(AppError::Unauthorized)));
}

#[test]
fn current_user_malformed_header() {
    let request = axum::http::Request::builder()
        .header(USER_ID_HEADER, "not-a-number")
        .body(())
        .unwrap();
    assert!(matches!(extract(request), Err(AppError::Unauthorized)));
}
