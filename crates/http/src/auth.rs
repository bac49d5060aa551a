//! Identity middleware applied to `Authenticated` routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use bookshare_authz::bearer_token;
use bookshare_kernel::AppState;

use crate::error::AppError;

const UNAUTHORIZED_MESSAGE: &str = "unauthorized access";

/// Verify the bearer token and attach the
/// [`VerifiedIdentity`](bookshare_authz::VerifiedIdentity) to the request.
///
/// Every failure yields the same 401; the reason is only logged at debug level.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned);

    let Some(token) = token else {
        tracing::debug!("missing or malformed authorization header");
        return Err(AppError::unauthorized(UNAUTHORIZED_MESSAGE));
    };

    let identity = state.verifier.verify(&token).await.map_err(|err| {
        tracing::debug!(
            provider = state.verifier.provider(),
            reason = %err,
            "bearer token rejected"
        );
        AppError::unauthorized(UNAUTHORIZED_MESSAGE)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
