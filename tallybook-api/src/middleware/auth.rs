/// Bearer authentication middleware
///
/// Validates the access token in `Authorization: Bearer <token>` and inserts
/// an [`AuthContext`] into request extensions. Handlers read it with
/// `Extension<AuthContext>`.
///
/// # Example
///
/// ```no_run
/// use axum::{routing::get, Extension, Router};
/// use tallybook_api::{app::AppState, middleware::auth::require_auth};
/// use tallybook_shared::auth::middleware::AuthContext;
///
/// # fn example(state: AppState) -> Router<AppState> {
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     auth.email
/// }
///
/// Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// # }
/// ```

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tallybook_shared::auth::middleware::authenticate;

/// Rejects requests without a valid access token
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.tokens.access_secret()).map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
