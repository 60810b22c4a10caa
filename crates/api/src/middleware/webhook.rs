//! Shared-secret guard for the database-triggered webhook.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use curico_core::error::CoreError;
use curico_core::webhook::secret_matches;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Marker extractor: the request carried the configured webhook secret.
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth;

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {WEBHOOK_SECRET_HEADER} header"
                )))
            })?;

        if !secret_matches(&state.config.webhook_secret, provided) {
            tracing::warn!("Webhook called with an invalid secret");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook secret".into(),
            )));
        }

        Ok(WebhookAuth)
    }
}
