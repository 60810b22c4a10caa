//! Shared response envelope types for API handlers.
//!
//! Routes under `/api/v1` answer with a `{ "data": ... }` envelope. The
//! `/functions/v1` webhooks keep their flat bodies.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: stories }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
