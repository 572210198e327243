mod bootstrap;
mod templates;

pub use bootstrap::*;
pub use templates::*;

use serde::Serialize;

/// StatusResponse is the `{success, message, status_code}` envelope used by
/// the template management endpoints
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
    pub status_code: u16,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status_code: 200,
        }
    }
}
