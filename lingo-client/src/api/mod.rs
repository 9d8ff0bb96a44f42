mod backend;
mod client;
mod error;

pub use backend::{Backend, ImageUpload};
pub use client::{ApiClient, AUTH_TOKEN_NAME};
pub use error::{ApiError, ApiResult, ErrorCategory};
