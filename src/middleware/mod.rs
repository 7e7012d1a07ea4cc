pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, prompt_callback_middleware, CurrentSession};
pub use response::{ApiResponse, ApiResult};
