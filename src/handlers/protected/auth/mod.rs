pub mod decide;
pub mod elevation;
pub mod session;

// Re-export handler functions for use in routing
pub use decide::authorize as authorize_post;
pub use decide::decide as decide_post;
pub use elevation::clear as elevation_clear;
pub use elevation::require as elevation_require;
pub use elevation::status as elevation_status;
pub use session::logout as session_logout;
pub use session::whoami as session_whoami;
