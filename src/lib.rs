pub mod auth;
pub mod cli;
pub mod config;
pub mod elevation;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod session;
