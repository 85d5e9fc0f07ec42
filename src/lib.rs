/// Meeting Mirror
///
/// Links local accounts to a meeting provider over OAuth2 and keeps a local
/// mirror of each account's remote meetings.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod meetings;
pub mod oauth;
pub mod provider;
pub mod rate_limit;
pub mod server;

pub use context::AppContext;
pub use error::{AppError, AppResult};
