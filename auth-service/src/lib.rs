pub mod app;
pub mod config;
pub mod directory;
pub mod metrics;
pub mod session_handlers;

pub use app::{build_router, AppState};
