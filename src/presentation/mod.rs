// Presentation layer - HTTP API for renderers
pub mod app_state;
pub mod handlers;
