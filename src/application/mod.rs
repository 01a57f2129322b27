// Application layer - Use cases over the state pipeline
pub mod dashboard_service;
pub mod ingestion_service;
pub mod pipeline;
pub mod state_publisher;
pub mod streaming_service;
