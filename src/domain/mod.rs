// Domain layer - State derivation and aggregation
pub mod annotation;
pub mod dashboard;
pub mod duty_cycle;
pub mod state;
pub mod telemetry;
pub mod timeline;
pub mod transition;
