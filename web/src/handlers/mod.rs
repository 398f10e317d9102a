//! HTTP request handlers shared by every MissionBoard service.

pub mod health;

// Re-export common handler utilities
pub use health::{health_check, readiness_response, HealthCheck, HealthReport, HealthStatus};
