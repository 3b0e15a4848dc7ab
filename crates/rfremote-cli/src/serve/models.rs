use serde::{Deserialize, Serialize};

/// Response for `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Engine version detected at startup.
    pub engine: String,
    /// Version of this agent.
    pub agent: String,
}
