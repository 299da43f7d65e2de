use std::time::Duration;

use tracing::debug;

use super::provider::{Decision, DecisionProvider, DecisionRequest};
use crate::error::{Error, Result};

/// Remote provider speaking `{ "decision": ..., "rationale": ... }` over HTTP.
pub struct HttpProvider {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DecisionProvider for HttpProvider {
    fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        debug!("POST {} ({})", self.endpoint, request.kind);
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send_json(request)
            .map_err(|e| Error::DecisionProvider(format!("request failed: {}", e)))?;

        response
            .body_mut()
            .read_json::<Decision>()
            .map_err(|e| Error::DecisionProvider(format!("invalid response: {}", e)))
    }
}
