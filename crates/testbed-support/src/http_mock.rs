//! Canned HTTP responder standing in for a downstream dependency.

use httpmock::{Mock, MockServer};
use testbed_config::MockResponderConfig;
use testbed_config::validate::validate_responder;
use tracing::info;

use crate::error::HarnessError;

/// In-process HTTP server answering every request with one fixed response.
pub struct MockResponder {
    server: Option<MockServer>,
    mock_id: usize,
}

impl MockResponder {
    /// Start a server that answers any method, path, or query with the
    /// configured status and body.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the configured status is invalid.
    pub async fn start(config: &MockResponderConfig) -> Result<Self, HarnessError> {
        validate_responder(config)?;
        let server = MockServer::start_async().await;
        let mock_id = {
            let mock = server
                .mock_async(|_when, then| {
                    then.status(config.status)
                        .header("content-type", "text/plain; charset=utf-8")
                        .body(&config.body);
                })
                .await;
            mock.id
        };
        info!(base_url = %server.base_url(), "mock responder listening");
        Ok(Self {
            server: Some(server),
            mock_id,
        })
    }

    /// Root URL of the server, or `None` once shut down.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        self.server.as_ref().map(MockServer::base_url)
    }

    /// Panics unless exactly one request has been answered.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Released`] after [`Self::shutdown`].
    pub async fn assert_served_once(&self) -> Result<(), HarnessError> {
        let server = self.server.as_ref().ok_or(HarnessError::Released)?;
        Mock::new(self.mock_id, server).assert_async().await;
        Ok(())
    }

    /// Release the server. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if let Some(server) = self.server.take() {
            info!(base_url = %server.base_url(), "mock responder stopped");
        }
    }
}
