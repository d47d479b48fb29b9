use std::time::Duration;

use async_trait::async_trait;
use lead_scoring::config::AutomationConfig;
use lead_scoring::workflows::leads::{AutomationAction, AutomationNotifier, NotifierError};
use reqwest::Client;
use tracing::{debug, info};

/// Posts Hot-lead actions to the downstream automation endpoint.
///
/// Without a configured endpoint the action is only logged.
pub(crate) struct HttpAutomationNotifier {
    client: Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl HttpAutomationNotifier {
    pub(crate) fn new(config: &AutomationConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl AutomationNotifier for HttpAutomationNotifier {
    async fn notify(&self, action: &AutomationAction) -> Result<(), NotifierError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            info!(
                lead_id = %action.lead_id,
                score = action.score,
                "no automation endpoint configured; hot lead action logged only"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .timeout(self.timeout)
            .json(action)
            .send()
            .await
            .map_err(|error| NotifierError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifierError::Rejected(response.status().as_u16()));
        }

        debug!(lead_id = %action.lead_id, %endpoint, "automation endpoint accepted action");
        Ok(())
    }
}
