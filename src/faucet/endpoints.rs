//! Third-party HTTP faucets.
//!
//! Any 2xx response counts as success; the body is never inspected.

use std::time::Duration;

use alloy::primitives::Address;
use serde_json::{json, Value};

use crate::config::{FaucetConfig, FaucetEndpointConfig, TokenFaucetConfig};
use crate::faucet::types::TokenFaucetResult;

#[derive(Debug, Clone)]
pub struct FaucetEndpoints {
    client: reqwest::Client,
    native: Vec<FaucetEndpointConfig>,
    tokens: Vec<TokenFaucetConfig>,
    network: String,
}

impl FaucetEndpoints {
    pub fn new(config: &FaucetConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default faucet HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            native: config.endpoints.clone(),
            tokens: config.token_endpoints.clone(),
            network: config.network_label.clone(),
        }
    }

    pub fn token_faucets(&self) -> &[TokenFaucetConfig] {
        &self.tokens
    }

    async fn post(&self, endpoint: &FaucetEndpointConfig, body: &Value) -> Result<(), String> {
        let response = self
            .client
            .post(&endpoint.url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("returned status {}", status))
        }
    }

    /// POST `{address}` to each native faucet in order. Returns the name of
    /// the first one that accepted.
    pub async fn request_native(&self, address: Address) -> Option<String> {
        let body = json!({ "address": address.to_string() });
        for endpoint in &self.native {
            match self.post(endpoint, &body).await {
                Ok(()) => {
                    tracing::info!(faucet = %endpoint.name, address = %address, "Faucet accepted request");
                    return Some(endpoint.name.clone());
                }
                Err(e) => {
                    tracing::warn!(faucet = %endpoint.name, error = %e, "Faucet request failed");
                }
            }
        }
        None
    }

    /// POST `{address, token, network}` to the token's faucets until one
    /// accepts. A token with a manual page falls back to it.
    pub async fn request_token(
        &self,
        faucet: &TokenFaucetConfig,
        address: Address,
    ) -> TokenFaucetResult {
        let body = json!({
            "address": address.to_string(),
            "token": faucet.token,
            "network": self.network,
        });

        for endpoint in &faucet.endpoints {
            match self.post(endpoint, &body).await {
                Ok(()) => {
                    tracing::info!(token = %faucet.token, faucet = %endpoint.name, "Token faucet accepted request");
                    return TokenFaucetResult {
                        token: faucet.token.clone(),
                        faucet: Some(endpoint.name.clone()),
                        manual_url: None,
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(token = %faucet.token, faucet = %endpoint.name, error = %e, "Token faucet failed");
                }
            }
        }

        if let Some(template) = &faucet.manual_url {
            let url = template.replace("{address}", &address.to_string());
            tracing::info!(token = %faucet.token, url = %url, "Token needs the manual faucet page");
            return TokenFaucetResult {
                token: faucet.token.clone(),
                faucet: None,
                manual_url: Some(url),
                error: None,
            };
        }

        TokenFaucetResult {
            token: faucet.token.clone(),
            faucet: None,
            manual_url: None,
            error: Some("All faucets failed".to_string()),
        }
    }
}
