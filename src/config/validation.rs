//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, addresses and value ranges
//! - Detect duplicate token symbols
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::Address;

use crate::config::schema::WalletConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = value.parse::<url::Url>() {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }
    for (i, url) in config.network.rpc_urls.iter().enumerate() {
        check_url(&mut errors, &format!("network.rpc_urls[{}]", i), url);
    }

    if config.rpc.fallback_urls.is_empty() {
        errors.push(ValidationError::new(
            "rpc.fallback_urls",
            "at least one fallback endpoint is required",
        ));
    }
    for (i, url) in config.rpc.fallback_urls.iter().enumerate() {
        check_url(&mut errors, &format!("rpc.fallback_urls[{}]", i), url);
    }
    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be greater than 0"));
    }

    if let Some(url) = &config.wallet.url {
        check_url(&mut errors, "wallet.url", url);
    }
    if config.wallet.poll_interval_ms == 0 {
        errors.push(ValidationError::new("wallet.poll_interval_ms", "must be greater than 0"));
    }

    let mut symbols = HashSet::new();
    for (i, token) in config.tokens.iter().enumerate() {
        let field = format!("tokens[{}]", i);
        if token.symbol.trim().is_empty() {
            errors.push(ValidationError::new(&field, "symbol must not be empty"));
        } else if !symbols.insert(token.symbol.clone()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate token symbol '{}'", token.symbol),
            ));
        }
        if token.address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                &field,
                format!("invalid contract address '{}'", token.address),
            ));
        }
    }

    if config.transfer.reset_after_secs == 0 {
        errors.push(ValidationError::new("transfer.reset_after_secs", "must be greater than 0"));
    }
    if config.transfer.receipt_poll_ms == 0 {
        errors.push(ValidationError::new("transfer.receipt_poll_ms", "must be greater than 0"));
    }

    match parse_ether(&config.faucet.amount) {
        Ok(amount) if amount.is_zero() => {
            errors.push(ValidationError::new("faucet.amount", "must be positive"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "faucet.amount",
            format!("invalid amount '{}': {}", config.faucet.amount, e),
        )),
    }
    for (i, endpoint) in config.faucet.endpoints.iter().enumerate() {
        check_url(&mut errors, &format!("faucet.endpoints[{}]", i), &endpoint.url);
    }
    for token_faucet in &config.faucet.token_endpoints {
        for (i, endpoint) in token_faucet.endpoints.iter().enumerate() {
            check_url(
                &mut errors,
                &format!("faucet.token_endpoints.{}[{}]", token_faucet.token, i),
                &endpoint.url,
            );
        }
        if token_faucet.endpoints.is_empty() && token_faucet.manual_url.is_none() {
            errors.push(ValidationError::new(
                format!("faucet.token_endpoints.{}", token_faucet.token),
                "needs at least one endpoint or a manual_url",
            ));
        }
    }
    if config.faucet.reset_after_secs == 0 {
        errors.push(ValidationError::new("faucet.reset_after_secs", "must be greater than 0"));
    }
    if config.balances.refresh_interval_secs == 0 {
        errors.push(ValidationError::new(
            "balances.refresh_interval_secs",
            "must be greater than 0",
        ));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("invalid socket address '{}'", addr),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
