//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (domains reference configured chains)
//! - Validate value ranges (timeouts > 0, URLs parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TxflowConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::{DomainConfig, TxflowConfig};

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

/// Validate a parsed configuration.
pub fn validate_config(config: &TxflowConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "backend.base_url", &config.backend.base_url);
    if config.backend.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "backend.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.tracker.hook_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "tracker.hook_timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.tracker.enabled {
        check_url(&mut errors, "tracker.base_url", &config.tracker.base_url);
        if config.tracker.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "tracker.request_timeout_secs",
                "must be greater than 0",
            ));
        }
    }

    if config.receipts.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "receipts.poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.receipts.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "receipts.timeout_secs",
            "must be greater than 0",
        ));
    } else if config.receipts.poll_interval_ms >= config.receipts.timeout_secs * 1_000 {
        errors.push(ValidationError::new(
            "receipts.poll_interval_ms",
            "must be shorter than receipts.timeout_secs",
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be at least 1",
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    let mut seen = HashSet::new();
    for (i, chain) in config.chains.iter().enumerate() {
        let prefix = format!("chains[{}]", i);
        if !seen.insert(chain.chain_id) {
            errors.push(ValidationError::new(
                format!("{}.chain_id", prefix),
                format!("duplicate chain id {}", chain.chain_id),
            ));
        }
        check_url(&mut errors, &format!("{}.rpc_url", prefix), &chain.rpc_url);
        for (j, url) in chain.failover_urls.iter().enumerate() {
            check_url(&mut errors, &format!("{}.failover_urls[{}]", prefix, j), url);
        }
        if chain.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.rpc_timeout_secs", prefix),
                "must be greater than 0",
            ));
        }
    }

    check_domain(&mut errors, "lending", &config.lending, &seen);
    check_domain(&mut errors, "staking", &config.staking, &seen);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            field,
            format!("invalid URL '{}': {}", value, e),
        )),
    }
}

fn check_domain(
    errors: &mut Vec<ValidationError>,
    name: &str,
    domain: &DomainConfig,
    chains: &HashSet<u64>,
) {
    for chain_id in &domain.supported_chains {
        if !chains.contains(chain_id) {
            errors.push(ValidationError::new(
                format!("{}.supported_chains", name),
                format!("chain {} has no [[chains]] entry", chain_id),
            ));
        }
    }
    if domain.supported_tokens.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::new(
            format!("{}.supported_tokens", name),
            "token symbols must not be empty",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ChainConfig;

    fn valid_config() -> TxflowConfig {
        let mut config = TxflowConfig::default();
        config.chains.push(ChainConfig {
            chain_id: 43114,
            name: "avalanche".into(),
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".into(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
        });
        config.lending.supported_chains = vec![43114];
        config.lending.supported_tokens = vec!["USDC".into()];
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = valid_config();
        config.backend.base_url = "not a url".into();
        config.receipts.timeout_secs = 0;
        config.staking.supported_chains = vec![1];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "backend.base_url"));
        assert!(errors.iter().any(|e| e.field == "receipts.timeout_secs"));
        assert!(errors
            .iter()
            .any(|e| e.field == "staking.supported_chains" && e.message.contains("chain 1")));
    }

    #[test]
    fn test_poll_interval_must_fit_in_timeout() {
        let mut config = valid_config();
        config.receipts.poll_interval_ms = 5_000;
        config.receipts.timeout_secs = 5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "receipts.poll_interval_ms");
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let mut config = valid_config();
        let dup = config.chains[0].clone();
        config.chains.push(dup);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("duplicate chain id 43114"));
    }

    #[test]
    fn test_tracker_url_only_checked_when_enabled() {
        let mut config = valid_config();
        config.tracker.base_url = "ftp://tracker".into();
        assert!(validate_config(&config).is_ok());

        config.tracker.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("unsupported scheme"));
    }

    #[test]
    fn test_zero_hook_timeout_rejected() {
        let mut config = valid_config();
        config.tracker.hook_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "tracker.hook_timeout_ms");
    }
}
