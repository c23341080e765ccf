//! Request builder: business action → ordered, validated steps.
//!
//! # Step mapping
//! ```text
//! { supply }                 → [primary]
//! { approval|approve|validation, <action> } → [approval (follow-up), primary]
//! ```
//! Anything else is treated as a broken backend contract.

use alloy::primitives::U256;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DomainConfig, TxflowConfig};
use crate::error::{FlowError, FlowResult};
use crate::observability::metrics;
use crate::prepare::api::PrepareApi;
use crate::prepare::types::{Action, ActionParams, Domain, PrepareRequestBody, PrepareResponse, RawStep};
use crate::sequence::step::{Step, StepRole};

/// Step keys that denote an allowance/validation transaction.
pub const APPROVAL_KEYS: [&str; 3] = ["approval", "approve", "validation"];

/// Maps actions to steps through a [`PrepareApi`].
#[derive(Clone)]
pub struct RequestBuilder {
    api: Arc<dyn PrepareApi>,
    lending: DomainConfig,
    staking: DomainConfig,
}

impl RequestBuilder {
    pub fn new(api: Arc<dyn PrepareApi>, lending: DomainConfig, staking: DomainConfig) -> Self {
        Self {
            api,
            lending,
            staking,
        }
    }

    pub fn from_config(api: Arc<dyn PrepareApi>, config: &TxflowConfig) -> Self {
        Self::new(api, config.lending.clone(), config.staking.clone())
    }

    fn domain_config(&self, domain: Domain) -> &DomainConfig {
        match domain {
            Domain::Lending => &self.lending,
            Domain::Staking => &self.staking,
        }
    }

    /// Check inputs against the domain's bounds before any network call.
    pub fn validate(&self, action: Action, params: &ActionParams) -> FlowResult<()> {
        let domain = action.domain();
        let rules = self.domain_config(domain);

        if !rules.supports_chain(params.chain_id) {
            return Err(FlowError::Validation(format!(
                "chain {} is not supported for {}",
                params.chain_id,
                domain.as_str()
            )));
        }
        if !rules.supports_token(&params.token) {
            return Err(FlowError::Validation(format!(
                "token {} is not supported for {}",
                params.token,
                domain.as_str()
            )));
        }
        if !is_positive_decimal(&params.amount) {
            return Err(FlowError::Validation(format!(
                "amount '{}' must be a positive decimal",
                params.amount
            )));
        }
        Ok(())
    }

    /// Produce the ordered steps for an action.
    pub async fn prepare(&self, action: Action, params: &ActionParams) -> FlowResult<Vec<Step>> {
        let domain = action.domain();
        if let Err(e) = self.validate(action, params) {
            metrics::record_prepare_request(domain.as_str(), "invalid");
            return Err(e);
        }

        let body = PrepareRequestBody::from(params);
        let response = match self.api.prepare(domain, action, &body).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_prepare_request(domain.as_str(), e.kind().as_str());
                return Err(e);
            }
        };

        let steps = steps_from_response(action, params.chain_id, response)?;
        metrics::record_prepare_request(domain.as_str(), "ok");
        tracing::info!(
            action = action.as_str(),
            chain_id = params.chain_id,
            steps = steps.len(),
            "Action prepared"
        );
        Ok(steps)
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("lending", &self.lending)
            .field("staking", &self.staking)
            .finish()
    }
}

/// Deterministically order and convert a prepare response.
pub fn steps_from_response(
    action: Action,
    chain_id: u64,
    response: PrepareResponse,
) -> FlowResult<Vec<Step>> {
    let mut approval: Option<(String, RawStep)> = None;
    let mut primary: Option<(String, RawStep)> = None;

    for (key, raw) in response.data {
        let slot = if APPROVAL_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
            &mut approval
        } else {
            &mut primary
        };
        if slot.is_some() {
            return Err(malformed(format!(
                "unexpected extra step '{}' for {}",
                key, action
            )));
        }
        *slot = Some((key, raw));
    }

    let (primary_key, primary_raw) =
        primary.ok_or_else(|| malformed(format!("no primary step for {}", action)))?;

    let mut steps = Vec::with_capacity(2);
    if let Some((key, raw)) = approval {
        steps.push(convert(key, raw, StepRole::Approval, chain_id, true)?);
    }
    steps.push(convert(primary_key, primary_raw, StepRole::Primary, chain_id, false)?);
    Ok(steps)
}

fn convert(
    label: String,
    raw: RawStep,
    role: StepRole,
    expected_chain: u64,
    requires_follow_up: bool,
) -> FlowResult<Step> {
    let chain_id = raw
        .chain_id
        .to_u64()
        .ok_or_else(|| malformed(format!("step '{}' has an invalid chainId", label)))?;
    if chain_id != expected_chain {
        return Err(malformed(format!(
            "step '{}' targets chain {} but {} was requested",
            label, chain_id, expected_chain
        )));
    }
    let gas_limit = raw
        .gas_limit
        .to_u64()
        .filter(|g| *g > 0)
        .ok_or_else(|| malformed(format!("step '{}' has an invalid gasLimit", label)))?;
    let value = match &raw.value {
        Some(q) => q
            .to_u256()
            .ok_or_else(|| malformed(format!("step '{}' has an invalid value", label)))?,
        None => U256::ZERO,
    };

    Ok(Step {
        id: Uuid::new_v4(),
        role,
        label,
        to: raw.to,
        data: raw.data,
        value,
        gas_limit,
        chain_id,
        requires_follow_up,
    })
}

fn malformed(detail: String) -> FlowError {
    FlowError::malformed_response(detail)
}

fn is_positive_decimal(amount: &str) -> bool {
    let amount = amount.trim();
    let (int, frac) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return false;
    }
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits(int) || !digits(frac) {
        return false;
    }
    int.chars().chain(frac.chars()).any(|c| c != '0')
}
