//! Business actions and the prepare endpoint's wire types.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Business domain served by a prepare endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Lending,
    Staking,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Lending => "lending",
            Domain::Staking => "staking",
        }
    }
}

/// A user-initiated on-chain action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    Stake,
    Unstake,
}

impl Action {
    pub fn domain(&self) -> Domain {
        match self {
            Action::Supply | Action::Withdraw | Action::Borrow | Action::Repay => Domain::Lending,
            Action::Stake | Action::Unstake => Domain::Staking,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Supply => "supply",
            Action::Withdraw => "withdraw",
            Action::Borrow => "borrow",
            Action::Repay => "repay",
            Action::Stake => "stake",
            Action::Unstake => "unstake",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "supply" => Ok(Action::Supply),
            "withdraw" => Ok(Action::Withdraw),
            "borrow" => Ok(Action::Borrow),
            "repay" => Ok(Action::Repay),
            "stake" => Ok(Action::Stake),
            "unstake" => Ok(Action::Unstake),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Parameters of an action, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    pub chain_id: u64,
    pub token: String,
    /// Decimal amount in token units, e.g. "12.5".
    pub amount: String,
    pub user_address: Address,
}

/// One user intent: an action plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
    #[serde(flatten)]
    pub params: ActionParams,
}

impl ActionRequest {
    pub fn new(action: Action, params: ActionParams) -> Self {
        Self { action, params }
    }

    pub fn domain(&self) -> Domain {
        self.action.domain()
    }
}

/// Request body sent to `POST /{domain}/prepare/{action}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequestBody {
    pub user_address: Address,
    pub chain_id: u64,
    pub token: String,
    pub amount: String,
}

impl From<&ActionParams> for PrepareRequestBody {
    fn from(params: &ActionParams) -> Self {
        Self {
            user_address: params.user_address,
            chain_id: params.chain_id,
            token: params.token.clone(),
            amount: params.amount.clone(),
        }
    }
}

/// Successful prepare response: one unsigned transaction per step key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareResponse {
    pub data: BTreeMap<String, RawStep>,
}

/// One unsigned transaction as the backend sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub value: Option<Quantity>,
    pub gas_limit: Quantity,
    pub chain_id: Quantity,
}

/// Numeric field that backends send as a JSON number, decimal string or `0x` hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            Quantity::Number(n) => Some(U256::from(*n)),
            Quantity::Text(s) => {
                let s = s.trim();
                match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16).ok(),
                    Some(_) => None,
                    None => U256::from_str_radix(s, 10).ok(),
                }
            }
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_u256().and_then(|v| u64::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_domain() {
        assert_eq!(Action::Supply.domain(), Domain::Lending);
        assert_eq!(Action::Repay.domain(), Domain::Lending);
        assert_eq!(Action::Unstake.domain(), Domain::Staking);
        assert_eq!("UNSTAKE".parse::<Action>(), Ok(Action::Unstake));
        assert!("swap".parse::<Action>().is_err());
    }

    #[test]
    fn test_quantity_forms() {
        assert_eq!(Quantity::Number(21000).to_u64(), Some(21000));
        assert_eq!(Quantity::Text("21000".into()).to_u64(), Some(21000));
        assert_eq!(Quantity::Text("0x5208".into()).to_u64(), Some(21000));
        assert_eq!(Quantity::Text("0x".into()).to_u256(), None);
        assert_eq!(Quantity::Text("1.5".into()).to_u256(), None);
        assert_eq!(
            Quantity::Text("1000000000000000000000".into()).to_u256(),
            Some(U256::from(10u128.pow(21)))
        );
        assert_eq!(Quantity::Text("1000000000000000000000".into()).to_u64(), None);
    }

    #[test]
    fn test_prepare_response_parses() {
        let json = r#"{
            "data": {
                "supply": {
                    "to": "0x1111111111111111111111111111111111111111",
                    "data": "0x095ea7b3",
                    "value": "0",
                    "gasLimit": 250000,
                    "chainId": 43114
                }
            }
        }"#;
        let response: PrepareResponse = serde_json::from_str(json).unwrap();
        let raw = &response.data["supply"];
        assert_eq!(raw.gas_limit.to_u64(), Some(250_000));
        assert_eq!(raw.chain_id.to_u64(), Some(43114));
        assert_eq!(raw.data.len(), 4);
    }

    #[test]
    fn test_request_body_is_camel_case() {
        let params = ActionParams {
            chain_id: 43114,
            token: "USDC".into(),
            amount: "10".into(),
            user_address: Address::ZERO,
        };
        let json = serde_json::to_value(PrepareRequestBody::from(&params)).unwrap();
        assert_eq!(json["chainId"], 43114);
        assert!(json.get("userAddress").is_some());
    }
}
