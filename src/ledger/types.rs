// JSON-RPC request/response types
//
// Field names follow the cluster's camelCase JSON so the same types serve the
// client and the mock cluster.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Durability threshold at which a transaction counts as done
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown commitment level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// Value wrapped with the slot it was read at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithContext<T> {
    pub context: RpcContext,
    pub value: T,
}

/// Account as returned by `getAccountInfo` with base64 encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAccount {
    pub lamports: u64,
    /// `[payload, "base64"]`
    pub data: (String, String),
    pub owner: String,
    pub executable: bool,
    pub rent_epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<Commitment>,
}

impl TransactionStatus {
    /// Whether this status has reached `commitment`.
    /// Nodes that omit `confirmationStatus` report `confirmations: null` once rooted.
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= commitment,
            None => self.confirmations.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
        assert_eq!("Finalized".parse::<Commitment>(), Ok(Commitment::Finalized));
        assert!("max".parse::<Commitment>().is_err());
    }

    #[test]
    fn test_status_satisfies() {
        let status = |confirmation_status, confirmations| TransactionStatus {
            slot: 1,
            confirmations,
            err: None,
            confirmation_status,
        };
        assert!(status(Some(Commitment::Confirmed), Some(3)).satisfies(Commitment::Processed));
        assert!(!status(Some(Commitment::Processed), Some(0)).satisfies(Commitment::Confirmed));
        assert!(status(None, None).satisfies(Commitment::Finalized));
        assert!(!status(None, Some(1)).satisfies(Commitment::Finalized));
    }

    #[test]
    fn test_error_envelope_without_result() {
        let json = r#"{"jsonrpc":"2.0","id":7,"error":{"code":-32005,"message":"busy"}}"#;
        let response: RpcResponse<WithContext<Option<UiAccount>>> =
            serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32005);
    }

    #[test]
    fn test_account_json_shape() {
        let json = r#"{
            "lamports": 1000,
            "data": ["AAEC", "base64"],
            "owner": "11111111111111111111111111111111",
            "executable": false,
            "rentEpoch": 18446744073709551615,
            "space": 3
        }"#;
        let account: UiAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.data.0, "AAEC");
        assert_eq!(account.rent_epoch, u64::MAX);
    }
}
