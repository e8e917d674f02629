/// JSON-RPC types specific to the mock
///
/// Request and response envelopes are shared with the client
/// (`gif_portal::ledger::types`); this module adds the server-side error type
/// and the request configuration objects the handlers read.

use serde::Deserialize;

use gif_portal::ledger::types::RpcErrorObject;

use crate::cluster::ClusterError;

/// Custom error type for handlers
#[derive(Debug)]
pub enum ApiError {
    MethodNotFound(String),
    InvalidParams(String),
    Cluster(ClusterError),
}

impl ApiError {
    pub fn into_error_object(self) -> RpcErrorObject {
        let (code, message) = match self {
            ApiError::MethodNotFound(method) => (-32601, format!("Method not found: {}", method)),
            ApiError::InvalidParams(msg) => (-32602, format!("Invalid params: {}", msg)),
            ApiError::Cluster(err) => (err.code(), err.to_string()),
        };
        RpcErrorObject {
            code,
            message,
            data: None,
        }
    }
}

impl From<ClusterError> for ApiError {
    fn from(err: ClusterError) -> Self {
        ApiError::Cluster(err)
    }
}

/// Trailing configuration object accepted by most methods
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub commitment: Option<String>,
    #[serde(default)]
    pub preflight_commitment: Option<String>,
    #[serde(default)]
    pub skip_preflight: bool,
}
