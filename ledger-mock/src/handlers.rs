/// Axum HTTP handlers for the JSON-RPC endpoint

use axum::{extract::State, Json};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use gif_portal::ledger::types::{
    RpcBlockhash, RpcContext, RpcRequest, RpcResponse, UiAccount, WithContext,
};
use gif_portal::ledger::{Pubkey, Signature, Transaction};

use crate::cluster::{ClusterError, MockCluster};
use crate::types::*;

/// Shared application state
pub type AppState = Arc<MockCluster>;

/// POST /
/// Dispatches a single JSON-RPC 2.0 request
pub async fn rpc(
    State(cluster): State<AppState>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse<Value>> {
    cluster.record_request(&request.method);
    log::debug!("📥 {} #{}", request.method, request.id);

    let outcome = dispatch(&cluster, &request.method, &request.params);
    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(err) => {
            let error = err.into_error_object();
            log::warn!("⚠️  {} #{} failed: {}", request.method, request.id, error.message);
            (None, Some(error))
        }
    };

    Json(RpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result,
        error,
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

fn dispatch(cluster: &MockCluster, method: &str, params: &Value) -> Result<Value, ApiError> {
    match method {
        "getAccountInfo" => get_account_info(cluster, params),
        "getBalance" => get_balance(cluster, params),
        "getLatestBlockhash" => get_latest_blockhash(cluster),
        "sendTransaction" => send_transaction(cluster, params),
        "getSignatureStatuses" => get_signature_statuses(cluster, params),
        "requestAirdrop" => request_airdrop(cluster, params),
        "getSlot" => Ok(json!(cluster.slot())),
        "getHealth" => Ok(json!("ok")),
        other => Err(ApiError::MethodNotFound(other.to_string())),
    }
}

fn with_context<T: serde::Serialize>(cluster: &MockCluster, value: T) -> Result<Value, ApiError> {
    serde_json::to_value(WithContext {
        context: RpcContext {
            slot: cluster.slot(),
        },
        value,
    })
    .map_err(|e| ApiError::InvalidParams(e.to_string()))
}

fn param<T: DeserializeOwned>(params: &Value, index: usize, name: &str) -> Result<T, ApiError> {
    let raw = params
        .get(index)
        .cloned()
        .ok_or_else(|| ApiError::InvalidParams(format!("missing {}", name)))?;
    serde_json::from_value(raw).map_err(|e| ApiError::InvalidParams(format!("{}: {}", name, e)))
}

fn config(params: &Value, index: usize) -> Result<RequestConfig, ApiError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(RequestConfig::default()),
        Some(_) => param(params, index, "config"),
    }
}

fn pubkey_param(params: &Value, index: usize) -> Result<Pubkey, ApiError> {
    let text: String = param(params, index, "address")?;
    text.parse()
        .map_err(|e| ApiError::InvalidParams(format!("address '{}': {}", text, e)))
}

/// getAccountInfo [address, {encoding: "base64"}]
fn get_account_info(cluster: &MockCluster, params: &Value) -> Result<Value, ApiError> {
    let address = pubkey_param(params, 0)?;
    let config = config(params, 1)?;
    if let Some(encoding) = config.encoding.as_deref().filter(|e| *e != "base64") {
        return Err(ApiError::InvalidParams(format!(
            "unsupported encoding '{}'",
            encoding
        )));
    }

    let value = cluster.get_account(&address)?.map(|account| UiAccount {
        lamports: account.lamports,
        space: Some(account.data.len() as u64),
        data: (BASE64.encode(&account.data), "base64".to_string()),
        owner: account.owner.to_string(),
        executable: account.executable,
        rent_epoch: 0,
    });
    log::debug!(
        "   Account {} {}",
        address,
        if value.is_some() { "found" } else { "not found" }
    );
    with_context(cluster, value)
}

/// getBalance [address]
fn get_balance(cluster: &MockCluster, params: &Value) -> Result<Value, ApiError> {
    let address = pubkey_param(params, 0)?;
    with_context(cluster, cluster.balance(&address))
}

/// getLatestBlockhash [{commitment}]
fn get_latest_blockhash(cluster: &MockCluster) -> Result<Value, ApiError> {
    let slot = cluster.slot();
    with_context(
        cluster,
        RpcBlockhash {
            blockhash: cluster.latest_blockhash().to_string(),
            last_valid_block_height: slot + 150,
        },
    )
}

/// sendTransaction [base64 wire transaction, {encoding, preflightCommitment}]
fn send_transaction(cluster: &MockCluster, params: &Value) -> Result<Value, ApiError> {
    let payload: String = param(params, 0, "transaction")?;
    let config = config(params, 1)?;
    if config.encoding.as_deref() != Some("base64") {
        return Err(ApiError::InvalidParams(
            "only base64 encoded transactions are supported".to_string(),
        ));
    }
    log::debug!(
        "   Preflight at {} (skip: {})",
        config.preflight_commitment.as_deref().unwrap_or("finalized"),
        config.skip_preflight
    );

    let wire = BASE64
        .decode(payload)
        .map_err(|e| ApiError::InvalidParams(format!("transaction: {}", e)))?;
    let tx: Transaction = bincode::deserialize(&wire)
        .map_err(|e| ClusterError::InvalidTransaction(e.to_string()))?;
    let signature = cluster.send_transaction(&tx)?;
    Ok(json!(signature.to_string()))
}

/// getSignatureStatuses [[signature, ...], {searchTransactionHistory}]
fn get_signature_statuses(cluster: &MockCluster, params: &Value) -> Result<Value, ApiError> {
    let raw: Vec<String> = param(params, 0, "signatures")?;
    let signatures = raw
        .iter()
        .map(|s| {
            s.parse::<Signature>()
                .map_err(|e| ApiError::InvalidParams(format!("signature '{}': {}", s, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    with_context(cluster, cluster.signature_statuses(&signatures))
}

/// requestAirdrop [address, lamports]
fn request_airdrop(cluster: &MockCluster, params: &Value) -> Result<Value, ApiError> {
    let address = pubkey_param(params, 0)?;
    let lamports: u64 = param(params, 1, "lamports")?;
    let config = config(params, 2)?;
    log::debug!(
        "   Airdrop at {}",
        config.commitment.as_deref().unwrap_or("finalized")
    );
    Ok(json!(cluster.airdrop(&address, lamports).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_method() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let err = dispatch(&cluster, "getEverything", &json!([])).unwrap_err();
        assert_eq!(err.into_error_object().code, -32601);
    }

    #[test]
    fn test_missing_account_is_null() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let value = dispatch(
            &cluster,
            "getAccountInfo",
            &json!([Pubkey::new_unique().to_string(), { "encoding": "base64" }]),
        )
        .unwrap();
        assert!(value["value"].is_null());
        assert!(value["context"]["slot"].is_u64());
    }

    #[test]
    fn test_airdrop_then_balance() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let address = Pubkey::new_unique().to_string();
        dispatch(&cluster, "requestAirdrop", &json!([address, 42])).unwrap();
        let value = dispatch(&cluster, "getBalance", &json!([address])).unwrap();
        assert_eq!(value["value"], 42);
    }

    #[test]
    fn test_send_wire_transaction() {
        use gif_portal::ledger::{system_instruction, Keypair, Signer};

        let cluster = MockCluster::new(Pubkey::new_unique());
        let payer = Keypair::new();
        cluster.fund(&payer.pubkey(), 100);
        let tx = Transaction::new_signed_with_payer(
            &[system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 5)],
            Some(&payer.pubkey()),
            &[&payer],
            cluster.latest_blockhash(),
        );
        let wire = BASE64.encode(bincode::serialize(&tx).unwrap());

        let value = dispatch(&cluster, "sendTransaction", &json!([wire, { "encoding": "base64" }]))
            .unwrap();
        assert_eq!(value, json!(tx.signatures[0].to_string()));
        assert_eq!(cluster.balance(&payer.pubkey()), 95);

        let garbage = BASE64.encode([1u8, 2, 3]);
        let err = dispatch(&cluster, "sendTransaction", &json!([garbage, { "encoding": "base64" }]))
            .unwrap_err();
        assert_eq!(err.into_error_object().code, -32602);
    }
}
