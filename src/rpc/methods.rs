//! RPC Method Implementations
//!
//! Each method corresponds to a JSON-RPC call. Parameters are positional.
//! Amounts travel as plain JSON integers in base units (10^-18); views that
//! depend on the time take an optional timestamp and default to the time
//! of the last committed transaction.

use std::sync::{Arc, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;
use crate::court::MotionId;
use crate::crypto::Address;
use crate::error::{ErrorKind, LedgerError, NodeError};
use crate::events::{EventRecord, TokenKind};
use crate::node::{Engine, EngineState, Receipt, Transaction};
use crate::storage::LedgerDb;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;
const PERSISTENCE_FAILED: i32 = -32010;

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }

    fn rejected(id: Value, err: &LedgerError) -> Self {
        let code = match err.kind() {
            ErrorKind::Authorization => -32001,
            ErrorKind::Arithmetic => -32002,
            ErrorKind::StatePrecondition => -32003,
            ErrorKind::ParameterBounds => -32004,
            ErrorKind::Terminal => -32005,
        };
        Self::error(id, code, err.to_string())
    }
}

/// RPC Handler State
pub struct RpcState {
    pub engine: Arc<Mutex<Engine>>,
    /// Committed transactions are written through when present
    pub db: Option<LedgerDb>,
}

impl RpcState {
    pub fn new(engine: Engine, db: Option<LedgerDb>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            db,
        }
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        match self.engine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Process a JSON-RPC request and return a response
pub fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    let params = Params(request.params.unwrap_or(Value::Null));
    let result = match request.method.as_str() {
        "getInfo" => get_info(state),
        "balanceOf" => balance_of(state, &params),
        "allowance" => allowance(state, &params),
        "feePool" => fee_pool(state, &params),
        "stakeSnapshot" => stake_snapshot(state, &params),
        "feePeriod" => fee_period(state),
        "nominStatus" => nomin_status(state, &params),
        "collateralisationRatio" => collateralisation_ratio(state, &params),
        "priceIsStale" => price_is_stale(state, &params),
        "motion" => motion(state, &params),
        "motionState" => motion_state(state, &params),
        "nativeBalanceOf" => native_balance_of(state, &params),
        "getEvents" => get_events(state, &params),
        "sendTransaction" => send_transaction(state, &params),
        _ => Err(RpcFailure::Method(request.method.clone())),
    };
    match result {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(RpcFailure::Method(method)) => {
            JsonRpcResponse::error(request.id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
        }
        Err(RpcFailure::Params(message)) => {
            JsonRpcResponse::error(request.id, INVALID_PARAMS, format!("Invalid params: {}", message))
        }
        Err(RpcFailure::Ledger(err)) => JsonRpcResponse::rejected(request.id, &err),
        Err(RpcFailure::Persistence(message)) => JsonRpcResponse::error(request.id, PERSISTENCE_FAILED, message),
    }
}

enum RpcFailure {
    Method(String),
    Params(String),
    Ledger(LedgerError),
    Persistence(String),
}

impl From<LedgerError> for RpcFailure {
    fn from(err: LedgerError) -> Self {
        RpcFailure::Ledger(err)
    }
}

type RpcResult = Result<Value, RpcFailure>;

/// Positional parameters; a bare value counts as a one-element list
struct Params(Value);

impl Params {
    fn get(&self, index: usize) -> Option<&Value> {
        match &self.0 {
            Value::Array(items) => items.get(index),
            Value::Null => None,
            single if index == 0 => Some(single),
            _ => None,
        }
    }

    fn address(&self, index: usize, name: &str) -> Result<Address, RpcFailure> {
        self.get(index)
            .and_then(Value::as_str)
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| RpcFailure::Params(format!("expected {} address at position {}", name, index)))
    }

    fn token(&self, index: usize) -> Result<TokenKind, RpcFailure> {
        let name = self.get(index).and_then(Value::as_str).unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "havven" => Ok(TokenKind::Havven),
            "nomin" => Ok(TokenKind::Nomin),
            _ => Err(RpcFailure::Params(format!("expected \"havven\" or \"nomin\" at position {}", index))),
        }
    }

    fn u64(&self, index: usize, name: &str) -> Result<u64, RpcFailure> {
        self.get(index)
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcFailure::Params(format!("expected {} at position {}", name, index)))
    }

    fn optional_u64(&self, index: usize) -> Option<u64> {
        self.get(index).and_then(Value::as_u64)
    }
}

fn get_info(state: &RpcState) -> RpcResult {
    let engine = state.engine();
    let nomin = engine.nomin();
    Ok(json!({
        "havven": engine.havven().address(),
        "nomin": nomin.address(),
        "court": engine.court().address(),
        "owner": nomin.token().owned().owner(),
        "oracle": nomin.oracle(),
        "lastTimestamp": engine.last_timestamp(),
        "transactionCount": engine.state().transaction_count,
        "eventCount": engine.events().len(),
        "havvenSupply": engine.havven().total_supply(),
        "nominSupply": nomin.total_supply(),
        "nativeSupply": engine.native().total()?,
        "destroyed": nomin.is_destroyed(),
    }))
}

fn balance_of(state: &RpcState, params: &Params) -> RpcResult {
    let token = params.token(0)?;
    let account = params.address(1, "account")?;
    let engine = state.engine();
    Ok(json!(engine.state().balance_of(token, &account)))
}

fn allowance(state: &RpcState, params: &Params) -> RpcResult {
    let token = params.token(0)?;
    let owner = params.address(1, "owner")?;
    let spender = params.address(2, "spender")?;
    let engine = state.engine();
    let value = match token {
        TokenKind::Havven => engine.havven().token().allowance(&owner, &spender),
        TokenKind::Nomin => engine.nomin().token().allowance(&owner, &spender),
    };
    Ok(json!(value))
}

fn fee_pool(state: &RpcState, params: &Params) -> RpcResult {
    let token = params.token(0)?;
    let engine = state.engine();
    let pool = match token {
        TokenKind::Havven => engine.havven().token().fee_pool(),
        TokenKind::Nomin => engine.nomin().fee_pool(),
    };
    Ok(json!(pool))
}

fn stake_snapshot(state: &RpcState, params: &Params) -> RpcResult {
    let account = params.address(0, "account")?;
    let engine = state.engine();
    let havven = engine.havven();
    Ok(json!({
        "balance": havven.balance_of(&account),
        "snapshot": havven.current_stake_snapshot(&account)?,
        "feeEntitlement": havven.fee_entitlement(&account)?,
    }))
}

fn fee_period(state: &RpcState) -> RpcResult {
    let engine = state.engine();
    let havven = engine.havven();
    Ok(json!({
        "period": havven.fee_period(),
        "totalStake": havven.current_total_stake_snapshot()?,
    }))
}

fn nomin_status(state: &RpcState, params: &Params) -> RpcResult {
    let engine = state.engine();
    let now = params.optional_u64(0).unwrap_or_else(|| engine.last_timestamp());
    let nomin = engine.nomin();
    let feed = nomin.price_feed();
    Ok(json!({
        "etherPrice": feed.ether_price(),
        "lastPriceUpdate": feed.last_price_update(),
        "stalePeriod": feed.stale_period(),
        "priceIsStale": nomin.price_is_stale(now),
        "totalSupply": nomin.total_supply(),
        "nominPool": nomin.nomin_pool(),
        "feePool": nomin.fee_pool(),
        "poolFeeRate": nomin.pool_fee_rate(),
        "transferFeeRate": nomin.token().transfer_fee_rate(),
        "collateral": engine.native().balance_of(&nomin.address()),
        "liquidationTimestamp": nomin.liquidation_timestamp(),
        "liquidationPeriod": nomin.liquidation_period(),
        "canSelfDestruct": nomin.can_self_destruct(now),
        "destroyed": nomin.is_destroyed(),
    }))
}

fn collateralisation_ratio(state: &RpcState, params: &Params) -> RpcResult {
    let engine = state.engine();
    let now = params.optional_u64(0).unwrap_or_else(|| engine.last_timestamp());
    Ok(json!(engine.nomin().collateralisation_ratio(engine.native(), now)?))
}

fn price_is_stale(state: &RpcState, params: &Params) -> RpcResult {
    let engine = state.engine();
    let now = params.optional_u64(0).unwrap_or_else(|| engine.last_timestamp());
    Ok(json!(engine.nomin().price_is_stale(now)))
}

fn motion(state: &RpcState, params: &Params) -> RpcResult {
    let id: MotionId = params.u64(0, "motion id")?;
    let engine = state.engine();
    let court = engine.court();
    match court.motion(id) {
        Some(motion) => Ok(json!({
            "motion": motion,
            "passes": court.motion_passes(id, engine.havven()),
        })),
        None => Ok(Value::Null),
    }
}

fn motion_state(state: &RpcState, params: &Params) -> RpcResult {
    let id: MotionId = params.u64(0, "motion id")?;
    let engine = state.engine();
    let now = params.optional_u64(1).unwrap_or_else(|| engine.last_timestamp());
    Ok(json!(engine.court().motion_state(id, now)))
}

fn native_balance_of(state: &RpcState, params: &Params) -> RpcResult {
    let account = params.address(0, "account")?;
    let engine = state.engine();
    Ok(json!(engine.native().balance_of(&account)))
}

const MAX_EVENTS: usize = 1_000;

fn get_events(state: &RpcState, params: &Params) -> RpcResult {
    let from = params.optional_u64(0).unwrap_or(0);
    let limit = params
        .optional_u64(1)
        .map_or(MAX_EVENTS, |limit| (limit as usize).min(MAX_EVENTS));
    let engine = state.engine();
    Ok(json!(engine.events_since(from, limit)))
}

/// Params: [transaction] as an object or as a JSON string
fn send_transaction(state: &RpcState, params: &Params) -> RpcResult {
    let raw = params
        .get(0)
        .ok_or_else(|| RpcFailure::Params("expected a transaction".into()))?;
    let parsed = match raw {
        Value::String(text) => serde_json::from_str::<Transaction>(text),
        other => serde_json::from_value::<Transaction>(other.clone()),
    };
    let tx = parsed.map_err(|e| RpcFailure::Params(e.to_string()))?;

    let mut engine = state.engine();
    let receipt = execute_durably(&mut engine, tx, |next, events| match &state.db {
        Some(db) => db.commit(next, events),
        None => Ok(()),
    })?;
    Ok(json!(receipt))
}

/// Persist the outcome of `tx` first; the in-memory engine only moves once it is on disk
fn execute_durably<F>(engine: &mut Engine, tx: Transaction, persist: F) -> Result<Receipt, RpcFailure>
where
    F: FnOnce(&EngineState, &[EventRecord]) -> Result<(), NodeError>,
{
    let staged = engine.stage(tx)?;
    if let Err(e) = persist(staged.state(), &staged.receipt().events) {
        error!(error = %e, sequence = staged.receipt().sequence, "failed to persist transaction, discarded");
        return Err(RpcFailure::Persistence(e.to_string()));
    }
    Ok(engine.commit(staged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UNIT;
    use crate::node::{Call, GenesisConfig};

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params: Some(params),
            id: json!(1),
        }
    }

    fn state() -> (RpcState, GenesisConfig) {
        let config = GenesisConfig::default();
        (RpcState::new(config.build().unwrap(), None), config)
    }

    #[test]
    fn test_balance_of() {
        let (state, config) = state();
        let response = handle_request(&state, request("balanceOf", json!(["havven", config.owner])));
        assert!(response.error.is_none());
        let expected: u128 = crate::constants::INITIAL_HAVVEN_SUPPLY;
        assert_eq!(response.result.unwrap(), json!(expected));
    }

    #[test]
    fn test_send_transaction() {
        let (state, config) = state();
        let alice = Address::from_label("alice");
        let tx = json!({
            "sender": config.owner,
            "timestamp": config.genesis_time + 1,
            "call": { "HavvenTransfer": { "to": alice, "value": 7 } }
        });
        let response = handle_request(&state, request("sendTransaction", json!([tx])));
        assert!(response.error.is_none(), "{:?}", response.error);

        let response = handle_request(&state, request("balanceOf", json!(["Havven", alice])));
        assert_eq!(response.result.unwrap(), json!(7));
    }

    #[test]
    fn test_failed_persistence_discards_transaction() {
        let config = GenesisConfig::default();
        let mut engine = config.build().unwrap();
        let alice = Address::from_label("alice");
        let tx = Transaction::new(
            config.owner,
            config.genesis_time + 1,
            Call::HavvenTransfer { to: alice, value: 7 },
        );

        let result = execute_durably(&mut engine, tx.clone(), |_, _| {
            Err(NodeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        });
        assert!(matches!(result, Err(RpcFailure::Persistence(_))));
        assert_eq!(engine.havven().balance_of(&alice), 0);
        assert_eq!(engine.state().transaction_count, 0);
        assert_eq!(engine.last_timestamp(), config.genesis_time);

        let mut persisted = None;
        let receipt = execute_durably(&mut engine, tx, |next, events| {
            persisted = Some((next.transaction_count, events.len()));
            Ok(())
        })
        .ok()
        .unwrap();
        assert_eq!(persisted, Some((1, receipt.events.len())));
        assert_eq!(engine.havven().balance_of(&alice), 7);
    }

    #[test]
    fn test_large_amount_as_string() {
        let (state, config) = state();
        let alice = Address::from_label("alice");
        let tx = format!(
            r#"{{"sender":"{}","timestamp":{},"call":{{"HavvenTransfer":{{"to":"{}","value":{}}}}}}}"#,
            config.owner,
            config.genesis_time + 1,
            alice,
            1_000 * UNIT
        );
        let response = handle_request(&state, request("sendTransaction", json!([tx])));
        assert!(response.error.is_none(), "{:?}", response.error);
        let engine = state.engine();
        assert_eq!(engine.havven().balance_of(&alice), 1_000 * UNIT);
    }

    #[test]
    fn test_ledger_errors_map_to_codes() {
        let (state, config) = state();
        let tx = json!({
            "sender": Address::from_label("mallory"),
            "timestamp": config.genesis_time + 1,
            "call": "ForceLiquidation"
        });
        let response = handle_request(&state, request("sendTransaction", json!([tx])));
        assert_eq!(response.error.unwrap().code, -32001);
    }

    #[test]
    fn test_unknown_method_and_bad_params() {
        let (state, _) = state();
        let response = handle_request(&state, request("getblock", Value::Null));
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

        let response = handle_request(&state, request("balanceOf", json!(["ether", "0x00"])));
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn test_collateralisation_ratio_without_supply() {
        let (state, _) = state();
        let response = handle_request(&state, request("collateralisationRatio", json!([])));
        assert_eq!(response.error.unwrap().code, -32002);
    }
}
