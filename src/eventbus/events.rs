use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::country::CountryCode;

/// Wire-visible status of a [`PathUpdate`] (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathUpdateStatus {
    InProgress,
    Completed,
    Failed,
    Rerouted,
}

/// Wire-visible circuit breaker state (§4.5, §6); distinct from
/// [`crate::circuit::breaker::CircuitState`] so the event payload is
/// stable even if the internal representation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireCircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathUpdate {
    pub tx_id: Uuid,
    pub path: Vec<CountryCode>,
    pub current_hop: usize,
    pub amount: Decimal,
    pub status: PathUpdateStatus,
    pub old_path: Option<Vec<CountryCode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerEvent {
    pub node_id: CountryCode,
    pub state: WireCircuitState,
    pub prev_state: Option<WireCircuitState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityUpdate {
    pub source_id: CountryCode,
    pub target_id: CountryCode,
    pub old_volume: Decimal,
    pub new_volume: Decimal,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: CountryCode,
    pub active: bool,
    pub load_percent: Option<f64>,
}

/// The four wire-visible event kinds (§4.5, §6). Serializes adjacently
/// tagged and flattened into [`Event`] so the wire shape is
/// `{ "type": "<KIND>", "data": {...}, "timestamp": <ms> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    #[serde(rename = "PATH_UPDATE")]
    PathUpdate(PathUpdate),
    #[serde(rename = "CIRCUIT_BREAKER")]
    CircuitBreaker(CircuitBreakerEvent),
    #[serde(rename = "LIQUIDITY_UPDATE")]
    LiquidityUpdate(LiquidityUpdate),
    #[serde(rename = "NODE_STATUS")]
    NodeStatus(NodeStatus),
}

/// An event stamped with a millisecond timestamp at broadcast time
/// (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_update_status_serializes_snake_case() {
        let json = serde_json::to_string(&PathUpdateStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn event_serializes_with_type_and_data_fields() {
        let event = Event {
            payload: EventPayload::NodeStatus(NodeStatus {
                node_id: CountryCode::new("USA"),
                active: true,
                load_percent: Some(42.0),
            }),
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "NODE_STATUS");
        assert_eq!(value["data"]["node_id"], "USA");
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
    }
}
