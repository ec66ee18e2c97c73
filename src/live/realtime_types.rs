// Wire types for the realtime websocket (Phoenix channel framing)
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";
pub const POSTGRES_CHANGES: &str = "postgres_changes";
pub const SYSTEM: &str = "system";

// Every frame in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

// phx_reply payload: {"status": "ok", "response": {...}}
#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

// postgres_changes payload: {"ids": [...], "data": {...}}
#[derive(Debug, Deserialize)]
pub struct ChangePayload {
    pub data: ChangeData,
}

#[derive(Debug, Deserialize)]
pub struct ChangeData {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type", alias = "eventType")]
    pub change_type: String,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
    #[serde(alias = "new", default)]
    pub record: Value,
    #[serde(default)]
    pub errors: Option<Value>,
}

// Subscription filter sent with phx_join
#[derive(Debug, Clone, Serialize)]
pub struct ChangeFilter {
    pub event: String,
    pub schema: String,
    pub table: String,
}
