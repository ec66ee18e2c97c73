// Realtime adapter: subscribe to INSERTs on the snapshot table over the hosted websocket

use super::realtime_types::{
    ChangeFilter, ChangePayload, PhoenixMessage, ReplyPayload, HEARTBEAT, PHX_CLOSE, PHX_ERROR,
    PHX_JOIN, PHX_LEAVE, PHX_REPLY, POSTGRES_CHANGES, SYSTEM,
};
use super::{LiveError, LiveFeed};
use crate::config::Settings;
use crate::snapshot::LiquiditySnapshot;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const JOIN_REF: &str = "1";
const PROTOCOL_VERSION: &str = "1.0.0";

pub struct RealtimeFeed {
    pub ws_url: String,
    pub api_key: String,
    pub topic: String, // e.g. "realtime:liquidity_changes"
    pub schema: String,
    pub table: String,
    pub heartbeat: Duration,
}

/// What one incoming frame means for the subscription.
#[derive(Debug, PartialEq)]
pub enum Frame {
    Insert(Box<LiquiditySnapshot>),
    Reply { msg_ref: Option<String>, ok: bool, response: Value },
    Undecodable(String),
    Closed(String),
    System(Value),
    Ignored,
}

impl RealtimeFeed {
    pub fn new(
        url: Option<&str>,
        api_key: Option<&str>,
        channel: &str,
        schema: &str,
        table: &str,
        heartbeat: Duration,
    ) -> Result<Self, LiveError> {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| LiveError::Config("backend URL is not set".into()))?;
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LiveError::Config("anonymous key is not set".into()))?;

        Ok(Self {
            ws_url: websocket_url(url, api_key)?,
            api_key: api_key.to_string(),
            topic: format!("realtime:{channel}"),
            schema: schema.to_string(),
            table: table.to_string(),
            heartbeat,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LiveError> {
        Self::new(
            settings.supabase.url.as_deref(),
            settings.supabase.anon_key.as_deref(),
            &settings.live.channel,
            &settings.live.schema,
            &settings.source.table,
            Duration::from_secs(settings.live.heartbeat_secs),
        )
    }

    pub fn join_message(&self) -> PhoenixMessage {
        let filter = ChangeFilter {
            event: "INSERT".into(),
            schema: self.schema.clone(),
            table: self.table.clone(),
        };
        PhoenixMessage {
            topic: self.topic.clone(),
            event: PHX_JOIN.into(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [filter],
                    "private": false
                },
                "access_token": self.api_key,
            }),
            msg_ref: Some(JOIN_REF.into()),
            join_ref: Some(JOIN_REF.into()),
        }
    }

    pub fn leave_message(&self, msg_ref: u64) -> PhoenixMessage {
        PhoenixMessage {
            topic: self.topic.clone(),
            event: PHX_LEAVE.into(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(JOIN_REF.into()),
        }
    }

    /// Interpret one text frame received on the socket.
    pub fn classify(&self, text: &str) -> Frame {
        let msg: PhoenixMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => return Frame::Undecodable(format!("bad frame: {e}")),
        };
        if msg.topic != self.topic && msg.topic != "phoenix" {
            return Frame::Ignored;
        }

        match msg.event.as_str() {
            POSTGRES_CHANGES => {
                let change: ChangePayload = match serde_json::from_value(msg.payload) {
                    Ok(change) => change,
                    Err(e) => return Frame::Undecodable(format!("bad change payload: {e}")),
                };
                let data = change.data;
                if data.change_type != "INSERT" || data.table != self.table || data.schema != self.schema {
                    return Frame::Ignored;
                }
                match serde_json::from_value::<LiquiditySnapshot>(data.record) {
                    Ok(snapshot) => Frame::Insert(Box::new(snapshot)),
                    Err(e) => Frame::Undecodable(format!("bad row: {e}")),
                }
            }
            PHX_REPLY => match serde_json::from_value::<ReplyPayload>(msg.payload) {
                Ok(reply) => Frame::Reply {
                    msg_ref: msg.msg_ref,
                    ok: reply.status == "ok",
                    response: reply.response,
                },
                Err(e) => Frame::Undecodable(format!("bad reply: {e}")),
            },
            PHX_ERROR | PHX_CLOSE => Frame::Closed(msg.event),
            SYSTEM => Frame::System(msg.payload),
            _ => Frame::Ignored,
        }
    }
}

/// `https://<project>.supabase.co` -> `wss://<project>.supabase.co/realtime/v1/websocket?apikey=..&vsn=1.0.0`
pub fn websocket_url(base: &str, api_key: &str) -> Result<String, LiveError> {
    let mut url = Url::parse(base.trim()).map_err(|e| LiveError::Config(format!("invalid backend URL: {e}")))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(LiveError::Config(format!("unsupported URL scheme {other:?}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| LiveError::Config("cannot switch URL to websocket scheme".into()))?;
    url.set_path("/realtime/v1/websocket");
    url.query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url.to_string())
}

fn encode(msg: &PhoenixMessage) -> Message {
    // PhoenixMessage only holds strings and JSON values; serialisation cannot fail
    Message::Text(serde_json::to_string(msg).unwrap_or_default())
}

#[async_trait::async_trait]
impl LiveFeed for RealtimeFeed {
    async fn run(&self, tx: mpsc::Sender<LiquiditySnapshot>, mut stop: watch::Receiver<bool>) -> Result<(), LiveError> {
        let (ws_stream, response) = tokio::select! {
            connected = tokio_tungstenite::connect_async(self.ws_url.as_str()) => connected?,
            _ = stop.wait_for(|stopped| *stopped) => {
                info!(topic = %self.topic, "Stopped before the websocket handshake finished");
                return Ok(());
            }
        };
        info!(status = %response.status(), topic = %self.topic, "Connected to realtime websocket");
        let (mut write, mut read) = ws_stream.split();

        write.send(encode(&self.join_message())).await?;
        debug!(table = %self.table, schema = %self.schema, "Sent subscription");

        let mut next_ref: u64 = 2;
        let mut heartbeat = interval_at(Instant::now() + self.heartbeat, self.heartbeat);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let msg = PhoenixMessage {
                        topic: "phoenix".into(),
                        event: HEARTBEAT.into(),
                        payload: json!({}),
                        msg_ref: Some(next_ref.to_string()),
                        join_ref: None,
                    };
                    next_ref += 1;
                    write.send(encode(&msg)).await?;
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!(topic = %self.topic, "Unsubscribing from realtime channel");
                        write.send(encode(&self.leave_message(next_ref))).await?;
                        let _ = write.close().await;
                        return Ok(());
                    }
                }
                incoming = read.next() => {
                    let text = match incoming {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "Realtime websocket closed by server");
                            return Ok(());
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    };

                    match self.classify(&text) {
                        Frame::Insert(snapshot) => {
                            debug!(id = snapshot.id, "Received inserted snapshot");
                            if tx.send(*snapshot).await.is_err() {
                                // subscriber went away
                                return Ok(());
                            }
                        }
                        Frame::Reply { msg_ref, ok, response } => {
                            if msg_ref.as_deref() == Some(JOIN_REF) {
                                if !ok {
                                    return Err(LiveError::Rejected(response.to_string()));
                                }
                                info!(topic = %self.topic, "Subscribed to inserts");
                            } else if !ok {
                                warn!(?msg_ref, %response, "Realtime request failed");
                            }
                        }
                        Frame::Closed(event) => {
                            warn!(%event, "Realtime channel closed");
                            return Ok(());
                        }
                        Frame::System(payload) => {
                            if payload.get("status").and_then(Value::as_str) == Some("error") {
                                warn!(%payload, "Realtime system error");
                            } else {
                                debug!(%payload, "Realtime system message");
                            }
                        }
                        Frame::Undecodable(reason) => warn!(%reason, "Dropping realtime message"),
                        Frame::Ignored => {}
                    }
                }
            }
        }
    }
}
