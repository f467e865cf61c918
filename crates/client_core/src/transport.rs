//! Live rover connection: one WebSocket per controlled rover.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{domain::RoverId, protocol::RoverPath};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{config::normalize_server_url, error::ClientError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSignal {
    /// Text frame exactly as received.
    Event(String),
    Closed { reason: Option<String> },
}

/// Both directions of an established live connection.
pub struct LiveLink {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<LinkSignal>,
    reader_task: Option<JoinHandle<()>>,
}

impl LiveLink {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<LinkSignal>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            reader_task: None,
        }
    }

    /// Queues a text frame; false once the writer side has gone away.
    pub fn transmit(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    pub async fn recv(&mut self) -> LinkSignal {
        self.inbound
            .recv()
            .await
            .unwrap_or(LinkSignal::Closed { reason: None })
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, rover_id: RoverId) -> Result<LiveLink>;
}

pub struct WsConnector {
    ws_base: String,
}

impl WsConnector {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let base = normalize_server_url(server_url)?;
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(ClientError::InvalidBaseUrl {
                address: server_url.to_string(),
                reason: "server_url must start with http:// or https://".into(),
            });
        };
        Ok(Self { ws_base })
    }

    pub fn session_url(&self, rover_id: RoverId) -> String {
        format!("{}{}", self.ws_base, RoverPath(rover_id).live_session())
    }
}

#[async_trait]
impl SessionConnector for WsConnector {
    async fn connect(&self, rover_id: RoverId) -> Result<LiveLink> {
        let ws_url = self.session_url(rover_id);
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        info!(rover_id = rover_id.0, %ws_url, "live session connected");
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                debug!(rover_id = rover_id.0, frame = %text, "live session send");
                if let Err(err) = ws_writer.send(Message::Text(text)).await {
                    warn!(rover_id = rover_id.0, %err, "live session send failed");
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let reader_task = tokio::spawn(async move {
            let reason = loop {
                match ws_reader.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if inbound_tx.send(LinkSignal::Event(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|frame| frame.reason.to_string())
                            .filter(|reason| !reason.is_empty());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => break Some(err.to_string()),
                    None => break None,
                }
            };
            debug!(rover_id = rover_id.0, ?reason, "live session reader finished");
            let _ = inbound_tx.send(LinkSignal::Closed { reason });
        });

        Ok(LiveLink {
            outbound,
            inbound,
            reader_task: Some(reader_task),
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
