//! Discord Bot channel — REST API + Gateway WebSocket.
//!
//! Uses the REST API for sending messages and reactions, and the Gateway
//! for real-time MESSAGE_CREATE events feeding the command responder.

use async_trait::async_trait;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Channel;
use chimeclaw_core::types::{IncomingMessage, OutgoingMessage, ThreadType};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Gateway intents bitmask.
    #[serde(default = "default_intents")]
    pub intents: u64,
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
    (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15)
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            intents: default_intents(),
        }
    }
}

/// Discord Bot channel.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
    connected: bool,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(auth) = format!("Bot {}", config.bot_token).parse() {
            headers.insert("Authorization", auth);
        }
        if let Ok(ua) = "ChimeClaw/0.1".parse() {
            headers.insert("User-Agent", ua);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            connected: false,
        }
    }

    /// Send a message to a channel.
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let url = format!("https://discord.com/api/v10/channels/{channel_id}/messages");
        let body = serde_json::json!({ "content": content });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("Discord send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChimeClawError::Delivery(format!("Discord {status}: {text}")));
        }
        Ok(())
    }

    /// React to a message with a unicode emoji.
    pub async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<()> {
        let url = reaction_url(channel_id, message_id, emoji);
        let response = self
            .client
            .put(&url)
            .send()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("Discord reaction failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChimeClawError::Delivery(format!("Discord {status}: {text}")));
        }
        Ok(())
    }

    /// Get current bot info.
    pub async fn get_me(&self) -> Result<DiscordUser> {
        let response = self
            .client
            .get("https://discord.com/api/v10/users/@me")
            .send()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("getMe failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChimeClawError::Delivery(format!("Discord {status}: {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("Invalid getMe response: {e}")))
    }

    /// Get Gateway WebSocket URL.
    pub async fn get_gateway_url(&self) -> Result<String> {
        let response = self
            .client
            .get("https://discord.com/api/v10/gateway/bot")
            .send()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("Gateway request failed: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChimeClawError::Delivery(format!("Invalid gateway response: {e}")))?;

        body["url"]
            .as_str()
            .map(|s| format!("{s}/?v=10&encoding=json"))
            .ok_or_else(|| ChimeClawError::Delivery("No gateway URL".into()))
    }

    /// Start Gateway WebSocket connection — returns a stream of IncomingMessages.
    /// Auto-reconnects on disconnect with exponential backoff.
    pub fn start_gateway(self) -> DiscordGatewayStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let channel = self;
            let mut backoff_secs: u64 = 5;

            loop {
                tracing::info!("Discord Gateway connecting...");

                let gateway_url = match channel.get_gateway_url().await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::error!(
                            "Failed to get gateway URL: {e}, retrying in {backoff_secs}s..."
                        );
                        tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let ws = match tokio_tungstenite::connect_async(&gateway_url).await {
                    Ok((ws, _)) => ws,
                    Err(e) => {
                        tracing::error!(
                            "Gateway WebSocket failed: {e}, retrying in {backoff_secs}s..."
                        );
                        tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                backoff_secs = 5;
                tracing::info!("Discord Gateway connected");

                if !channel.run_connection(ws, &tx).await {
                    tracing::info!("Discord stream closed (receiver dropped)");
                    return;
                }

                tracing::info!("Discord Gateway disconnected, reconnecting in {backoff_secs}s...");
                tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        });

        DiscordGatewayStream { rx }
    }

    /// Drive one gateway connection until it drops. Returns `false` when
    /// the stream receiver is gone and the whole task should exit.
    ///
    /// Invariant: the heartbeat `Interval` lives outside the read arm of
    /// the select, so its deadline survives loop iterations and inbound
    /// traffic can never starve the op-1 cadence Discord requires. A
    /// dropped `sleep` future here would reset on every message and a
    /// busy guild would get the socket zombied.
    async fn run_connection(
        &self,
        mut ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        tx: &tokio::sync::mpsc::UnboundedSender<IncomingMessage>,
    ) -> bool {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message as WsMsg;

        let mut session = GatewaySession::default();
        // Replaced with the server's cadence once Hello arrives.
        let mut heartbeat = heartbeat_timer(DEFAULT_HEARTBEAT_MS);

        loop {
            tokio::select! {
                msg = ws.next() => {
                    let payload: serde_json::Value = match msg {
                        Some(Ok(WsMsg::Text(text))) => match serde_json::from_str(&text) {
                            Ok(v) => v,
                            Err(_) => continue,
                        },
                        Some(Ok(WsMsg::Close(_))) => {
                            tracing::warn!("Discord Gateway closed by server");
                            return true;
                        }
                        Some(Err(e)) => {
                            tracing::error!("Gateway error: {e}");
                            return true;
                        }
                        None => return true,
                        _ => continue,
                    };

                    match session.step(&payload) {
                        GatewayStep::Hello { heartbeat_ms, identify } => {
                            tracing::debug!("Gateway Hello: heartbeat={heartbeat_ms}ms");
                            heartbeat = heartbeat_timer(heartbeat_ms);
                            if identify {
                                let payload = self.identify_payload();
                                let _ = ws.send(WsMsg::Text(payload.to_string())).await;
                            }
                        }
                        GatewayStep::Deliver(msg) => {
                            if tx.send(msg).is_err() {
                                return false;
                            }
                        }
                        GatewayStep::Reconnect => {
                            tracing::warn!("Gateway requesting reconnect");
                            return true;
                        }
                        GatewayStep::Continue => {}
                    }
                }
                _ = heartbeat.tick() => {
                    if ws.send(WsMsg::Text(session.heartbeat().to_string())).await.is_err() {
                        tracing::error!("Heartbeat send failed");
                        return true;
                    }
                    tracing::trace!("Heartbeat sent (seq={:?})", session.seq);
                }
            }
        }
    }

    fn identify_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "op": 2,
            "d": {
                "token": self.config.bot_token,
                "intents": self.config.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "chimeclaw",
                    "device": "chimeclaw"
                }
            }
        })
    }
}

/// Heartbeat cadence assumed until the server's Hello says otherwise.
const DEFAULT_HEARTBEAT_MS: u64 = 41_250;

/// Interval whose first tick lands one full period from now.
fn heartbeat_timer(period_ms: u64) -> tokio::time::Interval {
    let period = std::time::Duration::from_millis(period_ms);
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    timer
}

/// Per-connection gateway state: the last sequence number and whether
/// this socket has identified.
#[derive(Debug, Default)]
struct GatewaySession {
    seq: Option<u64>,
    identified: bool,
}

/// What the connection loop does with one decoded gateway payload.
#[derive(Debug)]
enum GatewayStep {
    /// Hello arrived: restart the heartbeat timer at this cadence,
    /// identifying first when the socket has not identified yet.
    Hello { heartbeat_ms: u64, identify: bool },
    /// A user message for the outgoing stream.
    Deliver(IncomingMessage),
    /// Server asked us to drop the socket and reconnect.
    Reconnect,
    /// Bookkeeping only; nothing for the caller to do.
    Continue,
}

impl GatewaySession {
    /// Apply one gateway payload. Pure bookkeeping; the caller owns the
    /// socket and the heartbeat timer.
    fn step(&mut self, payload: &serde_json::Value) -> GatewayStep {
        if let Some(s) = payload["s"].as_u64() {
            self.seq = Some(s);
        }

        match payload["op"].as_u64().unwrap_or(0) {
            10 => {
                let heartbeat_ms = payload["d"]["heartbeat_interval"]
                    .as_u64()
                    .unwrap_or(DEFAULT_HEARTBEAT_MS);
                let identify = !self.identified;
                self.identified = true;
                GatewayStep::Hello {
                    heartbeat_ms,
                    identify,
                }
            }
            11 => {
                tracing::trace!("Heartbeat ACK");
                GatewayStep::Continue
            }
            0 => match payload["t"].as_str().unwrap_or("") {
                "READY" => {
                    let user = payload["d"]["user"]["username"].as_str().unwrap_or("unknown");
                    tracing::info!("✅ Discord Gateway READY as {user}");
                    GatewayStep::Continue
                }
                "MESSAGE_CREATE" => match parse_message_create(&payload["d"]) {
                    Some(msg) => GatewayStep::Deliver(msg),
                    None => GatewayStep::Continue,
                },
                other => {
                    tracing::trace!("Ignoring event: {other}");
                    GatewayStep::Continue
                }
            },
            7 => GatewayStep::Reconnect,
            9 => {
                tracing::warn!("Invalid session, re-identifying");
                self.identified = false;
                GatewayStep::Continue
            }
            _ => GatewayStep::Continue,
        }
    }

    /// The op-1 heartbeat payload carrying the last seen sequence.
    fn heartbeat(&self) -> serde_json::Value {
        serde_json::json!({ "op": 1, "d": self.seq })
    }
}

/// Convert a Gateway MESSAGE_CREATE payload into an IncomingMessage.
/// Bot-authored messages are dropped so the bot never answers itself.
pub fn parse_message_create(d: &serde_json::Value) -> Option<IncomingMessage> {
    if d["author"]["bot"].as_bool().unwrap_or(false) {
        return None;
    }

    Some(IncomingMessage {
        channel: "discord".into(),
        thread_id: d["channel_id"].as_str().unwrap_or("").into(),
        message_id: d["id"].as_str().unwrap_or("").into(),
        sender_id: d["author"]["id"].as_str().unwrap_or("").into(),
        sender_name: d["author"]["username"].as_str().map(String::from),
        content: d["content"].as_str().unwrap_or("").into(),
        thread_type: if d["guild_id"].is_null() {
            ThreadType::Direct
        } else {
            ThreadType::Group
        },
        timestamp: chrono::Utc::now(),
    })
}

fn reaction_url(channel_id: &str, message_id: &str, emoji: &str) -> String {
    format!(
        "https://discord.com/api/v10/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
        urlencoding::encode(emoji)
    )
}

/// Stream of incoming Discord messages from Gateway.
pub struct DiscordGatewayStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for DiscordGatewayStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for DiscordGatewayStream {}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn connect(&mut self) -> Result<()> {
        let me = self.get_me().await?;
        tracing::info!("✅ Discord bot: {} ({})", me.username, me.id);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(&message.thread_id, &message.content).await
    }
}

// --- Discord API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub bot: Option<bool>,
}
