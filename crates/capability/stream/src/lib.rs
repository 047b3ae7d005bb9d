//! 事件流接入能力。
//!
//! 维护一条到事件推送服务的 WebSocket 长连接：连上后发送一条
//! 订阅声明，之后把收到的每条报文原样推入交接队列。连接或读取
//! 失败时按固定间隔无限重连，直到停机信号到来。

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("connect error: {0}")]
    Connect(String),
    #[error("subscribe error: {0}")]
    Subscribe(String),
}

/// 连接建立后发送的订阅声明。
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeAction {
    pub service: String,
    pub action: String,
    pub characters: Vec<String>,
    pub worlds: Vec<String>,
    #[serde(rename = "eventNames")]
    pub event_names: Vec<String>,
}

impl SubscribeAction {
    /// 订阅所有角色的登录/登出事件。
    pub fn player_log_events() -> Self {
        Self {
            service: "event".to_string(),
            action: "subscribe".to_string(),
            characters: vec!["all".to_string()],
            worlds: Vec::new(),
            event_names: vec!["PlayerLogin".to_string(), "PlayerLogout".to_string()],
        }
    }
}

/// 流客户端配置。
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub websocket_url: String,
    pub reconnect_interval_seconds: u64,
}

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 事件流客户端。
pub struct StreamClient {
    config: StreamConfig,
    subscribe: SubscribeAction,
}

impl StreamClient {
    pub fn new(config: StreamConfig, subscribe: SubscribeAction) -> Self {
        Self { config, subscribe }
    }

    /// 打开连接并发送订阅声明。
    async fn connect_and_subscribe(&self) -> Result<WsConnection, StreamError> {
        let (mut ws, _) = connect_async(self.config.websocket_url.as_str())
            .await
            .map_err(|err| StreamError::Connect(err.to_string()))?;

        let declaration = serde_json::to_string(&self.subscribe)
            .map_err(|err| StreamError::Subscribe(err.to_string()))?;
        ws.send(Message::Text(declaration))
            .await
            .map_err(|err| StreamError::Subscribe(err.to_string()))?;
        Ok(ws)
    }

    /// 读取循环。收到的报文逐条推入 `queue`；队列满时读取阻塞，
    /// 这是刻意的流控。仅在停机信号或队列关闭时返回。
    pub async fn run(
        &self,
        queue: mpsc::Sender<Vec<u8>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StreamError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let mut ws = match self.connect_and_subscribe().await {
                Ok(ws) => {
                    info!(
                        target: "tracker.stream",
                        url = %self.config.websocket_url,
                        "stream connected and subscribed"
                    );
                    ws
                }
                Err(err) => {
                    warn!(target: "tracker.stream", error = %err, "stream connect failed");
                    if self.wait_for_retry(&mut shutdown).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return Ok(());
                        }
                    }
                    next = ws.next() => {
                        match next {
                            Some(Ok(Message::Text(text))) => {
                                if queue.send(text.into_bytes()).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Some(Ok(Message::Binary(bytes))) => {
                                if queue.send(bytes).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                if let Err(err) = ws.send(Message::Pong(payload)).await {
                                    warn!(target: "tracker.stream", error = %err, "pong failed");
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                warn!(target: "tracker.stream", frame = ?frame, "stream closed by peer");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(target: "tracker.stream", error = %err, "stream read failed");
                                break;
                            }
                            None => {
                                warn!(target: "tracker.stream", "stream ended");
                                break;
                            }
                        }
                    }
                }
            }

            if self.wait_for_retry(&mut shutdown).await {
                return Ok(());
            }
        }
    }

    /// 固定间隔等待重连；返回 true 表示等待期间收到停机信号。
    async fn wait_for_retry(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let interval = Duration::from_secs(self.config.reconnect_interval_seconds);
        tokio::select! {
            _ = sleep(interval) => false,
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SubscribeAction;

    #[test]
    fn subscribe_declaration_wire_format() {
        let action = SubscribeAction::player_log_events();
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(json["service"], "event");
        assert_eq!(json["action"], "subscribe");
        assert_eq!(json["characters"][0], "all");
        assert_eq!(json["eventNames"][0], "PlayerLogin");
        assert_eq!(json["eventNames"][1], "PlayerLogout");
        assert!(json["worlds"].as_array().expect("worlds").is_empty());
    }
}
