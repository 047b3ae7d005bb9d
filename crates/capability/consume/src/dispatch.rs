//! 事件分发器。
//!
//! 从原始报文队列逐条解码，丢弃解码失败与非玩家事件，把有效
//! 事件转发到在线追踪与军团批处理两个队列。两个转发都必须发生，
//! 队列满时等待即是背压。

use crate::ConsumeError;
use crate::decode::decode_event;
use domain::PlayerEvent;
use tokio::sync::mpsc;
use tracker_telemetry::{
    record_decode_failure, record_event_decoded, record_event_discarded, record_event_received,
};
use tracing::{info, warn};

pub struct EventDispatcher {
    tracker_queue: mpsc::Sender<PlayerEvent>,
    batcher_queue: mpsc::Sender<PlayerEvent>,
}

impl EventDispatcher {
    pub fn new(
        tracker_queue: mpsc::Sender<PlayerEvent>,
        batcher_queue: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            tracker_queue,
            batcher_queue,
        }
    }

    /// 分发循环。原始队列关闭或任一下游队列关闭时结束。
    pub async fn run(self, mut raw: mpsc::Receiver<Vec<u8>>) -> Result<(), ConsumeError> {
        while let Some(payload) = raw.recv().await {
            record_event_received();
            let event = match decode_event(&payload) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(err) => {
                    // 推送流上大量非事件报文走到这里，跳过即可
                    record_decode_failure();
                    warn!(
                        target: "tracker.dispatch",
                        error = %err,
                        payload = %String::from_utf8_lossy(&payload),
                        "event decode failed"
                    );
                    continue;
                }
            };

            if event.character_id == 0 {
                record_event_discarded();
                continue;
            }
            record_event_decoded();

            if self.tracker_queue.send(event.clone()).await.is_err() {
                info!(target: "tracker.dispatch", "tracker queue closed, dispatcher stopping");
                return Ok(());
            }
            if self.batcher_queue.send(event).await.is_err() {
                info!(target: "tracker.dispatch", "batcher queue closed, dispatcher stopping");
                return Ok(());
            }
        }
        info!(target: "tracker.dispatch", "raw queue closed, dispatcher stopping");
        Ok(())
    }
}
