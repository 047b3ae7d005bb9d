//! 在线状态追踪器。
//!
//! 启动时清空在线名单（上一个进程留下的状态视为不可恢复），
//! 之后按到达顺序逐条应用登录/登出。存储失败对整条管线致命。

use crate::ConsumeError;
use domain::{EventKind, PlayerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracker_storage::OnlineStore;
use tracker_telemetry::{record_login, record_logout};
use tracing::info;

pub struct OnlineTracker {
    online: Arc<dyn OnlineStore>,
}

impl OnlineTracker {
    pub fn new(online: Arc<dyn OnlineStore>) -> Self {
        Self { online }
    }

    /// 应用单条事件。登录/登出都是幂等操作。
    pub async fn apply(&self, event: &PlayerEvent) -> Result<(), ConsumeError> {
        match event.kind {
            EventKind::Login => {
                self.online.online_add(event.character_id).await?;
                record_login();
            }
            EventKind::Logout => {
                self.online.online_remove(event.character_id).await?;
                record_logout();
            }
            EventKind::Other => {}
        }
        Ok(())
    }

    /// 追踪循环。事件队列关闭时结束。
    pub async fn run(self, mut events: mpsc::Receiver<PlayerEvent>) -> Result<(), ConsumeError> {
        self.online.clear_online_set().await?;
        info!(target: "tracker.online", "online set cleared, tracking starts fresh");

        while let Some(event) = events.recv().await {
            self.apply(&event).await?;
        }
        info!(target: "tracker.online", "event queue closed, tracker stopping");
        Ok(())
    }
}
