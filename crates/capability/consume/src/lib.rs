//! 事件消费能力。
//!
//! 管线的核心三级：
//! - `dispatch`：从原始报文队列解码事件并扇出到两个消费者队列
//! - `tracker`：顺序消费事件，维护在线名单
//! - `batcher`：去重、查缓存、攒批，按阈值发起一次 Census 查询并回写

pub mod batcher;
pub mod decode;
pub mod dispatch;
pub mod tracker;

pub use batcher::OutfitBatcher;
pub use decode::{DecodeError, decode_event};
pub use dispatch::EventDispatcher;
pub use tracker::OnlineTracker;

use tracker_census::CensusError;
use tracker_storage::StorageError;

/// 消费阶段错误。到达这里的错误都是致命的：存储写入失败，
/// 或无法按连接重置处理的查询失败。
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("enrichment error: {0}")]
    Enrichment(#[from] CensusError),
}
