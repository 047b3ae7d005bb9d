//! # Tracker Storage 模块
//!
//! 本模块提供统一的数据存储抽象层，支持多种存储后端实现。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：按关注点拆分的异步 Trait 接口
//!    - `OnlineStore`：在线名单（清空/上线/下线）
//!    - `RosterStore`：角色、军团与成员关系缓存（幂等 upsert）
//!    - `MetricsStore`：/metrics 端点的两条聚合查询
//! 2. **数据模型层** (`models.rs`)：聚合查询的行结构
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 5. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 设计约束
//!
//! - 所有 upsert 均为 `insert ... on conflict`，重复执行安全
//! - 新鲜度判断不在存储层做：`lookup_outfit_cache` 原样返回
//!   updated_at_ms，由批处理器对比时钟，保证两种后端行为一致
//! - 时间戳统一为 Unix 毫秒（i64）
//!
//! ## 未来扩展
//!
//! - **负缓存**：Census 始终不返回的角色（隐私受限）目前每次重新
//!   出现都会再次进入批量查询；如需抑制可在 character_outfit 之外
//!   增加一张带 TTL 的未命中表

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::InMemoryTrackerStore;
pub use postgres::{PgMetricsStore, PgOnlineStore, PgRosterStore};
