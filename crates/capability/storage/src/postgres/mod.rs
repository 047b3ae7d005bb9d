//! # PostgreSQL 存储实现模块
//!
//! 本模块提供所有存储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定，防止 SQL 注入
//! 2. **幂等写入**：所有 upsert 使用 `on conflict` 子句，重复执行安全
//! 3. **连接池管理**：各实现共用同一个连接池（最大 8 连接）
//!
//! ## 数据库模式要求
//!
//! 本模块依赖以下数据库表：
//!
//! ### 管线写入的表
//! - `online_players`：在线名单（character_id bigint primary key）
//! - `character_names`：角色身份缓存（id bigint primary key, name text,
//!   faction_id int, world_id int）
//! - `outfit_names`：军团身份缓存（id bigint primary key, alias text,
//!   name text, faction_id int, world_id int）
//! - `character_outfit`：角色到军团映射缓存（character_id bigint primary
//!   key, outfit_id bigint, updated_at_ms bigint）
//!
//! ### 静态查找表（部署时灌入，/metrics 聚合使用）
//! - `faction_names`：阵营标签（id int primary key, tag text）
//! - `world_names`：服务器名称（id int primary key, name text）
//!
//! ## 错误处理
//!
//! 所有存储操作返回 `Result<T, StorageError>`；`sqlx::Error` 自动转换。

pub mod metrics;
pub mod online;
pub mod roster;

pub use metrics::*;
pub use online::*;
pub use roster::*;
