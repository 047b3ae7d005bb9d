//! 聚合查询的行结构。

/// 按军团统计的在线人数行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutfitOnlineRow {
    pub online: i64,
    pub alias: String,
    pub name: String,
    pub faction: String,
    pub world: String,
}

/// 按阵营/服务器统计的在线人数行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionOnlineRow {
    pub online: i64,
    pub faction: String,
    pub world: String,
}
