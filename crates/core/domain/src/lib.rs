pub mod event;
pub mod roster;

pub use event::{EventKind, PlayerEvent};
pub use roster::{CharacterRecord, OutfitCacheEntry, OutfitRecord};

/// 角色标识。0 表示"缺失/未解析"，不是合法主键。
pub type CharacterId = i64;

/// 军团标识。0 表示角色未加入任何军团。
pub type OutfitId = i64;
