//! Census API 查询能力。
//!
//! 将一批角色 id 翻译成一次 HTTP 查询，返回带军团信息的角色记录。
//! 响应按条宽松解析：单条角色或军团子记录不完整时丢弃该条，
//! 不影响同一响应中的其余记录。

use async_trait::async_trait;
use domain::{CharacterId, CharacterRecord, OutfitRecord};
use serde_json::Value;
use tracing::warn;

/// 查询错误。
#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("request error: {0}")]
    Request(String),
    #[error("unexpected http status: {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CensusError {
    /// 是否属于连接被重置一类的传输错误。批处理器对这类错误
    /// 丢弃当前批次继续运行，其余错误一律上报为致命。
    pub fn is_connection_reset(&self) -> bool {
        match self {
            CensusError::Request(message) => {
                message.to_ascii_lowercase().contains("connection reset")
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CensusError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest 的 Display 不含底层 io 错误，拼接整条因果链
        // 以便连接重置的判定能看到末端错误文本
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message = format!("{}: {}", message, cause);
            source = cause.source();
        }
        CensusError::Request(message)
    }
}

/// 角色批量解析器抽象。批处理器依赖该接口，测试中以假实现替换。
#[async_trait]
pub trait CharacterResolver: Send + Sync {
    async fn resolve_characters(
        &self,
        character_ids: &[CharacterId],
    ) -> Result<Vec<CharacterRecord>, CensusError>;
}

/// 查询时隐藏的角色字段，压缩响应体积。
const HIDE_FIELDS: &str = "battle_rank,certs,daily_ribbon,head_id,name.first_lower,\
times,prestige_level,profile_id,title_id";

/// 基于 reqwest 的 Census API 客户端。
#[derive(Clone)]
pub struct CensusClient {
    http: reqwest::Client,
    service_url: String,
}

impl CensusClient {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            service_url: service_url.into(),
        }
    }
}

#[async_trait]
impl CharacterResolver for CensusClient {
    async fn resolve_characters(
        &self,
        character_ids: &[CharacterId],
    ) -> Result<Vec<CharacterRecord>, CensusError> {
        let joined = character_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http
            .get(format!("{}/character", self.service_url))
            .query(&[
                ("character_id", joined.as_str()),
                ("c:resolve", "outfit,world"),
                ("c:hide", HIDE_FIELDS),
            ])
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() != 200 {
            return Err(CensusError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        Ok(parse_character_list(&body))
    }
}

/// 解析响应信封中的角色列表。列表缺失按空响应处理。
pub fn parse_character_list(body: &Value) -> Vec<CharacterRecord> {
    let Some(Value::Array(items)) = body.get("character_list") else {
        warn!(target: "tracker.census", "response missing character_list");
        return Vec::new();
    };
    items.iter().filter_map(parse_character).collect()
}

fn parse_character(value: &Value) -> Option<CharacterRecord> {
    let character_id = value.get("character_id").and_then(parse_i64)?;
    if character_id <= 0 {
        return None;
    }

    // 缺少世界标识的记录语义上不完整，丢弃而不是落库为 0
    let world_id = match value.get("world_id").and_then(parse_i64) {
        Some(world_id) if world_id > 0 => world_id,
        _ => {
            warn!(
                target: "tracker.census",
                character_id,
                "skipping character record missing world_id"
            );
            return None;
        }
    };

    let faction_id = value.get("faction_id").and_then(parse_i64).unwrap_or(0);
    let name = value
        .get("name")
        .and_then(|name| name.get("first"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let outfit = value
        .get("outfit")
        .and_then(|outfit| parse_outfit(outfit, faction_id, world_id));

    Some(CharacterRecord {
        character_id,
        name,
        faction_id,
        world_id,
        outfit,
    })
}

fn parse_outfit(value: &Value, faction_id: i64, world_id: i64) -> Option<OutfitRecord> {
    // 缺少团长标识的军团记录不完整，按无军团处理
    let leader_character_id = match value.get("leader_character_id").and_then(parse_i64) {
        Some(leader) if leader > 0 => leader,
        _ => {
            warn!(target: "tracker.census", "skipping malformed outfit record");
            return None;
        }
    };
    let outfit_id = value.get("outfit_id").and_then(parse_i64).filter(|id| *id > 0)?;

    Some(OutfitRecord {
        outfit_id,
        alias: value
            .get("alias")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        faction_id,
        world_id,
        leader_character_id,
        member_count: value.get("member_count").and_then(parse_i64).unwrap_or(0),
        created_at: value.get("time_created").and_then(parse_i64).unwrap_or(0),
    })
}

/// 数值字段在推送流与 Census 响应里均以字符串携带，偶尔也有
/// 原生数字，两种形态都接受。
fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_character_with_outfit() {
        let body = json!({
            "character_list": [{
                "character_id": "5428010618020694577",
                "faction_id": "1",
                "world_id": "13",
                "name": {"first": "Higby"},
                "outfit": {
                    "outfit_id": "37509488620604883",
                    "alias": "HIGB",
                    "name": "Higby's Heroes",
                    "leader_character_id": "5428010618020694577",
                    "member_count": "120",
                    "time_created": "1325394000"
                }
            }],
            "returned": 1
        });

        let records = parse_character_list(&body);
        assert_eq!(records.len(), 1);
        let character = &records[0];
        assert_eq!(character.character_id, 5428010618020694577);
        assert_eq!(character.name, "Higby");
        assert_eq!(character.faction_id, 1);
        assert_eq!(character.world_id, 13);
        let outfit = character.outfit.as_ref().expect("outfit");
        assert_eq!(outfit.outfit_id, 37509488620604883);
        assert_eq!(outfit.alias, "HIGB");
        assert_eq!(outfit.member_count, 120);
        // 军团子对象不带阵营/世界，取自所属角色
        assert_eq!(outfit.faction_id, 1);
        assert_eq!(outfit.world_id, 13);
    }

    #[test]
    fn drops_character_missing_world_id() {
        let body = json!({
            "character_list": [
                {"character_id": "1", "faction_id": "2", "name": {"first": "NoWorld"}},
                {"character_id": "2", "faction_id": "2", "world_id": "1",
                 "name": {"first": "HasWorld"}}
            ]
        });

        let records = parse_character_list(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].character_id, 2);
    }

    #[test]
    fn drops_outfit_missing_leader_but_keeps_character() {
        let body = json!({
            "character_list": [{
                "character_id": "3",
                "faction_id": "3",
                "world_id": "10",
                "name": {"first": "Lone"},
                "outfit": {"outfit_id": "77", "alias": "LONE", "name": "No Leader"}
            }]
        });

        let records = parse_character_list(&body);
        assert_eq!(records.len(), 1);
        assert!(records[0].outfit.is_none());
    }

    #[test]
    fn drops_character_with_blank_id() {
        let body = json!({
            "character_list": [{"character_id": "", "world_id": "1"}]
        });

        assert!(parse_character_list(&body).is_empty());
    }

    #[test]
    fn accepts_native_numbers() {
        let body = json!({
            "character_list": [{
                "character_id": 9,
                "faction_id": 1,
                "world_id": 17,
                "name": {"first": "Numeric"}
            }]
        });

        let records = parse_character_list(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].world_id, 17);
    }

    #[test]
    fn missing_character_list_is_empty() {
        let body = json!({"error": "service_unavailable"});
        assert!(parse_character_list(&body).is_empty());
    }

    #[test]
    fn connection_reset_classification() {
        let reset = CensusError::Request(
            "error sending request: Connection reset by peer (os error 104)".to_string(),
        );
        assert!(reset.is_connection_reset());

        let timeout = CensusError::Request("operation timed out".to_string());
        assert!(!timeout.is_connection_reset());
        assert!(!CensusError::Status(503).is_connection_reset());
    }
}
