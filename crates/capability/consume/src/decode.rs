//! 推送流报文解码。
//!
//! 数值字段在线上以字符串携带，解码时归一为 i64。两类失败要
//! 区分开：信封整体不是合法 JSON（Envelope），与信封合法但数值
//! 字段解析不了（Numeric）。

use domain::{EventKind, PlayerEvent};
use serde::Deserialize;

/// 解码错误。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(String),
    #[error("unparsable numeric field {field}: {value:?}")]
    Numeric { field: &'static str, value: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    payload: Option<RawPayload>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    character_id: String,
    #[serde(default)]
    event_name: String,
    #[serde(default)]
    world_id: String,
    #[serde(default)]
    timestamp: String,
}

/// 尝试把一条原始报文解码为登录/登出事件。
///
/// 推送流上混有心跳、订阅回显等不带 payload 的信封，它们不是
/// 错误，返回 `Ok(None)`。
pub fn decode_event(raw: &[u8]) -> Result<Option<PlayerEvent>, DecodeError> {
    let envelope: RawEnvelope =
        serde_json::from_slice(raw).map_err(|err| DecodeError::Envelope(err.to_string()))?;
    let Some(payload) = envelope.payload else {
        return Ok(None);
    };

    let character_id = parse_numeric("character_id", &payload.character_id)?;
    let world_id = parse_numeric("world_id", &payload.world_id)?;

    Ok(Some(PlayerEvent {
        character_id,
        kind: EventKind::from_name(&payload.event_name),
        world_id,
        timestamp: payload.timestamp,
    }))
}

fn parse_numeric(field: &'static str, value: &str) -> Result<i64, DecodeError> {
    value.parse::<i64>().map_err(|_| DecodeError::Numeric {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_login_event() {
        let raw = br#"{"payload":{"character_id":"5428010","event_name":"PlayerLogin","world_id":"1","timestamp":"1610000000"}}"#;
        let event = decode_event(raw).expect("decode").expect("event");
        assert_eq!(event.character_id, 5428010);
        assert_eq!(event.kind, EventKind::Login);
        assert_eq!(event.world_id, 1);
        assert_eq!(event.timestamp, "1610000000");
    }

    #[test]
    fn decodes_logout_event() {
        let raw = br#"{"payload":{"character_id":"5428010","event_name":"PlayerLogout","world_id":"1","timestamp":"1610000600"}}"#;
        let event = decode_event(raw).expect("decode").expect("event");
        assert_eq!(event.kind, EventKind::Logout);
    }

    #[test]
    fn envelope_without_payload_is_not_an_event() {
        let heartbeat = br#"{"service":"event","type":"heartbeat","online":{"1":"true"}}"#;
        assert!(decode_event(heartbeat).expect("decode").is_none());

        let echo = br#"{"subscription":{"eventNames":["PlayerLogin"]}}"#;
        assert!(decode_event(echo).expect("decode").is_none());
    }

    #[test]
    fn blank_character_id_is_numeric_error() {
        let raw = br#"{"payload":{"character_id":"","event_name":"PlayerLogin","world_id":"1","timestamp":"1"}}"#;
        match decode_event(raw) {
            Err(DecodeError::Numeric { field, .. }) => assert_eq!(field, "character_id"),
            other => panic!("expected numeric error, got {:?}", other),
        }
    }

    #[test]
    fn unparsable_world_id_is_numeric_error() {
        let raw = br#"{"payload":{"character_id":"7","event_name":"PlayerLogin","world_id":"soltech","timestamp":"1"}}"#;
        match decode_event(raw) {
            Err(DecodeError::Numeric { field, .. }) => assert_eq!(field, "world_id"),
            other => panic!("expected numeric error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json_is_envelope_error() {
        let raw = b"not json at all";
        assert!(matches!(
            decode_event(raw),
            Err(DecodeError::Envelope(_))
        ));
    }

    #[test]
    fn unknown_event_name_maps_to_other() {
        let raw = br#"{"payload":{"character_id":"7","event_name":"GainExperience","world_id":"1","timestamp":"1"}}"#;
        let event = decode_event(raw).expect("decode").expect("event");
        assert_eq!(event.kind, EventKind::Other);
    }
}
