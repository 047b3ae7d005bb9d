//! /metrics 端点：抓取时同步执行两条聚合查询，渲染为
//! 文本展示格式，末尾附上管线计数器。

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracker_storage::{FactionOnlineRow, OutfitOnlineRow, StorageError};
use tracker_telemetry::{MetricsSnapshot, metrics};
use tracing::error;

use crate::AppState;

pub async fn get_metrics(State(state): State<AppState>) -> Response {
    let outfit_rows = match state.metrics_store.outfit_online_counts().await {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };
    let faction_rows = match state.metrics_store.faction_online_counts().await {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };

    let body = render_exposition(&outfit_rows, &faction_rows, &metrics().snapshot());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

fn internal_error(err: StorageError) -> Response {
    error!(target: "tracker.metrics", error = %err, "metrics query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
}

fn render_exposition(
    outfit_rows: &[OutfitOnlineRow],
    faction_rows: &[FactionOnlineRow],
    snapshot: &MetricsSnapshot,
) -> String {
    let mut out = String::new();

    out.push_str("# HELP outfit_members_online Number of members currently online from an outfit.\n");
    out.push_str("# TYPE outfit_members_online gauge\n");
    for row in outfit_rows {
        out.push_str(&format!(
            "outfit_members_online{{alias=\"{}\",name=\"{}\",faction=\"{}\",server=\"{}\"}} {}\n",
            row.alias, row.name, row.faction, row.world, row.online
        ));
    }

    out.push_str("# HELP online_players Number of players online.\n");
    out.push_str("# TYPE online_players gauge\n");
    for row in faction_rows {
        out.push_str(&format!(
            "online_players{{faction=\"{}\",server=\"{}\"}} {}\n",
            row.faction, row.world, row.online
        ));
    }

    push_counter(
        &mut out,
        "tracker_events_received_total",
        "Raw feed payloads received.",
        snapshot.events_received,
    );
    push_counter(
        &mut out,
        "tracker_events_decoded_total",
        "Payloads decoded into player events.",
        snapshot.events_decoded,
    );
    push_counter(
        &mut out,
        "tracker_decode_failures_total",
        "Payloads skipped because decoding failed.",
        snapshot.decode_failures,
    );
    push_counter(
        &mut out,
        "tracker_events_discarded_total",
        "Decoded events discarded as non-player.",
        snapshot.events_discarded,
    );
    push_counter(
        &mut out,
        "tracker_logins_total",
        "Login events applied to the online set.",
        snapshot.logins,
    );
    push_counter(
        &mut out,
        "tracker_logouts_total",
        "Logout events applied to the online set.",
        snapshot.logouts,
    );
    push_counter(
        &mut out,
        "tracker_cache_hits_total",
        "Characters skipped because the outfit cache was fresh.",
        snapshot.cache_hits,
    );
    push_counter(
        &mut out,
        "tracker_duplicates_skipped_total",
        "Characters skipped as duplicates within a batch.",
        snapshot.duplicates_skipped,
    );
    push_counter(
        &mut out,
        "tracker_batch_lookups_total",
        "Enrichment API calls issued.",
        snapshot.batch_lookups,
    );
    push_counter(
        &mut out,
        "tracker_characters_resolved_total",
        "Character records returned by the enrichment API.",
        snapshot.characters_resolved,
    );
    push_counter(
        &mut out,
        "tracker_batches_discarded_total",
        "Batches dropped after a connection reset.",
        snapshot.batches_discarded,
    );
    out
}

fn push_counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {} {}\n", name, help));
    out.push_str(&format!("# TYPE {} counter\n", name));
    out.push_str(&format!("{} {}\n", name, value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tracker_storage::{InMemoryTrackerStore, OnlineStore, RosterStore};

    #[test]
    fn exposition_shapes_gauge_lines() {
        let outfit_rows = vec![OutfitOnlineRow {
            online: 12,
            alias: "UNIT".to_string(),
            name: "First Unit".to_string(),
            faction: "VS".to_string(),
            world: "Connery".to_string(),
        }];
        let faction_rows = vec![FactionOnlineRow {
            online: 345,
            faction: "VS".to_string(),
            world: "Connery".to_string(),
        }];

        let body = render_exposition(&outfit_rows, &faction_rows, &MetricsSnapshot::default());
        assert!(body.contains(
            "outfit_members_online{alias=\"UNIT\",name=\"First Unit\",faction=\"VS\",server=\"Connery\"} 12\n"
        ));
        assert!(body.contains("online_players{faction=\"VS\",server=\"Connery\"} 345\n"));
        assert!(body.contains("# TYPE outfit_members_online gauge\n"));
        assert!(body.contains("# TYPE online_players gauge\n"));
        assert!(body.contains("tracker_events_received_total 0\n"));
    }

    #[tokio::test]
    async fn handler_renders_seeded_store() {
        let store = Arc::new(InMemoryTrackerStore::new());
        store.seed_faction(1, "VS");
        store.seed_world(1, "Connery");
        store.upsert_character(7, "Alpha", 1, 1).await.expect("character");
        store.online_add(7).await.expect("online");

        let state = AppState {
            metrics_store: store,
        };
        let response = get_metrics(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(body.contains("online_players{faction=\"VS\",server=\"Connery\"} 1\n"));
    }
}
