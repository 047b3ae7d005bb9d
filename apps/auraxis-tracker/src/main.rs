//! 管线守护进程入口：配置加载、存储装配、各级任务启动、
//! 致命错误监督与 /metrics 服务。

mod metrics;

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info};

use domain::PlayerEvent;
use tracker_census::{CensusClient, CharacterResolver};
use tracker_config::AppConfig;
use tracker_consume::{EventDispatcher, OnlineTracker, OutfitBatcher};
use tracker_storage::{
    MetricsStore, OnlineStore, PgMetricsStore, PgOnlineStore, PgRosterStore, RosterStore,
    connect_pool,
};
use tracker_stream::{StreamClient, StreamConfig, SubscribeAction};
use tracker_telemetry::{init_tracing, new_request_id};

#[derive(Clone)]
struct AppState {
    metrics_store: Arc<dyn MetricsStore>,
}

/// 某一级管线的致命失败。
struct StageFailure {
    stage: &'static str,
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // Postgres 连接池与三类存储（需先建表，见 storage::postgres 模块文档）
    let pool = connect_pool(&config.database_url).await?;
    let online_store: Arc<dyn OnlineStore> = Arc::new(PgOnlineStore::new(pool.clone()));
    let roster_store: Arc<dyn RosterStore> = Arc::new(PgRosterStore::new(pool.clone()));
    let metrics_store: Arc<dyn MetricsStore> = Arc::new(PgMetricsStore::new(pool));

    // Census API 客户端
    let resolver: Arc<dyn CharacterResolver> =
        Arc::new(CensusClient::new(config.census_url.clone()));

    // 各级之间的交接队列与停机信号
    let (raw_tx, raw_rx) = mpsc::channel::<Vec<u8>>(config.raw_queue_capacity);
    let (tracker_tx, tracker_rx) = mpsc::channel::<PlayerEvent>(config.event_queue_capacity);
    let (batcher_tx, batcher_rx) = mpsc::channel::<PlayerEvent>(config.event_queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (fatal_tx, mut fatal_rx) = mpsc::channel::<StageFailure>(4);

    // 1. 流客户端：连接、订阅、读取，失败按固定间隔重连
    let stream_client = StreamClient::new(
        StreamConfig {
            websocket_url: config.websocket_url.clone(),
            reconnect_interval_seconds: config.reconnect_interval_seconds,
        },
        SubscribeAction::player_log_events(),
    );
    let stream_shutdown = shutdown_rx.clone();
    let stream_task = spawn_stage("stream", fatal_tx.clone(), async move {
        stream_client.run(raw_tx, stream_shutdown).await
    });

    // 2. 分发器：解码并扇出到两个消费者队列
    let dispatcher = EventDispatcher::new(tracker_tx, batcher_tx);
    let dispatch_task = spawn_stage("dispatch", fatal_tx.clone(), dispatcher.run(raw_rx));

    // 3. 在线追踪器：清空名单后顺序消费登录/登出
    let tracker = OnlineTracker::new(online_store);
    let tracker_task = spawn_stage("tracker", fatal_tx.clone(), tracker.run(tracker_rx));

    // 4. 军团批处理器：攒批查询 Census 并回写缓存
    let batcher = OutfitBatcher::new(
        roster_store,
        resolver,
        config.batch_size,
        config.freshness_window_ms,
    );
    let batcher_task = spawn_stage("batcher", fatal_tx.clone(), batcher.run(batcher_rx));

    // 5. /metrics 服务
    let state = AppState { metrics_store };
    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.metrics_addr).await?;
    info!(addr = %config.metrics_addr, "metrics endpoint listening");
    let mut server_shutdown = shutdown_rx.clone();
    let server_task = spawn_stage("metrics-server", fatal_tx.clone(), async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    // 监督循环：任一级报告致命错误则整体停止并以非零退出；
    // 收到停机信号则停止进流，让队列排空后正常退出
    tokio::select! {
        failure = fatal_rx.recv() => {
            if let Some(failure) = failure {
                error!(
                    stage = failure.stage,
                    error = %failure.message,
                    "fatal stage failure, stopping pipeline"
                );
                let _ = shutdown_tx.send(true);
                return Err(format!("{} stage failed: {}", failure.stage, failure.message).into());
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, draining pipeline");
            let _ = shutdown_tx.send(true);
        }
    }

    // 等待进流停止、队列排空、在途批次写完
    let _ = stream_task.await;
    let _ = dispatch_task.await;
    let _ = tracker_task.await;
    let _ = batcher_task.await;
    let _ = server_task.await;
    Ok(())
}

/// 包装一级管线任务：失败时带阶段名上报到致命错误通道。
fn spawn_stage<F, E>(
    stage: &'static str,
    fatal: mpsc::Sender<StageFailure>,
    task: F,
) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = task.await {
            let _ = fatal
                .send(StageFailure {
                    stage,
                    message: err.to_string(),
                })
                .await;
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "ok": true }))
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id，注入请求扩展与日志
    let request_id = new_request_id();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
