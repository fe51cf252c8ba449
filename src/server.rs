// 该文件是 Tianma （天马） 项目的一部分。
// src/server.rs - HTTP 推理服务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::net::SocketAddr;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::model::Detector;

mod error;
mod handler;
mod state;

pub use self::error::ServiceError;
pub use self::handler::{HealthStatus, content_disposition, health, home, predict};
pub use self::state::AppState;

/// 单个请求体上限 10 MiB
pub const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

pub fn router<M: Detector>(state: AppState<M>) -> Router {
  Router::new()
    .route("/", get(home))
    .route("/health", get(health::<M>))
    .route("/predict", post(predict::<M>))
    .layer(DefaultBodyLimit::disable())
    .layer(RequestBodyLimitLayer::new(MAX_REQUEST_SIZE))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// 监听 `addr` 直到收到 Ctrl-C
pub async fn serve<M: Detector>(addr: SocketAddr, state: AppState<M>) -> anyhow::Result<()> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("推理服务监听于 http://{}", listener.local_addr()?);

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("服务已停止");
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!("收到中断信号，准备退出...");
  }
}
