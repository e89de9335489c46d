//! Dashboard HTTP server
//!
//! ブラウザからCSVをアップロードし、ダッシュボードを表示するローカルサーバー。
//!
//! ## 使用方法
//!
//! ```ignore
//! let server = DashboardServer::new(config.server, config.dashboard);
//! server.serve().await?;
//! ```
//!
//! ## ルート
//!
//! * `GET /` アップロード画面
//! * `POST /upload` CSVの受け付け（multipartの `file` フィールド）
//! * `GET /dashboard/:id` ダッシュボード画面（`start` / `end` で期間指定）
//! * `GET /api/dashboard/:id` ダッシュボードのJSON
//! * `GET /export/:id?format=json|csv|xlsx` レポートのダウンロード

pub mod handlers;
pub mod render;
pub mod session_store;

use crate::analytics::dashboard::DashboardSettings;
use crate::config::ServerConfig;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use session_store::SessionStore;
use std::sync::Arc;
use tokio::net::TcpListener;

/// 希望ポートが使用中の場合に試すポート数
const PORT_ATTEMPTS: u16 = 10;

/// ハンドラー間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub settings: DashboardSettings,
}

/// ルーターを構築
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/dashboard/:id", get(handlers::dashboard))
        .route("/api/dashboard/:id", get(handlers::dashboard_json))
        .route("/export/:id", get(handlers::export))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// ダッシュボードサーバー
pub struct DashboardServer {
    config: ServerConfig,
    state: AppState,
}

impl DashboardServer {
    pub fn new(config: ServerConfig, settings: DashboardSettings) -> Self {
        let store = Arc::new(SessionStore::new(config.max_sessions));
        Self {
            config,
            state: AppState { store, settings },
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), self.config.max_upload_mb * 1024 * 1024)
    }

    /// サーバーを起動し、Ctrl+Cで停止するまで待つ
    ///
    /// 希望ポートが使用中の場合、自動的に次のポートを試行する。
    pub async fn serve(self) -> anyhow::Result<()> {
        let port_range_end = self.config.port.saturating_add(PORT_ATTEMPTS - 1);
        let (listener, bound_port) = self
            .try_bind_ports(self.config.port, port_range_end)
            .await?;

        let addr = format!("{}:{}", self.config.host, bound_port);
        if bound_port != self.config.port {
            tracing::info!(
                "🌐 Dashboard listening on http://{} (preferred port {} was unavailable)",
                addr,
                self.config.port
            );
        } else {
            tracing::info!("🌐 Dashboard listening on http://{}", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("🛑 Dashboard server stopped");
        Ok(())
    }

    /// ポートを順番に試行してバインド
    async fn try_bind_ports(
        &self,
        start_port: u16,
        end_port: u16,
    ) -> anyhow::Result<(TcpListener, u16)> {
        let mut last_error = None;

        for port in start_port..=end_port {
            let addr = format!("{}:{}", self.config.host, port);
            tracing::debug!("Attempting to bind dashboard server to {}", addr);

            match TcpListener::bind(&addr).await {
                Ok(listener) => {
                    tracing::debug!("Successfully bound to {}", addr);
                    return Ok((listener, port));
                }
                Err(e) => {
                    tracing::debug!("Port {} unavailable: {}", port, e);
                    last_error = Some(e);
                }
            }
        }

        // すべてのポートが使用中
        let err = last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "No ports available")
        });
        tracing::error!(
            "❌ Failed to bind dashboard server to any port in range {}-{}: {}",
            start_port,
            end_port,
            err
        );

        Err(anyhow::anyhow!(
            "Failed to bind to any port in range {}-{}: {}",
            start_port,
            end_port,
            err
        ))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
