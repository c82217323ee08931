//! ブックマークを管理するHTTP APIサーバー
//!
//! 本バイナリは以下の機能を提供する:
//! - ブックマークの一覧・取得 (GET /bookmarks, GET /bookmarks/{id})
//! - ブックマークの作成 (POST /bookmarks)
//! - ブックマークの部分更新 (PATCH /bookmarks/{id})
//! - ブックマークの削除 (DELETE /bookmarks/{id})
//! - ヘルスチェック (GET /health)
//!
//! ブックマークのルートは `/api/bookmarks` 配下にも同じものを公開する。

mod auth;
mod bookmark;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod handlers;
mod logging;
mod store;

use auth::{auth_middleware, AuthConfig};
use config::Config;
use handlers::{create_bookmark, delete_bookmark, get_bookmark, list_bookmarks, update_bookmark};
use store::SqliteBookmarkStore;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// ブックマークのコレクションを公開するパス
const COLLECTION_PATHS: [&str; 2] = ["/bookmarks", "/api/bookmarks"];

/// アプリケーション状態
///
/// ルーター全体で共有される状態を保持する。
#[derive(Clone)]
pub struct AppState {
    /// SQLiteブックマークストア
    pub store: Arc<SqliteBookmarkStore>,
}

/// ヘルスチェックエンドポイント
///
/// サーバーの死活確認用。認証不要。
async fn health() -> &'static str {
    "OK"
}

/// ルーターを構築する
///
/// 全エンドポイントのルーティングを定義し、認証ミドルウェアを適用する。
/// /healthエンドポイントは認証をバイパスする（auth_middleware内で処理）。
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
///
/// # Arguments
/// * `auth_config` - 認証設定
/// * `store` - SQLiteブックマークストア
pub fn create_router_with_store(
    auth_config: AuthConfig,
    store: Arc<SqliteBookmarkStore>,
) -> Router {
    let state = AppState { store };

    let mut router: Router<AppState> = Router::new().route("/health", get(health));
    for collection in COLLECTION_PATHS {
        router = router
            .route(collection, get(list_bookmarks).post(create_bookmark))
            .route(
                &format!("{}/{{id}}", collection),
                get(get_bookmark)
                    .patch(update_bookmark)
                    .delete(delete_bookmark),
            );
    }

    router
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を受信したらリターンする。
/// シグナルハンドラーを登録できなかった場合、そのシグナルでは停止しない。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C シグナルハンドラーの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM シグナルハンドラーの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            tracing::info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// メイン関数
///
/// トレーシングを初期化し、HTTPサーバーを起動する。
/// SIGTERMまたはCtrl+Cを受信すると処理中のリクエスト完了を待ってから終了する。
///
/// # 環境変数
/// - `API_TOKEN`: APIトークン（必須）
/// - `DB_PATH`: データベースファイルのパス（デフォルト: bookmarks.db）
/// - `LISTEN_ADDR`: リッスンアドレス（デフォルト: 127.0.0.1:8000）
/// - `RUST_LOG`: ログレベル（デフォルト: info）
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    tracing::info!("ブックマークAPIサーバーを起動します");

    let config = Config::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "設定の読み込みに失敗しました"))?;
    tracing::info!(db_path = %config.db_path(), "設定を読み込みました");

    let store = Arc::new(
        SqliteBookmarkStore::new(config.db_path())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "SQLiteストアの初期化に失敗しました"))?,
    );
    tracing::info!("SQLiteストアを初期化しました");

    let app = create_router_with_store(AuthConfig::new(config.api_token()), store);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(addr = %config.listen_addr(), "リッスン開始");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("サーバーが正常に停止しました");
    Ok(())
}
