//! 認証ミドルウェア
//!
//! APIトークンによる認証を提供する。
//! - Authorizationヘッダーからトークンを抽出
//! - 設定されたトークンと照合
//! - /healthエンドポイントは認証をバイパス
//! - 不正なトークン時は401 Unauthorized（JSON形式）を返却

use crate::error::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// 認証失敗時にクライアントへ返すメッセージ
const UNAUTHORIZED_MESSAGE: &str = "Unauthorized request";

/// 認証設定
///
/// axumのStateとして共有される。
#[derive(Clone)]
pub struct AuthConfig {
    /// APIトークン
    pub api_token: String,
}

impl AuthConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
        }
    }
}

/// Authorizationヘッダーの値からトークン部分を取り出す
///
/// `Bearer <token>` と `<token>` の両形式を受け付ける。
fn extract_token(header_value: &str) -> &str {
    header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .trim()
}

/// 認証ミドルウェア
///
/// # Returns
/// - 認証成功時: 次のハンドラーにリクエストを渡す
/// - 認証失敗時: 401 Unauthorized（JSON形式）を返す
pub async fn auth_middleware(
    State(config): State<AuthConfig>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header_value) = auth_header else {
        tracing::warn!(
            path = %request.uri().path(),
            "認証ヘッダーがありません"
        );
        return ApiError::unauthorized(UNAUTHORIZED_MESSAGE).into_response();
    };

    let token = extract_token(header_value);
    if !token.is_empty() && token == config.api_token {
        next.run(request).await
    } else {
        tracing::warn!(
            path = %request.uri().path(),
            "無効なAPIトークン"
        );
        ApiError::unauthorized(UNAUTHORIZED_MESSAGE).into_response()
    }
}
