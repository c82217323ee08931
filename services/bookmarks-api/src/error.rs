//! APIエラーハンドリング
//!
//! クライアントに返すエラーレスポンスを一つの形式に統一する。
//! すべてのエラーは `{"error": {"message": "..."}}` のJSON形式で返却される。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// 500エラー時にクライアントへ返す固定メッセージ
///
/// ストア由来の詳細はログにのみ出力し、レスポンスには含めない。
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// エラー詳細
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// 人間向けのエラーメッセージ
    pub message: String,
}

/// APIエラーレスポンスのボディ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: ErrorDetail,
}

/// APIエラー
///
/// ステータスコードとJSON形式のエラーボディを持つ。
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    /// 新しいApiErrorを作成
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: ErrorDetail {
                    message: message.into(),
                },
            },
        }
    }

    /// 400 Bad Requestエラーを作成
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorizedエラーを作成
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 404 Not Foundエラーを作成
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// ブックマークが見つからない場合の404エラーを作成
    pub fn bookmark_not_found(id: impl std::fmt::Display) -> Self {
        Self::not_found(format!("Bookmark with id {} not found.", id))
    }

    /// 500 Internal Server Errorを作成
    ///
    /// メッセージは常に固定文言で、内部エラーの詳細は含めない。
    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// エラーメッセージを取得
    pub fn message(&self) -> &str {
        &self.body.error.message
    }

    /// ステータスコードを取得
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
