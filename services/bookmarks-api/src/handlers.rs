//! ブックマークリソースのハンドラー
//!
//! リクエストの検証・エスケープを行い、ストアの呼び出し結果をレスポンスに整形する。
//! - 一覧 (GET /bookmarks)
//! - 取得 (GET /bookmarks/{id})
//! - 作成 (POST /bookmarks)
//! - 部分更新 (PATCH /bookmarks/{id})
//! - 削除 (DELETE /bookmarks/{id})

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::bookmark::{sanitize, Bookmark, BookmarkPayload};
use crate::error::ApiError;
use crate::store::StoreError;
use crate::AppState;

/// パスのidを整数に変換する
///
/// 整数でないidに一致する行は存在しないため、404として扱う。
/// メッセージに含めるidはエスケープする。
fn parse_id(raw_id: &str) -> Result<i64, Response> {
    raw_id.parse::<i64>().map_err(|_| {
        tracing::warn!(bookmark_id = %raw_id, "整数でないブックマークID");
        ApiError::bookmark_not_found(sanitize(raw_id)).into_response()
    })
}

/// リクエストボディを取り出す
///
/// JSONとして解釈できない場合も統一エラー形式で返す。
/// フィールドの型が合わない場合は検証エラーと同じく400とする。
fn parse_payload(
    payload: Result<Json<BookmarkPayload>, JsonRejection>,
) -> Result<BookmarkPayload, Response> {
    payload.map(|Json(p)| p).map_err(|rejection| {
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        let error = ApiError::new(status, sanitize(&rejection.body_text()));
        tracing::warn!(
            status = %error.status(),
            error = %error.message(),
            "リクエストボディの解析に失敗"
        );
        error.into_response()
    })
}

/// ストアエラーを500レスポンスに変換する
///
/// エラーの詳細はログにのみ出力する。
fn store_failure(error: &StoreError, context: &str) -> Response {
    tracing::error!(error = %error, "{}", context);
    ApiError::internal_error().into_response()
}

/// 作成したリソースの正規パス（`<collectionPath>/<id>`）
fn resource_location(collection_uri: &Uri, id: i64) -> String {
    format!("{}/{}", collection_uri.path().trim_end_matches('/'), id)
}

/// ブックマーク一覧エンドポイント (GET /bookmarks)
///
/// # Returns
/// - 200 OK: エスケープ済みブックマークの配列（空の場合は`[]`）
/// - 500 Internal Server Error: データベースエラー
pub async fn list_bookmarks(State(state): State<AppState>) -> Response {
    match state.store.list_all().await {
        Ok(bookmarks) => {
            tracing::info!(count = bookmarks.len(), "ブックマーク一覧を返却");
            let shaped: Vec<Bookmark> = bookmarks.into_iter().map(Bookmark::sanitized).collect();
            Json(shaped).into_response()
        }
        Err(e) => store_failure(&e, "ブックマーク一覧取得エラー"),
    }
}

/// ブックマーク取得エンドポイント (GET /bookmarks/{id})
///
/// # Returns
/// - 200 OK: エスケープ済みブックマーク
/// - 404 Not Found: 該当するブックマークがない
/// - 500 Internal Server Error: データベースエラー
pub async fn get_bookmark(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.get_by_id(id).await {
        Ok(Some(bookmark)) => Json(bookmark.sanitized()).into_response(),
        Ok(None) => {
            tracing::warn!(bookmark_id = id, "ブックマークが見つからない");
            ApiError::bookmark_not_found(id).into_response()
        }
        Err(e) => store_failure(&e, "ブックマーク取得エラー"),
    }
}

/// ブックマーク作成エンドポイント (POST /bookmarks)
///
/// 必須フィールドを検証し、テキストをエスケープしてから保存する。
///
/// # Returns
/// - 201 Created: `Location`ヘッダーと作成したブックマーク
/// - 400 Bad Request: 必須フィールドの欠落、ratingが不正、JSONが不正
/// - 500 Internal Server Error: データベースエラー
pub async fn create_bookmark(
    State(state): State<AppState>,
    uri: Uri,
    payload: Result<Json<BookmarkPayload>, JsonRejection>,
) -> Response {
    let payload = match parse_payload(payload) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    if payload.id.is_some() {
        tracing::debug!("クライアント指定のidは無視する");
    }

    let new_bookmark = match payload.into_new_bookmark() {
        Ok(new_bookmark) => new_bookmark,
        Err(e) => {
            tracing::warn!(reason = %e, "ブックマーク作成リクエストが不正");
            return ApiError::bad_request(e.to_string()).into_response();
        }
    };

    match state.store.insert(&new_bookmark).await {
        Ok(created) => {
            tracing::info!(bookmark_id = created.id, "ブックマークを作成");
            let location = resource_location(&uri, created.id);
            (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(created.sanitized()),
            )
                .into_response()
        }
        Err(e) => store_failure(&e, "ブックマーク作成エラー"),
    }
}

/// ブックマーク部分更新エンドポイント (PATCH /bookmarks/{id})
///
/// 指定されたフィールドのみ更新する。
///
/// # Returns
/// - 204 No Content: 更新成功
/// - 400 Bad Request: 更新対象のフィールドがない、ratingが不正、JSONが不正
/// - 404 Not Found: 該当するブックマークがない
/// - 500 Internal Server Error: データベースエラー
pub async fn update_bookmark(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<BookmarkPayload>, JsonRejection>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let patch = match parse_payload(payload).map(BookmarkPayload::into_patch) {
        Ok(Ok(patch)) => patch,
        Ok(Err(e)) => {
            tracing::warn!(bookmark_id = id, reason = %e, "ブックマーク更新リクエストが不正");
            return ApiError::bad_request(e.to_string()).into_response();
        }
        Err(response) => return response,
    };

    match state.store.update(id, &patch).await {
        Ok(0) => {
            tracing::warn!(bookmark_id = id, "更新対象のブックマークが見つからない");
            ApiError::bookmark_not_found(id).into_response()
        }
        Ok(_) => {
            tracing::info!(bookmark_id = id, "ブックマークを更新");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_failure(&e, "ブックマーク更新エラー"),
    }
}

/// ブックマーク削除エンドポイント (DELETE /bookmarks/{id})
///
/// # Returns
/// - 204 No Content: 削除成功
/// - 404 Not Found: 該当するブックマークがない
/// - 500 Internal Server Error: データベースエラー
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.delete_by_id(id).await {
        Ok(0) => {
            tracing::warn!(bookmark_id = id, "削除対象のブックマークが見つからない");
            ApiError::bookmark_not_found(id).into_response()
        }
        Ok(_) => {
            tracing::info!(bookmark_id = id, "ブックマークを削除");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_failure(&e, "ブックマーク削除エラー"),
    }
}
