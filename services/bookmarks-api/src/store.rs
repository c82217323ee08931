//! SQLiteブックマークストア
//!
//! `bookmarks`テーブルに対する一覧・取得・作成・更新・削除を提供する。
//! - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
//! - 読み取り: deadpool-sqliteによるasync接続プール
//!
//! 各操作は単一のSQL文で完結し、トランザクションやリトライは行わない。

use std::sync::{Arc, Mutex};

use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::bookmark::{Bookmark, BookmarkPatch, NewBookmark};

/// ストアエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// プール取得エラー
    #[error("プールエラー: {0}")]
    Pool(String),

    /// 接続構築エラー
    #[error("接続構築エラー: {0}")]
    Build(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::BuildError> for StoreError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        StoreError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for StoreError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// SQLiteデータベースのスキーマを定義するSQL
const SCHEMA_SQL: &str = r#"
-- WALモード設定
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

-- ブックマークテーブル
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    description TEXT NOT NULL,
    rating INTEGER NOT NULL
);
"#;

/// レコードとして取得するカラム（Bookmarkのフィールド順）
const BOOKMARK_COLUMNS: &str = "id, title, url, description, rating";

/// 行をBookmarkに変換する
fn row_to_bookmark(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        rating: row.get(4)?,
    })
}

/// SQLiteブックマークストア
pub struct SqliteBookmarkStore {
    /// 書き込み専用接続
    write_conn: Arc<Mutex<Connection>>,
    /// 読み取り用async接続プール
    read_pool: Pool,
}

impl SqliteBookmarkStore {
    /// 新しいSqliteBookmarkStoreを作成
    ///
    /// データベースファイルを開き、スキーマを初期化する。
    ///
    /// # Arguments
    /// * `db_path` - データベースファイルのパス
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let write_conn = Connection::open(db_path)?;
        write_conn.execute_batch(SCHEMA_SQL)?;

        let read_pool = Config::new(db_path)
            .builder(Runtime::Tokio1)
            .map_err(|e| StoreError::Build(e.to_string()))?
            .max_size(4)
            .build()?;

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    /// 書き込み用接続を取得（テスト用）
    #[cfg(test)]
    pub(crate) fn write_connection(&self) -> Arc<Mutex<Connection>> {
        self.write_conn.clone()
    }

    /// 書き込み専用接続でクロージャを実行する
    ///
    /// rusqliteの呼び出しはブロッキングのため`spawn_blocking`上で実行する。
    async fn write<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.write_conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| {
                StoreError::Database("書き込み接続のロック取得に失敗（Mutex poisoned）".to_string())
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("タスク実行エラー: {}", e)))?
    }

    /// 全ブックマークを取得
    ///
    /// ページングは行わない。並び順はid昇順。
    pub async fn list_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(|conn| -> Result<Vec<Bookmark>, StoreError> {
            let sql = format!("SELECT {} FROM bookmarks ORDER BY id", BOOKMARK_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let bookmarks = stmt
                .query_map([], row_to_bookmark)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(bookmarks)
        })
        .await?
    }

    /// IDでブックマークを取得
    ///
    /// # Returns
    /// * `Ok(Some(Bookmark))` - 見つかった
    /// * `Ok(None)` - 該当する行がない
    /// * `Err(StoreError)` - エラー
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Bookmark>, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| -> Result<Option<Bookmark>, StoreError> {
            let sql = format!("SELECT {} FROM bookmarks WHERE id = ?1", BOOKMARK_COLUMNS);
            let bookmark = conn
                .query_row(&sql, [id], row_to_bookmark)
                .optional()?;
            Ok(bookmark)
        })
        .await?
    }

    /// ブックマークを作成
    ///
    /// idはストアが採番し、保存された行をそのまま返す。
    pub async fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark, StoreError> {
        let bookmark = bookmark.clone();

        self.write(move |conn| {
            let sql = format!(
                "INSERT INTO bookmarks (title, url, description, rating) VALUES (?1, ?2, ?3, ?4) RETURNING {}",
                BOOKMARK_COLUMNS
            );
            let created = conn.query_row(
                &sql,
                rusqlite::params![
                    &bookmark.title,
                    &bookmark.url,
                    &bookmark.description,
                    bookmark.rating,
                ],
                row_to_bookmark,
            )?;
            Ok(created)
        })
        .await
    }

    /// 指定されたフィールドのみ更新
    ///
    /// # Returns
    /// * `Ok(n)` - 対象となった行数（idが存在しなければ0）
    /// * `Err(StoreError)` - エラー
    pub async fn update(&self, id: i64, patch: &BookmarkPatch) -> Result<usize, StoreError> {
        let (set_clause, mut params) = Self::build_set_clause(patch);

        self.write(move |conn| {
            // 更新内容がなければ該当行の有無だけを返す
            if set_clause.is_empty() {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM bookmarks WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )?;
                return Ok(count as usize);
            }

            params.push(SqlValue::Integer(id));
            let sql = format!("UPDATE bookmarks SET {} WHERE id = ?", set_clause);
            let rows_affected = conn.execute(&sql, rusqlite::params_from_iter(params))?;
            Ok(rows_affected)
        })
        .await
    }

    /// IDでブックマークを削除
    ///
    /// # Returns
    /// * `Ok(n)` - 削除した行数（idが存在しなければ0）
    /// * `Err(StoreError)` - エラー
    pub async fn delete_by_id(&self, id: i64) -> Result<usize, StoreError> {
        self.write(move |conn| {
            let rows_affected = conn.execute("DELETE FROM bookmarks WHERE id = ?1", [id])?;
            Ok(rows_affected)
        })
        .await
    }

    /// UPDATE文のSET句とパラメータを構築（内部用）
    ///
    /// 指定されたフィールドだけを`column = ?`として並べる。
    fn build_set_clause(patch: &BookmarkPatch) -> (String, Vec<SqlValue>) {
        let mut assignments: Vec<&str> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            params.push(SqlValue::Text(title.clone()));
        }
        if let Some(url) = &patch.url {
            assignments.push("url = ?");
            params.push(SqlValue::Text(url.clone()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            params.push(SqlValue::Text(description.clone()));
        }
        if let Some(rating) = patch.rating {
            assignments.push("rating = ?");
            params.push(SqlValue::Integer(i64::from(rating)));
        }

        (assignments.join(", "), params)
    }
}
