//! ブックマークのドメイン型と入力検証
//!
//! - `Bookmark`: 永続化されたレコード（レスポンスのフィールド許可リストを兼ねる）
//! - `BookmarkPayload`: POST/PATCHのリクエストボディ
//! - `sanitize`: HTMLとして意味を持つ文字のエスケープ
//!
//! 必須フィールドは宣言順に検査され、最初に欠けているフィールドがエラーになる。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// ratingの下限
pub const MIN_RATING: i32 = 1;

/// ratingの上限
pub const MAX_RATING: i32 = 5;

/// 検証エラー
///
/// いずれも400 Bad Requestとしてクライアントに返される。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 必須フィールドが存在しない、または空
    #[error("Missing '{0}' in request body")]
    MissingField(&'static str),

    /// ratingが整数に変換できない、または範囲外
    #[error("'rating' must be a number between 1 and 5")]
    InvalidRating,

    /// PATCHで更新対象のフィールドが一つもない
    #[error("Request body must contain either 'title', 'url', 'description' or 'rating'")]
    EmptyPatch,
}

/// ブックマーク
///
/// レスポンスに含めるフィールドはこの構造体のものに限られる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: String,
    pub rating: i32,
}

impl Bookmark {
    /// テキストフィールドをエスケープしたコピーを返す（ratingとidはそのまま）
    pub fn sanitized(self) -> Self {
        Self {
            id: self.id,
            title: sanitize(&self.title),
            url: sanitize(&self.url),
            description: sanitize(&self.description),
            rating: self.rating,
        }
    }
}

/// 新規作成するブックマーク（idはストアが採番する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub description: String,
    pub rating: i32,
}

/// 部分更新の内容
///
/// `None`のフィールドは更新しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub rating: Option<i32>,
}

impl BookmarkPatch {
    /// 更新対象のフィールドが一つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.rating.is_none()
    }
}

/// POST/PATCHのリクエストボディ
///
/// 欠落とnullはどちらも`None`になる。空文字列は検証時に欠落として扱う。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// 数値または数値文字列を受け付ける
    #[serde(default)]
    pub rating: Option<Value>,
    /// クライアント指定のID（idはストアが採番するため使用しない）
    #[serde(default)]
    pub id: Option<Value>,
}

/// 必須フィールドの記述子
struct RequiredField {
    name: &'static str,
    is_present: fn(&BookmarkPayload) -> bool,
}

/// 作成時の必須フィールド（この順序で検査する）
const REQUIRED_FIELDS: [RequiredField; 4] = [
    RequiredField {
        name: "title",
        is_present: title_present,
    },
    RequiredField {
        name: "url",
        is_present: url_present,
    },
    RequiredField {
        name: "description",
        is_present: description_present,
    },
    RequiredField {
        name: "rating",
        is_present: rating_field_present,
    },
];

fn title_present(payload: &BookmarkPayload) -> bool {
    text_present(&payload.title)
}

fn url_present(payload: &BookmarkPayload) -> bool {
    text_present(&payload.url)
}

fn description_present(payload: &BookmarkPayload) -> bool {
    text_present(&payload.description)
}

fn rating_field_present(payload: &BookmarkPayload) -> bool {
    rating_present(&payload.rating)
}

fn text_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

fn rating_present(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// 空でないテキストをエスケープして返す
fn sanitized_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(|s| sanitize(&s))
}

/// ratingを整数に変換し、範囲を検証する
///
/// JSONの整数、小数部のない浮動小数点数、数値文字列を受け付ける。
pub fn coerce_rating(value: &Value) -> Result<i32, ValidationError> {
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    number
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| (MIN_RATING..=MAX_RATING).contains(n))
        .ok_or(ValidationError::InvalidRating)
}

impl BookmarkPayload {
    /// 作成用の入力に変換する
    ///
    /// 必須フィールドを宣言順に検査し、最初に欠けているものを報告する。
    /// テキストフィールドは保存前にエスケープされる。
    pub fn into_new_bookmark(self) -> Result<NewBookmark, ValidationError> {
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !(f.is_present)(&self)) {
            return Err(ValidationError::MissingField(missing.name));
        }

        let rating = self
            .rating
            .as_ref()
            .map(coerce_rating)
            .transpose()?
            .ok_or(ValidationError::MissingField("rating"))?;

        Ok(NewBookmark {
            title: sanitize(&self.title.unwrap_or_default()),
            url: sanitize(&self.url.unwrap_or_default()),
            description: sanitize(&self.description.unwrap_or_default()),
            rating,
        })
    }

    /// 部分更新の内容に変換する
    ///
    /// 空・nullのフィールドは指定されなかったものとして扱う。
    pub fn into_patch(self) -> Result<BookmarkPatch, ValidationError> {
        let rating = if rating_present(&self.rating) {
            self.rating.as_ref().map(coerce_rating).transpose()?
        } else {
            None
        };

        let patch = BookmarkPatch {
            title: sanitized_text(self.title),
            url: sanitized_text(self.url),
            description: sanitized_text(self.description),
            rating,
        };

        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        Ok(patch)
    }
}

/// エスケープ済みとして扱うエンティティ
const KNOWN_ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"];

/// HTMLとして意味を持つ文字をエスケープする
///
/// `&` `<` `>` `"` `'` を文字参照に置き換える。既にエスケープ済みの
/// エンティティはそのまま残すため、`sanitize(sanitize(s)) == sanitize(s)` が成り立つ。
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if KNOWN_ENTITIES.iter().any(|e| text[i..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
