//! テスト用のブックマークデータ

use crate::bookmark::{Bookmark, NewBookmark};
use crate::store::SqliteBookmarkStore;

/// 空のテーブルに順に挿入した場合の期待値（idは1から採番される）
pub fn make_bookmarks_array() -> Vec<Bookmark> {
    vec![
        Bookmark {
            id: 1,
            title: "google".to_string(),
            url: "https://www.google.com".to_string(),
            description: "search".to_string(),
            rating: 5,
        },
        Bookmark {
            id: 2,
            title: "youtube".to_string(),
            url: "https://www.youtube.com".to_string(),
            description: "video".to_string(),
            rating: 4,
        },
        Bookmark {
            id: 3,
            title: "wikipedia".to_string(),
            url: "https://www.wikipedia.org".to_string(),
            description: "encyclopedia".to_string(),
            rating: 3,
        },
    ]
}

/// フィクスチャを空のストアに挿入し、保存された行を返す
pub async fn seed_bookmarks(store: &SqliteBookmarkStore) -> Vec<Bookmark> {
    let mut created = Vec::new();
    for bookmark in make_bookmarks_array() {
        let new = NewBookmark {
            title: bookmark.title,
            url: bookmark.url,
            description: bookmark.description,
            rating: bookmark.rating,
        };
        created.push(store.insert(&new).await.unwrap());
    }
    assert_eq!(created, make_bookmarks_array(), "フィクスチャのidが想定と異なる");
    created
}
