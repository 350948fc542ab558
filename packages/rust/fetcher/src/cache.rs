//! On-disk layout of the raw JSON cache and loaders for it.
//!
//! ```text
//! <cache>/
//! ├── <lang>/
//! │   ├── categories/page-1.json
//! │   ├── sections/page-1.json
//! │   ├── articles/page-1.json, page-2.json, ...
//! │   └── article_attachments/<articleID>/page-1.json
//! └── attachments/<articleID>-<file_name>
//! ```
//!
//! Every page file is the API response verbatim: an object holding the item
//! list under the collection key plus an optional `next_page` cursor.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use hcexport_shared::{
    Article, Attachment, Category, EntityId, EntityKind, HelpCenterError, LanguageContent, Result,
    Section,
};

/// Collection key of per-article attachment pages.
pub const ATTACHMENTS_KEY: &str = "article_attachments";

/// Path computations for the cache directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the pages of one collection.
    pub fn collection_dir(&self, language: &str, kind: EntityKind) -> PathBuf {
        self.root.join(language).join(kind.collection())
    }

    /// Directory holding the attachment pages of one article.
    pub fn article_attachments_dir(&self, language: &str, article_id: EntityId) -> PathBuf {
        self.root
            .join(language)
            .join(ATTACHMENTS_KEY)
            .join(article_id.to_string())
    }

    /// Location of a downloaded attachment binary.
    pub fn attachment_file(&self, attachment: &Attachment) -> PathBuf {
        self.root.join("attachments").join(attachment.local_name())
    }
}

/// File name of the `n`-th page (1-based).
pub fn page_file(dir: &Path, page: usize) -> PathBuf {
    dir.join(format!("page-{page}.json"))
}

/// Read a cached page and return it as raw JSON.
pub fn read_page(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| HelpCenterError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| HelpCenterError::parse(format!("{}: {e}", path.display())))
}

/// The `next_page` cursor of a page, if any.
pub fn next_page(page: &serde_json::Value) -> Option<&str> {
    page.get("next_page")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Read every cached page of a collection, following the `next_page` chain.
///
/// Returns `None` when not even the first page exists.
pub fn read_collection<T: DeserializeOwned>(dir: &Path, key: &str) -> Result<Option<Vec<T>>> {
    let first = page_file(dir, 1);
    if !first.exists() {
        return Ok(None);
    }

    let mut items = Vec::new();
    let mut n = 1;
    loop {
        let path = page_file(dir, n);
        let page = read_page(&path)?;

        let list = page.get(key).cloned().ok_or_else(|| {
            HelpCenterError::parse(format!("{}: missing '{key}' list", path.display()))
        })?;
        let mut batch: Vec<T> = serde_json::from_value(list)
            .map_err(|e| HelpCenterError::parse(format!("{}: {e}", path.display())))?;
        items.append(&mut batch);

        if next_page(&page).is_none() {
            break;
        }
        n += 1;
        if !page_file(dir, n).exists() {
            return Err(HelpCenterError::parse(format!(
                "{}: next_page announced but page {n} is not cached",
                path.display()
            )));
        }
    }

    debug!(dir = %dir.display(), pages = n, items = items.len(), "read cached collection");
    Ok(Some(items))
}

fn require_collection<T: DeserializeOwned>(
    layout: &CacheLayout,
    language: &str,
    kind: EntityKind,
) -> Result<Vec<T>> {
    let dir = layout.collection_dir(language, kind);
    read_collection(&dir, kind.collection())?.ok_or_else(|| {
        HelpCenterError::validation(format!(
            "no cached {} for language '{language}' at {}",
            kind.collection(),
            dir.display()
        ))
    })
}

/// Load everything cached for one language.
///
/// Attachment lists are optional per article; an article whose attachment
/// pages were never fetched simply has none.
#[instrument(skip(layout), fields(cache = %layout.root().display()))]
pub fn load_language(layout: &CacheLayout, language: &str) -> Result<LanguageContent> {
    let categories: Vec<Category> = require_collection(layout, language, EntityKind::Category)?;
    let sections: Vec<Section> = require_collection(layout, language, EntityKind::Section)?;
    let articles: Vec<Article> = require_collection(layout, language, EntityKind::Article)?;

    let mut attachments: Vec<Attachment> = Vec::new();
    for article in &articles {
        let dir = layout.article_attachments_dir(language, article.id);
        if let Some(mut list) = read_collection::<Attachment>(&dir, ATTACHMENTS_KEY)? {
            attachments.append(&mut list);
        }
    }

    debug!(
        language,
        categories = categories.len(),
        sections = sections.len(),
        articles = articles.len(),
        attachments = attachments.len(),
        "loaded language from cache"
    );

    Ok(LanguageContent {
        language: language.to_string(),
        categories,
        sections,
        articles,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hc-cache-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: &Path, json: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }

    #[test]
    fn layout_paths() {
        let layout = CacheLayout::new("/cache");
        assert_eq!(
            layout.collection_dir("de", EntityKind::Article),
            PathBuf::from("/cache/de/articles")
        );
        assert_eq!(
            layout.article_attachments_dir("en", 77),
            PathBuf::from("/cache/en/article_attachments/77")
        );
        assert_eq!(
            page_file(Path::new("/cache/de/sections"), 2),
            PathBuf::from("/cache/de/sections/page-2.json")
        );
    }

    #[test]
    fn read_collection_follows_next_page() {
        let tmp = temp_dir();
        let dir = tmp.join("de").join("categories");
        write(
            &page_file(&dir, 1),
            r#"{"categories": [{"id": 1, "name": "A"}], "next_page": "https://x/categories.json?page=2"}"#,
        );
        write(
            &page_file(&dir, 2),
            r#"{"categories": [{"id": 2, "name": "B"}], "next_page": null}"#,
        );

        let cats: Vec<Category> = read_collection(&dir, "categories").unwrap().unwrap();
        assert_eq!(cats.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_collection_missing_dir_is_none() {
        let tmp = temp_dir();
        let result: Option<Vec<Category>> =
            read_collection(&tmp.join("nothing"), "categories").unwrap();
        assert!(result.is_none());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_page_is_fatal() {
        let tmp = temp_dir();
        let dir = tmp.join("de").join("sections");
        write(&page_file(&dir, 1), "{not json");
        let result: Result<Option<Vec<Section>>> = read_collection(&dir, "sections");
        assert!(matches!(result, Err(HelpCenterError::Parse { .. })));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_key_is_fatal() {
        let tmp = temp_dir();
        let dir = tmp.join("de").join("sections");
        write(&page_file(&dir, 1), r#"{"items": []}"#);
        let result: Result<Option<Vec<Section>>> = read_collection(&dir, "sections");
        assert!(result.unwrap_err().to_string().contains("missing 'sections'"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_language_collects_attachments() {
        let tmp = temp_dir();
        let layout = CacheLayout::new(&tmp);
        write(
            &page_file(&layout.collection_dir("en", EntityKind::Category), 1),
            r#"{"categories": [{"id": 1, "name": "Cat", "position": 0}]}"#,
        );
        write(
            &page_file(&layout.collection_dir("en", EntityKind::Section), 1),
            r#"{"sections": [{"id": 10, "name": "Sec", "category_id": 1}]}"#,
        );
        write(
            &page_file(&layout.collection_dir("en", EntityKind::Article), 1),
            r#"{"articles": [
                {"id": 100, "name": "One", "section_id": 10},
                {"id": 101, "name": "Two", "section_id": 10}
            ]}"#,
        );
        write(
            &page_file(&layout.article_attachments_dir("en", 100), 1),
            r#"{"article_attachments": [
                {"article_id": 100, "file_name": "a.pdf", "content_url": "https://x/a.pdf", "inline": false}
            ]}"#,
        );

        let content = load_language(&layout, "en").unwrap();
        assert_eq!(content.language, "en");
        assert_eq!(content.categories.len(), 1);
        assert_eq!(content.sections.len(), 1);
        assert_eq!(content.articles.len(), 2);
        assert_eq!(content.attachments.len(), 1);
        assert_eq!(content.attachments[0].file_name, "a.pdf");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn attachment_file_stays_inside_attachments_dir() {
        let tmp = temp_dir();
        let layout = CacheLayout::new(tmp.join("cache"));
        let attachment: Attachment = serde_json::from_value(serde_json::json!({
            "article_id": 7,
            "file_name": "../../../escaped.txt",
            "content_url": "https://x/escaped.txt"
        }))
        .unwrap();

        let file = layout.attachment_file(&attachment);
        assert_eq!(file, tmp.join("cache").join("attachments").join("7-escaped.txt"));

        write(&file, "data");
        let resolved = file.canonicalize().unwrap();
        let attachments_dir = tmp.join("cache").join("attachments").canonicalize().unwrap();
        assert_eq!(resolved.parent(), Some(attachments_dir.as_path()));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_language_without_cache_fails() {
        let tmp = temp_dir();
        let layout = CacheLayout::new(&tmp);
        let err = load_language(&layout, "de").unwrap_err();
        assert!(err.to_string().contains("no cached categories"));
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
