//! Help-center domain types, deserialized from the cached API payloads.

use serde::{Deserialize, Serialize};

/// Numeric identifier shared by categories, sections and articles.
pub type EntityId = u64;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Raw sibling-ordering value as delivered by the API.
///
/// The API normally sends an integer, but older payloads carry strings and
/// some entities omit the field entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for Position {
    fn default() -> Self {
        Self::Other(serde_json::Value::Null)
    }
}

impl Position {
    /// Integer rank, if the raw value can be read as one.
    pub fn rank(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Which of the three navigable entity kinds an ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Section,
    Article,
}

impl EntityKind {
    /// Collection name used by the API and the cache layout.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Section => "sections",
            Self::Article => "articles",
        }
    }

    /// Parse the path segment used in help-center URLs (`/hc/<locale>/<segment>/<id>`).
    pub fn from_url_segment(segment: &str) -> Option<Self> {
        match segment {
            "categories" => Some(Self::Category),
            "sections" => Some(Self::Section),
            "articles" => Some(Self::Article),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Section => "section",
            Self::Article => "article",
        })
    }
}

/// Top-level grouping of sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
}

/// Grouping of articles inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    pub category_id: EntityId,
}

/// A single help-center article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub position: Position,
    pub section_id: EntityId,
    /// Raw HTML with absolute links back into the help center.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Article {
    /// Display title, falling back to the name when the API left it empty.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// A file attached to an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub article_id: EntityId,
    pub file_name: String,
    pub content_url: String,
    /// Inline images are embedded in the body rather than offered for download.
    #[serde(default)]
    pub inline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    /// File name used for the relocated copy: `<articleID>-<file_name>`.
    ///
    /// Only the last path component of `file_name` is used, so the result
    /// never leaves the directory it is joined onto.
    pub fn local_name(&self) -> String {
        format!("{}-{}", self.article_id, safe_file_name(&self.file_name))
    }
}

/// Reduce a remote-supplied file name to a single, non-traversing path component.
///
/// ```
/// use hcexport_shared::types::safe_file_name;
///
/// assert_eq!(safe_file_name("manual.pdf"), "manual.pdf");
/// assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
/// ```
pub fn safe_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let safe = match last {
        "" | "." | ".." => "attachment",
        other => other,
    };
    if safe != name {
        tracing::warn!(file_name = name, sanitized = safe, "unsafe attachment file name");
    }
    safe.to_string()
}

/// Everything fetched for one language, in fetch order.
#[derive(Debug, Clone, Default)]
pub struct LanguageContent {
    /// Language code used for output paths (e.g. `de`).
    pub language: String,
    pub categories: Vec<Category>,
    pub sections: Vec<Section>,
    pub articles: Vec<Article>,
    pub attachments: Vec<Attachment>,
}
