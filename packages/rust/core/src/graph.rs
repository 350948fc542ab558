//! Content graph: ordered category → section → article tree, the per-language
//! ID → permalink index, and the per-article download list.
//!
//! All three structures are derived from a [`LanguageContent`] snapshot and
//! are read-only once built.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

use hcexport_shared::{
    Article, Attachment, Category, EntityId, EntityKind, LanguageContent, PermalinkConfig,
    Position, Section,
};

use crate::slug::slugify;

// ---------------------------------------------------------------------------
// Ordered tree
// ---------------------------------------------------------------------------

/// One language's navigable tree, siblings sorted by position.
#[derive(Debug)]
pub struct ContentTree<'a> {
    pub language: &'a str,
    pub categories: Vec<CategoryNode<'a>>,
}

#[derive(Debug)]
pub struct CategoryNode<'a> {
    pub category: &'a Category,
    pub sections: Vec<SectionNode<'a>>,
}

#[derive(Debug)]
pub struct SectionNode<'a> {
    pub section: &'a Section,
    pub articles: Vec<&'a Article>,
}

impl<'a> ContentTree<'a> {
    /// Build the tree for one language.
    ///
    /// Children whose parent is not part of `content` are never attached and
    /// therefore never rendered.
    #[instrument(skip_all, fields(language = %content.language))]
    pub fn build(content: &'a LanguageContent) -> Self {
        let mut articles_by_section: HashMap<EntityId, Vec<&'a Article>> = HashMap::new();
        for article in &content.articles {
            articles_by_section
                .entry(article.section_id)
                .or_default()
                .push(article);
        }

        let mut sections_by_category: HashMap<EntityId, Vec<&'a Section>> = HashMap::new();
        for section in &content.sections {
            sections_by_category
                .entry(section.category_id)
                .or_default()
                .push(section);
        }

        let categories = sort_by_position(content.categories.iter().collect(), |c| {
            (EntityKind::Category, c.id, &c.position)
        });

        let categories: Vec<CategoryNode<'a>> = categories
            .into_iter()
            .map(|category| {
                let sections = sections_by_category.remove(&category.id).unwrap_or_default();
                let sections = sort_by_position(sections, |s| (EntityKind::Section, s.id, &s.position))
                    .into_iter()
                    .map(|section| {
                        let articles = articles_by_section.remove(&section.id).unwrap_or_default();
                        SectionNode {
                            section,
                            articles: sort_by_position(articles, |a| {
                                (EntityKind::Article, a.id, &a.position)
                            }),
                        }
                    })
                    .collect();
                CategoryNode { category, sections }
            })
            .collect();

        debug!(categories = categories.len(), "content tree built");

        Self {
            language: &content.language,
            categories,
        }
    }

    /// Every reachable article in pre-order, with its ancestors.
    pub fn articles(&self) -> impl Iterator<Item = (&CategoryNode<'a>, &SectionNode<'a>, &'a Article)> {
        self.categories.iter().flat_map(|c| {
            c.sections
                .iter()
                .flat_map(move |s| s.articles.iter().map(move |a| (c, s, *a)))
        })
    }
}

/// Integer sort rank of a position; unreadable values rank as `0`.
fn rank(kind: EntityKind, id: EntityId, position: &Position) -> i64 {
    position.rank().unwrap_or_else(|| {
        warn!(%kind, id, ?position, "missing or non-numeric position, using 0");
        0
    })
}

/// Stable ascending sort by position; equal ranks keep fetch order.
fn sort_by_position<'a, T>(
    items: Vec<&'a T>,
    key: impl Fn(&T) -> (EntityKind, EntityId, &Position),
) -> Vec<&'a T> {
    let mut ranked: Vec<(i64, &'a T)> = items
        .into_iter()
        .map(|item| {
            let (kind, id, position) = key(item);
            (rank(kind, id, position), item)
        })
        .collect();
    ranked.sort_by_key(|(r, _)| *r);
    ranked.into_iter().map(|(_, item)| item).collect()
}

// ---------------------------------------------------------------------------
// Path index
// ---------------------------------------------------------------------------

/// Per-kind path prefixes for one language and export target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    category_prefix: String,
    section_prefix: String,
    article_prefix: String,
}

impl PathScheme {
    pub fn new(
        category_prefix: impl Into<String>,
        section_prefix: impl Into<String>,
        article_prefix: impl Into<String>,
    ) -> Self {
        Self {
            category_prefix: category_prefix.into(),
            section_prefix: section_prefix.into(),
            article_prefix: article_prefix.into(),
        }
    }

    /// Permalink scheme with `{lang}` substituted.
    pub fn permalinks(config: &PermalinkConfig, language: &str) -> Self {
        let fill = |p: &str| p.replace("{lang}", language);
        Self::new(
            fill(&config.category_prefix),
            fill(&config.section_prefix),
            fill(&config.article_prefix),
        )
    }

    fn prefix(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Category => &self.category_prefix,
            EntityKind::Section => &self.section_prefix,
            EntityKind::Article => &self.article_prefix,
        }
    }

    /// Landing path of the namespace (the article prefix).
    pub fn home(&self) -> &str {
        &self.article_prefix
    }

    /// `prefix/slug` for an entity of the given kind.
    pub fn path_for(&self, kind: EntityKind, name: &str) -> String {
        format!("{}/{}", self.prefix(kind).trim_end_matches('/'), slugify(name))
    }
}

/// Two distinct entities that were given the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCollision {
    pub path: String,
    pub first: EntityId,
    pub second: EntityId,
}

/// ID → canonical path for every category, section and article of one language.
#[derive(Debug, Clone)]
pub struct PathIndex {
    language: String,
    paths: HashMap<EntityId, String>,
    collisions: Vec<PathCollision>,
}

impl PathIndex {
    /// Index every fetched entity, reachable or not.
    ///
    /// Colliding slugs are kept as-is (each ID still maps to its own computed
    /// path) but are logged and recorded in [`PathIndex::collisions`].
    #[instrument(skip_all, fields(language = %content.language))]
    pub fn build(content: &LanguageContent, scheme: &PathScheme) -> Self {
        let entries = content
            .categories
            .iter()
            .map(|c| (EntityKind::Category, c.id, c.name.as_str()))
            .chain(
                content
                    .sections
                    .iter()
                    .map(|s| (EntityKind::Section, s.id, s.name.as_str())),
            )
            .chain(
                content
                    .articles
                    .iter()
                    .map(|a| (EntityKind::Article, a.id, a.name.as_str())),
            );

        let mut paths = HashMap::new();
        let mut owners: HashMap<String, EntityId> = HashMap::new();
        let mut collisions = Vec::new();

        for (kind, id, name) in entries {
            let path = scheme.path_for(kind, name);

            match owners.insert(path.clone(), id) {
                Some(previous) if previous != id => {
                    warn!(%kind, id, previous, %path, "slug collision, later entity wins the permalink");
                    collisions.push(PathCollision {
                        path: path.clone(),
                        first: previous,
                        second: id,
                    });
                }
                _ => {}
            }

            if let Some(old) = paths.insert(id, path) {
                warn!(%kind, id, %old, "duplicate id in fetched set, keeping the later path");
            }
        }

        debug!(entries = paths.len(), collisions = collisions.len(), "path index built");

        Self {
            language: content.language.clone(),
            paths,
            collisions,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, id: EntityId) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    pub fn collisions(&self) -> &[PathCollision] {
        &self.collisions
    }
}

// ---------------------------------------------------------------------------
// Per-language graph
// ---------------------------------------------------------------------------

/// Tree and path index of one language, built together.
#[derive(Debug)]
pub struct LanguageGraph<'a> {
    pub content: &'a LanguageContent,
    pub tree: ContentTree<'a>,
    pub scheme: PathScheme,
    pub paths: PathIndex,
}

impl<'a> LanguageGraph<'a> {
    pub fn build(content: &'a LanguageContent, scheme: PathScheme) -> Self {
        let tree = ContentTree::build(content);
        let paths = PathIndex::build(content, &scheme);
        Self {
            content,
            tree,
            scheme,
            paths,
        }
    }

    pub fn language(&self) -> &str {
        &self.content.language
    }
}

// ---------------------------------------------------------------------------
// Attachment index
// ---------------------------------------------------------------------------

/// Downloadable (non-inline) attachments per language and article.
#[derive(Debug, Clone, Default)]
pub struct AttachmentIndex {
    by_language: HashMap<String, HashMap<EntityId, Vec<Attachment>>>,
}

impl AttachmentIndex {
    /// Build the index once for all languages; fetch order is preserved.
    pub fn build<'c>(contents: impl IntoIterator<Item = &'c LanguageContent>) -> Self {
        let mut by_language: HashMap<String, HashMap<EntityId, Vec<Attachment>>> = HashMap::new();
        for content in contents {
            let articles = by_language.entry(content.language.clone()).or_default();
            for attachment in content.attachments.iter().filter(|a| !a.inline) {
                articles
                    .entry(attachment.article_id)
                    .or_default()
                    .push(attachment.clone());
            }
        }
        Self { by_language }
    }

    /// Downloads of one article; empty when it has none.
    pub fn downloads(&self, language: &str, article_id: EntityId) -> &[Attachment] {
        self.by_language
            .get(language)
            .and_then(|m| m.get(&article_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn category(id: EntityId, name: &str, position: i64) -> Category {
        Category {
            id,
            name: name.into(),
            position: Position::Number(position),
        }
    }

    pub(crate) fn section(id: EntityId, name: &str, position: i64, category_id: EntityId) -> Section {
        Section {
            id,
            name: name.into(),
            position: Position::Number(position),
            category_id,
        }
    }

    pub(crate) fn article(id: EntityId, name: &str, position: i64, section_id: EntityId) -> Article {
        Article {
            id,
            name: name.into(),
            title: name.into(),
            position: Position::Number(position),
            section_id,
            body: format!("<p>{name}</p>"),
            updated_at: "2021-01-01T10:00:00Z".into(),
        }
    }

    pub(crate) fn attachment(article_id: EntityId, file_name: &str, inline: bool) -> Attachment {
        Attachment {
            id: None,
            article_id,
            file_name: file_name.into(),
            content_url: format!(
                "https://support.eblocker.com/hc/article_attachments/9/{file_name}"
            ),
            inline,
            content_type: None,
        }
    }

    pub(crate) fn sample_content(language: &str) -> LanguageContent {
        LanguageContent {
            language: language.into(),
            categories: vec![
                category(1, "Third", 3),
                category(2, "First", 1),
                category(3, "Second", 2),
            ],
            sections: vec![
                section(10, "Setup", 0, 2),
                section(11, "Network", 1, 3),
                section(12, "Releases", 0, 1),
            ],
            articles: vec![
                article(100, "Install eBlocker", 2, 10),
                article(101, "Fritzbox 7490 - The WiFi is very slow.", 1, 10),
                article(102, "IPv6", 0, 11),
                article(103, "Release 2.0", 0, 12),
            ],
            attachments: vec![
                attachment(100, "manual.pdf", false),
                attachment(100, "screenshot.png", true),
                attachment(100, "checklist.pdf", false),
            ],
        }
    }

    fn scheme() -> PathScheme {
        PathScheme::new("/docs/category", "/docs/tag", "/docs")
    }

    #[test]
    fn categories_sorted_by_position() {
        let content = sample_content("en");
        let tree = ContentTree::build(&content);
        let ids: Vec<_> = tree.categories.iter().map(|c| c.category.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn articles_sorted_within_section() {
        let content = sample_content("en");
        let tree = ContentTree::build(&content);
        let setup = &tree.categories[0].sections[0];
        assert_eq!(setup.section.id, 10);
        let ids: Vec<_> = setup.articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![101, 100]);
    }

    #[test]
    fn equal_positions_keep_fetch_order() {
        let content = LanguageContent {
            language: "en".into(),
            categories: vec![category(5, "B", 1), category(4, "A", 1), category(6, "C", 0)],
            ..Default::default()
        };
        let tree = ContentTree::build(&content);
        let ids: Vec<_> = tree.categories.iter().map(|c| c.category.id).collect();
        assert_eq!(ids, vec![6, 5, 4]);
    }

    #[test]
    fn missing_position_ranks_as_zero() {
        let mut content = LanguageContent {
            language: "en".into(),
            categories: vec![category(1, "One", 1), category(2, "Two", -1)],
            ..Default::default()
        };
        content.categories.push(Category {
            id: 3,
            name: "No position".into(),
            position: Position::default(),
        });
        content.categories.push(Category {
            id: 4,
            name: "Text position".into(),
            position: Position::Text("2".into()),
        });
        let tree = ContentTree::build(&content);
        let ids: Vec<_> = tree.categories.iter().map(|c| c.category.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }

    #[test]
    fn orphans_are_not_reachable() {
        let mut content = sample_content("en");
        content.sections.push(section(99, "Orphan section", 0, 12345));
        content.articles.push(article(999, "Orphan article", 0, 54321));
        let tree = ContentTree::build(&content);

        let reachable: Vec<_> = tree.articles().map(|(_, _, a)| a.id).collect();
        assert!(!reachable.contains(&999));
        assert!(
            tree.categories
                .iter()
                .flat_map(|c| &c.sections)
                .all(|s| s.section.id != 99)
        );
        assert_eq!(reachable, vec![101, 100, 102, 103]);
    }

    #[test]
    fn path_index_covers_every_entity() {
        let content = sample_content("en");
        let index = PathIndex::build(&content, &scheme());
        for id in [1, 2, 3, 10, 11, 12, 100, 101, 102, 103] {
            assert!(index.get(id).is_some(), "no path for {id}");
        }
        assert_eq!(index.get(2), Some("/docs/category/first"));
        assert_eq!(index.get(10), Some("/docs/tag/setup"));
        assert_eq!(
            index.get(101),
            Some("/docs/fritzbox-7490-the-wifi-is-very-slow")
        );
        assert!(index.collisions().is_empty());
    }

    #[test]
    fn path_index_is_per_language() {
        let en = sample_content("en");
        let mut de = sample_content("de");
        de.articles[0].name = "eBlocker installieren".into();

        let en_index = PathIndex::build(&en, &PathScheme::permalinks(&PermalinkConfig::default(), "en"));
        let de_index = PathIndex::build(&de, &PathScheme::permalinks(&PermalinkConfig::default(), "de"));

        assert_eq!(en_index.language(), "en");
        assert_eq!(en_index.get(100), Some("/en/docs/install-eblocker"));
        assert_eq!(de_index.get(100), Some("/de/docs/eblocker-installieren"));
    }

    #[test]
    fn slug_collisions_are_reported() {
        let content = LanguageContent {
            language: "en".into(),
            articles: vec![article(1, "Hello, World", 0, 1), article(2, "hello world!", 0, 1)],
            ..Default::default()
        };
        let index = PathIndex::build(&content, &scheme());
        assert_eq!(index.get(1), index.get(2));
        assert_eq!(
            index.collisions(),
            &[PathCollision {
                path: "/docs/hello-world".into(),
                first: 1,
                second: 2,
            }]
        );
    }

    #[test]
    fn attachment_index_skips_inline_and_keeps_order() {
        let en = sample_content("en");
        let mut de = sample_content("de");
        de.attachments.clear();

        let index = AttachmentIndex::build([&en, &de]);
        let names: Vec<_> = index
            .downloads("en", 100)
            .iter()
            .map(|a| a.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["manual.pdf", "checklist.pdf"]);
        assert!(index.downloads("de", 100).is_empty());
        assert!(index.downloads("en", 101).is_empty());
        assert!(index.downloads("fr", 100).is_empty());
    }
}
