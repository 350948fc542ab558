//! Static, cross-linked HTML site renderer.
//!
//! Output layout:
//! ```text
//! <output>/
//! ├── index.html              language chooser
//! ├── style.css
//! ├── <lang>/index.html       category listing
//! ├── <lang>/<id>.html        category, section and article pages
//! └── attachments/<articleID>-<file_name>
//! ```
//!
//! Pages are emitted in a depth-first pre-order walk. The breadcrumb trail is
//! passed down by value, so siblings never see each other's state.

use std::fmt::Write;
use std::path::Path;

use quick_xml::escape::escape;
use tracing::{debug, info, instrument, warn};

use hcexport_fetcher::CacheLayout;
use hcexport_shared::translations::{ATTACHMENTS, LANGUAGE_NAME, SITE_TITLE, UPDATED};
use hcexport_shared::{Article, HelpCenterError, Result, Translations};

use crate::graph::{AttachmentIndex, CategoryNode, LanguageGraph, SectionNode};
use crate::rewrite::{LinkRewriter, RewriteMode};
use crate::wordpress::format_timestamp;

/// Stylesheet written next to the root index.
const STYLESHEET: &str = include_str!("../assets/style.css");

/// Read-only collaborators shared by every page.
pub struct SiteContext<'a> {
    pub translations: &'a Translations,
    pub attachments: &'a AttachmentIndex,
    pub rewriter: &'a LinkRewriter,
    pub cache: &'a CacheLayout,
    /// Origin prepended to permalinks for meta-refresh redirects.
    pub redirect_base: &'a str,
    /// Languages whose pages never redirect.
    pub redirect_exempt: &'a [String],
}

/// Counters of a completed site render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSummary {
    pub pages: usize,
    pub attachments_copied: usize,
    pub attachments_missing: usize,
}

/// One breadcrumb: display name and href relative to the language directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Crumb {
    title: String,
    href: String,
}

impl Crumb {
    fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// Render every language into `output_dir`.
#[instrument(skip_all, fields(output = %output_dir.display(), languages = graphs.len()))]
pub fn render_site(
    output_dir: &Path,
    ctx: &SiteContext<'_>,
    graphs: &[LanguageGraph<'_>],
) -> Result<SiteSummary> {
    let mut writer = SiteWriter {
        ctx,
        output_dir,
        languages: graphs.iter().map(|g| g.language()).collect(),
        summary: SiteSummary::default(),
    };

    writer.write_file("style.css", STYLESHEET.as_bytes())?;
    writer.render_root()?;

    for graph in graphs {
        writer.render_language(graph)?;
        writer.copy_attachments(graph)?;
    }

    info!(
        pages = writer.summary.pages,
        attachments = writer.summary.attachments_copied,
        missing = writer.summary.attachments_missing,
        "site rendered"
    );
    Ok(writer.summary)
}

struct SiteWriter<'w> {
    ctx: &'w SiteContext<'w>,
    output_dir: &'w Path,
    languages: Vec<&'w str>,
    summary: SiteSummary,
}

impl SiteWriter<'_> {
    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    fn render_root(&mut self) -> Result<()> {
        let Some(&first) = self.languages.first() else {
            return Err(HelpCenterError::validation("no languages to render"));
        };
        let t = self.ctx.translations;

        let mut main = String::new();
        let _ = writeln!(main, "<h1>{}</h1>", escape(t.get(first, SITE_TITLE)?));
        main.push_str("<ul class=\"languages\">\n");
        for &lang in &self.languages {
            let _ = writeln!(
                main,
                "<li><a href=\"{lang}/index.html\">{}</a></li>",
                escape(t.get(lang, LANGUAGE_NAME)?)
            );
        }
        main.push_str("</ul>\n");

        let html = skeleton(first, t.get(first, SITE_TITLE)?, "", None, &main);
        self.write_page("index.html", &html)
    }

    fn render_language(&mut self, graph: &LanguageGraph<'_>) -> Result<()> {
        let lang = graph.language();
        let t = self.ctx.translations;
        let title = t.get(lang, SITE_TITLE)?;
        let crumbs = vec![Crumb::new(title, "index.html")];

        let items: Vec<(String, String)> = graph
            .tree
            .categories
            .iter()
            .map(|c| (format!("{}.html", c.category.id), c.category.name.clone()))
            .collect();
        let main = listing(title, &items);
        let redirect = self.redirect(lang, Some(graph.scheme.home()));
        self.emit(lang, "index.html", title, &crumbs, &main, redirect)?;

        for node in &graph.tree.categories {
            self.render_category(graph, node, &crumbs)?;
        }
        debug!(language = lang, "language rendered");
        Ok(())
    }

    fn render_category(
        &mut self,
        graph: &LanguageGraph<'_>,
        node: &CategoryNode<'_>,
        parent_crumbs: &[Crumb],
    ) -> Result<()> {
        let category = node.category;
        let file = format!("{}.html", category.id);
        let crumbs = with_crumb(parent_crumbs, &category.name, &file);

        let items: Vec<(String, String)> = node
            .sections
            .iter()
            .map(|s| (format!("{}.html", s.section.id), s.section.name.clone()))
            .collect();
        let main = listing(&category.name, &items);
        let redirect = self.redirect(graph.language(), graph.paths.get(category.id));
        self.emit(graph.language(), &file, &category.name, &crumbs, &main, redirect)?;

        for section in &node.sections {
            self.render_section(graph, section, &crumbs)?;
        }
        Ok(())
    }

    fn render_section(
        &mut self,
        graph: &LanguageGraph<'_>,
        node: &SectionNode<'_>,
        parent_crumbs: &[Crumb],
    ) -> Result<()> {
        let section = node.section;
        let file = format!("{}.html", section.id);
        let crumbs = with_crumb(parent_crumbs, &section.name, &file);

        let items: Vec<(String, String)> = node
            .articles
            .iter()
            .map(|a| (format!("{}.html", a.id), a.display_title().to_string()))
            .collect();
        let main = listing(&section.name, &items);
        let redirect = self.redirect(graph.language(), graph.paths.get(section.id));
        self.emit(graph.language(), &file, &section.name, &crumbs, &main, redirect)?;

        for article in &node.articles {
            self.render_article(graph, article, &crumbs)?;
        }
        Ok(())
    }

    fn render_article(
        &mut self,
        graph: &LanguageGraph<'_>,
        article: &Article,
        parent_crumbs: &[Crumb],
    ) -> Result<()> {
        let lang = graph.language();
        let t = self.ctx.translations;
        let title = article.display_title();
        let file = format!("{}.html", article.id);
        let crumbs = with_crumb(parent_crumbs, title, &file);

        let body = self
            .ctx
            .rewriter
            .rewrite_body(&article.body, article.id, RewriteMode::Site)?;

        let mut main = String::with_capacity(body.len() + 512);
        let _ = writeln!(main, "<h1>{}</h1>", escape(title));
        if !article.updated_at.is_empty() {
            let _ = writeln!(
                main,
                "<p class=\"updated\">{}: {}</p>",
                escape(t.get(lang, UPDATED)?),
                escape(&format_timestamp(&article.updated_at))
            );
        }
        main.push_str("<div class=\"article-body\">\n");
        main.push_str(&body);
        main.push_str("\n</div>\n");

        let downloads = self.ctx.attachments.downloads(lang, article.id);
        if !downloads.is_empty() {
            main.push_str("<section class=\"attachments\">\n");
            let _ = writeln!(main, "<h2>{}</h2>", escape(t.get(lang, ATTACHMENTS)?));
            main.push_str("<ul>\n");
            for attachment in downloads {
                let _ = writeln!(
                    main,
                    "<li><a href=\"../attachments/{}\">{}</a></li>",
                    escape(&attachment.local_name()),
                    escape(&attachment.file_name)
                );
            }
            main.push_str("</ul>\n</section>\n");
        }

        let redirect = self.redirect(lang, graph.paths.get(article.id));
        self.emit(lang, &file, title, &crumbs, &main, redirect)
    }

    // -----------------------------------------------------------------------
    // Page assembly
    // -----------------------------------------------------------------------

    /// Wrap `main` with the translation bar and breadcrumbs and write it.
    fn emit(
        &mut self,
        lang: &str,
        file: &str,
        title: &str,
        crumbs: &[Crumb],
        main: &str,
        redirect: Option<String>,
    ) -> Result<()> {
        let rel_path = format!("{lang}/{file}");
        let depth = depth_prefix(&rel_path);

        let mut inner = String::with_capacity(main.len() + 1024);
        inner.push_str("<nav class=\"translations\">\n");
        for &other in &self.languages {
            let name = escape(self.ctx.translations.get(other, LANGUAGE_NAME)?);
            if other == lang {
                let _ = writeln!(inner, "<span>{name}</span>");
            } else {
                let _ = writeln!(
                    inner,
                    "<a href=\"{depth}{}\">{name}</a>",
                    switch_language(&rel_path, lang, other)
                );
            }
        }
        inner.push_str("</nav>\n");

        inner.push_str("<nav class=\"breadcrumbs\">\n<ol>\n");
        for crumb in crumbs {
            let _ = writeln!(
                inner,
                "<li><a href=\"{}\">{}</a></li>",
                escape(&crumb.href),
                escape(&crumb.title)
            );
        }
        inner.push_str("</ol>\n</nav>\n");

        inner.push_str("<main>\n");
        inner.push_str(main);
        inner.push_str("</main>\n");

        let html = skeleton(lang, title, &depth, redirect.as_deref(), &inner);
        self.write_page(&rel_path, &html)
    }

    /// External canonical location of a page, unless the language is exempt.
    fn redirect(&self, lang: &str, permalink: Option<&str>) -> Option<String> {
        if self.ctx.redirect_exempt.iter().any(|l| l == lang) {
            return None;
        }
        permalink.map(|p| format!("{}{p}", self.ctx.redirect_base.trim_end_matches('/')))
    }

    fn write_page(&mut self, rel_path: &str, html: &str) -> Result<()> {
        self.write_file(rel_path, html.as_bytes())?;
        self.summary.pages += 1;
        Ok(())
    }

    fn write_file(&self, rel_path: &str, bytes: &[u8]) -> Result<()> {
        let path = self.output_dir.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HelpCenterError::io(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| HelpCenterError::io(&path, e))?;
        debug!(path = %path.display(), "wrote file");
        Ok(())
    }

    /// Copy every cached attachment binary of a language into `attachments/`.
    fn copy_attachments(&mut self, graph: &LanguageGraph<'_>) -> Result<()> {
        let dir = self.output_dir.join("attachments");
        for attachment in &graph.content.attachments {
            let source = self.ctx.cache.attachment_file(attachment);
            if !source.exists() {
                warn!(
                    article_id = attachment.article_id,
                    file = %attachment.file_name,
                    "attachment not in cache, link will be dangling"
                );
                self.summary.attachments_missing += 1;
                continue;
            }
            std::fs::create_dir_all(&dir).map_err(|e| HelpCenterError::io(&dir, e))?;
            let target = dir.join(attachment.local_name());
            std::fs::copy(&source, &target).map_err(|e| HelpCenterError::io(&target, e))?;
            self.summary.attachments_copied += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The fixed page skeleton shared by every page.
fn skeleton(lang: &str, title: &str, depth: &str, redirect: Option<&str>, body: &str) -> String {
    let mut html = String::with_capacity(body.len() + 512);
    html.push_str("<!DOCTYPE html>\n");
    let _ = writeln!(html, "<html lang=\"{}\">", escape(lang));
    html.push_str("<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{depth}style.css\">");
    if let Some(url) = redirect {
        let _ = writeln!(
            html,
            "<meta http-equiv=\"refresh\" content=\"0; url={}\">",
            escape(url)
        );
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(body);
    html.push_str("</body>\n</html>\n");
    html
}

/// `<h1>` plus a link list of `(href, label)` pairs.
fn listing(heading: &str, items: &[(String, String)]) -> String {
    let mut main = String::new();
    let _ = writeln!(main, "<h1>{}</h1>", escape(heading));
    main.push_str("<ul>\n");
    for (href, label) in items {
        let _ = writeln!(
            main,
            "<li><a href=\"{}\">{}</a></li>",
            escape(href),
            escape(label)
        );
    }
    main.push_str("</ul>\n");
    main
}

fn with_crumb(parent: &[Crumb], title: &str, href: &str) -> Vec<Crumb> {
    let mut crumbs = parent.to_vec();
    crumbs.push(Crumb::new(title, href));
    crumbs
}

/// `../` once per directory level of a path relative to the site root.
fn depth_prefix(rel_path: &str) -> String {
    "../".repeat(rel_path.matches('/').count())
}

/// Swap the leading language segment of a root-relative path.
fn switch_language(rel_path: &str, from: &str, to: &str) -> String {
    match rel_path.strip_prefix(&format!("{from}/")) {
        Some(rest) => format!("{to}/{rest}"),
        None => rel_path.to_string(),
    }
}
