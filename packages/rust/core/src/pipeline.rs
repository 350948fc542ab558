//! End-to-end export pipeline: fetch → load cache → build graph → render.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use hcexport_fetcher::{CacheLayout, FetchSummary, Fetcher, load_language};
use hcexport_shared::{
    AppConfig, FetchConfig, HelpCenterError, LanguageConfig, LanguageContent, Result,
    Translations,
};

use crate::graph::{AttachmentIndex, LanguageGraph, PathScheme};
use crate::rewrite::LinkRewriter;
use crate::site::{SiteContext, render_site};
use crate::wordpress::render_feed;

/// Which artifact an export produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Cross-linked static HTML site for every configured language.
    #[default]
    Site,
    /// WordPress import feed for a single language.
    WordPress,
}

/// Per-run switches that are not part of the config file.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub mode: ExportMode,
    /// Render from the cache without contacting the API.
    pub offline: bool,
}

/// Result of [`run_export`].
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub mode: ExportMode,
    /// `None` when run offline.
    pub fetch: Option<FetchSummary>,
    pub languages: usize,
    /// Articles reachable from the rendered trees.
    pub articles: usize,
    /// Slug collisions across all rendered languages.
    pub collisions: usize,
    /// HTML pages written (site mode).
    pub pages: usize,
    /// Feed items written (WordPress mode).
    pub feed_items: usize,
    pub attachments_copied: usize,
    pub attachments_missing: usize,
    /// Output directory (site) or feed file (WordPress).
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl ExportSummary {
    fn new(mode: ExportMode, fetch: Option<FetchSummary>) -> Self {
        Self {
            mode,
            fetch,
            languages: 0,
            articles: 0,
            collisions: 0,
            pages: 0,
            feed_items: 0,
            attachments_copied: 0,
            attachments_missing: 0,
            output: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a language has been loaded from the cache.
    fn language_loaded(&self, language: &str, articles: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &ExportSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn language_loaded(&self, _language: &str, _articles: usize) {}
    fn done(&self, _summary: &ExportSummary) {}
}

/// Run a full export.
///
/// 1. Fetch the help center into the cache (skipped when offline)
/// 2. Load the languages the mode needs from the cache
/// 3. Build one content graph per language
/// 4. Render the site or the WordPress feed
#[instrument(skip_all, fields(mode = ?options.mode, offline = options.offline))]
pub async fn run_export(
    config: &AppConfig,
    options: &ExportOptions,
    progress: &dyn ProgressReporter,
) -> Result<ExportSummary> {
    let start = Instant::now();
    config.validate()?;

    // --- Phase 1: Fetch ---
    let fetch = if options.offline {
        info!(cache = %config.paths.cache_dir.display(), "offline, using cached data only");
        None
    } else {
        progress.phase("Fetching help center");
        let fetcher = Fetcher::new(FetchConfig::from(config))?;
        Some(fetcher.fetch_all().await?)
    };

    // --- Phase 2: Load ---
    progress.phase("Loading cache");
    let layout = CacheLayout::new(&config.paths.cache_dir);
    let mut contents: Vec<LanguageContent> = Vec::new();
    for language in languages_for(config, options.mode)? {
        let content = load_language(&layout, &language.code)?;
        progress.language_loaded(&language.code, content.articles.len());
        contents.push(content);
    }

    // --- Phase 3: Graph ---
    progress.phase("Building content graph");
    let graphs: Vec<LanguageGraph<'_>> = contents
        .iter()
        .map(|c| LanguageGraph::build(c, PathScheme::permalinks(&config.permalinks, &c.language)))
        .collect();

    let mut summary = ExportSummary::new(options.mode, fetch);
    summary.languages = graphs.len();
    summary.articles = graphs.iter().map(|g| g.tree.articles().count()).sum();
    summary.collisions = graphs.iter().map(|g| g.paths.collisions().len()).sum();
    if summary.collisions > 0 {
        warn!(collisions = summary.collisions, "distinct entities share permalinks");
    }

    let rewriter = LinkRewriter::new(config.source.hosts.iter().map(String::as_str));

    // --- Phase 4: Render ---
    match options.mode {
        ExportMode::Site => {
            progress.phase("Rendering site");
            let translations = Translations::from(config);
            let attachments = AttachmentIndex::build(&contents);
            let ctx = SiteContext {
                translations: &translations,
                attachments: &attachments,
                rewriter: &rewriter,
                cache: &layout,
                redirect_base: &config.site.redirect_base,
                redirect_exempt: &config.site.redirect_exempt,
            };
            let site = render_site(&config.paths.output_dir, &ctx, &graphs)?;
            summary.pages = site.pages;
            summary.attachments_copied = site.attachments_copied;
            summary.attachments_missing = site.attachments_missing;
            summary.output = config.paths.output_dir.clone();
        }
        ExportMode::WordPress => {
            progress.phase("Rendering WordPress feed");
            let wp = &config.wordpress;
            let graph = graphs.first().ok_or_else(|| {
                HelpCenterError::config(format!("wordpress language '{}' not loaded", wp.language))
            })?;
            let template = std::fs::read_to_string(&wp.template)
                .map_err(|e| HelpCenterError::io(&wp.template, e))?;
            let feed = render_feed(&template, graph, &rewriter, wp)?;

            if let Some(parent) = wp.output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| HelpCenterError::io(parent, e))?;
            }
            std::fs::write(&wp.output, feed.xml).map_err(|e| HelpCenterError::io(&wp.output, e))?;
            summary.feed_items = feed.items;
            summary.output = wp.output.clone();
        }
    }

    summary.elapsed = start.elapsed();
    info!(
        output = %summary.output.display(),
        articles = summary.articles,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "export complete"
    );
    progress.done(&summary);
    Ok(summary)
}

/// Site mode renders every language; WordPress only its configured one.
fn languages_for(config: &AppConfig, mode: ExportMode) -> Result<Vec<&LanguageConfig>> {
    match mode {
        ExportMode::Site => Ok(config.languages.iter().collect()),
        ExportMode::WordPress => {
            let code = &config.wordpress.language;
            config.language(code).map(|l| vec![l]).ok_or_else(|| {
                HelpCenterError::config(format!("wordpress language '{code}' is not configured"))
            })
        }
    }
}
