//! Help-center API fetcher and raw JSON cache.
//!
//! This crate provides:
//! - [`Fetcher`]: downloads paginated collections per language, following
//!   `next_page` cursors and skipping pages that are already on disk
//! - [`cache`]: the cache layout and loaders consumed by the export stage

pub mod cache;

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use hcexport_shared::{
    Article, EntityKind, FetchConfig, HelpCenterError, LanguageConfig, Result,
};

pub use cache::{CacheLayout, load_language};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("hcexport/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchSummary
// ---------------------------------------------------------------------------

/// Counters of a completed fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Pages downloaded from the API.
    pub pages_fetched: usize,
    /// Pages already present in the cache.
    pub pages_cached: usize,
    /// Attachment binaries downloaded.
    pub files_fetched: usize,
}

impl FetchSummary {
    fn absorb(&mut self, other: &FetchSummary) {
        self.pages_fetched += other.pages_fetched;
        self.pages_cached += other.pages_cached;
        self.files_fetched += other.files_fetched;
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Sequential fetcher that mirrors the help-center API into the cache.
pub struct Fetcher {
    config: FetchConfig,
    client: Client,
    layout: CacheLayout,
}

impl Fetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HelpCenterError::Network(format!("failed to build HTTP client: {e}")))?;

        let layout = CacheLayout::new(&config.cache_dir);

        Ok(Self {
            config,
            client,
            layout,
        })
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Fetch every configured language.
    #[instrument(skip_all, fields(api_base = %self.config.api_base))]
    pub async fn fetch_all(&self) -> Result<FetchSummary> {
        let mut summary = FetchSummary::default();
        for language in &self.config.languages {
            let lang_summary = self.fetch_language(language).await?;
            summary.absorb(&lang_summary);
        }

        info!(
            pages_fetched = summary.pages_fetched,
            pages_cached = summary.pages_cached,
            files_fetched = summary.files_fetched,
            "fetch complete"
        );
        Ok(summary)
    }

    /// Fetch categories, sections, articles and their attachments for one language.
    #[instrument(skip_all, fields(language = %language.code, locale = %language.locale))]
    pub async fn fetch_language(&self, language: &LanguageConfig) -> Result<FetchSummary> {
        let mut summary = FetchSummary::default();

        for kind in [EntityKind::Category, EntityKind::Section, EntityKind::Article] {
            let url = self.collection_url(&language.locale, kind.collection());
            let dir = self.layout.collection_dir(&language.code, kind);
            let s = self.fetch_collection(&url, &dir).await?;
            summary.absorb(&s);
        }

        let articles: Vec<Article> = cache::read_collection(
            &self.layout.collection_dir(&language.code, EntityKind::Article),
            EntityKind::Article.collection(),
        )?
        .unwrap_or_default();

        for article in &articles {
            let url = self.collection_url(
                &language.locale,
                &format!("articles/{}/attachments", article.id),
            );
            let dir = self.layout.article_attachments_dir(&language.code, article.id);
            let s = self.fetch_collection(&url, &dir).await?;
            summary.absorb(&s);

            let attachments = cache::read_collection::<hcexport_shared::Attachment>(
                &dir,
                cache::ATTACHMENTS_KEY,
            )?
            .unwrap_or_default();
            for attachment in &attachments {
                if self.fetch_file(&attachment.content_url, &self.layout.attachment_file(attachment)).await? {
                    summary.files_fetched += 1;
                }
            }
        }

        debug!(
            articles = articles.len(),
            pages_fetched = summary.pages_fetched,
            "language fetched"
        );
        Ok(summary)
    }

    /// Walk a paginated collection starting at `first_url`.
    ///
    /// Each page lands in `dir/page-<n>.json`. A page already on disk is not
    /// re-requested; its cached `next_page` cursor drives the walk instead.
    async fn fetch_collection(&self, first_url: &str, dir: &Path) -> Result<FetchSummary> {
        let mut summary = FetchSummary::default();
        let mut url = Some(first_url.to_string());
        let mut n = 1;

        while let Some(current) = url {
            let path = cache::page_file(dir, n);
            let page = if path.exists() {
                debug!(path = %path.display(), "page cached, skipping request");
                summary.pages_cached += 1;
                cache::read_page(&path)?
            } else {
                let body = self.get_text(&current).await?;
                let page: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| HelpCenterError::parse(format!("{current}: {e}")))?;
                write_atomic(&path, body.as_bytes())?;
                summary.pages_fetched += 1;
                page
            };

            url = cache::next_page(&page).map(String::from);
            n += 1;
        }

        Ok(summary)
    }

    /// Download a binary unless it is already cached. Returns whether a request was made.
    async fn fetch_file(&self, url: &str, target: &Path) -> Result<bool> {
        if target.exists() {
            return Ok(false);
        }

        let response = self.send(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HelpCenterError::Network(format!("{url}: failed to read body: {e}")))?;
        write_atomic(target, &bytes)?;
        debug!(url, path = %target.display(), size = bytes.len(), "attachment downloaded");
        Ok(true)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "fetching page");
        self.send(url)
            .await?
            .text()
            .await
            .map_err(|e| HelpCenterError::Network(format!("{url}: failed to read body: {e}")))
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_redirect() {
                warn!(url, "redirect limit exceeded");
                HelpCenterError::TooManyRedirects {
                    url: url.to_string(),
                }
            } else {
                HelpCenterError::Network(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HelpCenterError::Network(format!("{url}: HTTP {status}")));
        }
        Ok(response)
    }

    fn collection_url(&self, locale: &str, resource: &str) -> String {
        format!(
            "{}/api/v2/help_center/{locale}/{resource}.json?per_page={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.per_page
        )
    }
}

/// Write to a temp file next to `path`, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HelpCenterError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| HelpCenterError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| HelpCenterError::io(path, e))?;
    Ok(())
}
