//! Application configuration for hcexport.
//!
//! Lookup order: an explicit `--config` path, `./hcexport.toml`, then
//! `~/.hcexport/hcexport.toml`. Missing files fall back to defaults that
//! reproduce the eBlocker help-center export.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HelpCenterError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "hcexport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".hcexport";

// ---------------------------------------------------------------------------
// Config structs (matching hcexport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Help-center API settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Exported languages, in translation-bar order.
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageConfig>,

    /// Cache and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Permalink namespace used for WordPress links and site redirects.
    #[serde(default)]
    pub permalinks: PermalinkConfig,

    /// Static site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// WordPress feed settings.
    #[serde(default)]
    pub wordpress: WordPressConfig,

    /// Per-language translation overrides (`[translations.de]`).
    #[serde(default)]
    pub translations: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            languages: default_languages(),
            paths: PathsConfig::default(),
            permalinks: PermalinkConfig::default(),
            site: SiteConfig::default(),
            wordpress: WordPressConfig::default(),
            translations: BTreeMap::new(),
        }
    }
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the help-center API (scheme + host).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Hosts whose in-body links are rewritten.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Items requested per API page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirects followed before a fetch is aborted.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            hosts: default_hosts(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_api_base() -> String {
    "https://eblocker.zendesk.com".into()
}
fn default_hosts() -> Vec<String> {
    vec!["support.eblocker.com".into(), "eblocker.zendesk.com".into()]
}
fn default_per_page() -> u32 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[[languages]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Short code used in output paths (`docs/<code>/`).
    pub code: String,
    /// Locale used in API requests (`/api/v2/help_center/<locale>/...`).
    pub locale: String,
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "de".into(),
            locale: "de".into(),
        },
        LanguageConfig {
            code: "en".into(),
            locale: "en-us".into(),
        },
    ]
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the raw JSON cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Root of the generated HTML site.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}

/// `[permalinks]` section. `{lang}` is replaced by the language code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermalinkConfig {
    #[serde(default = "default_category_prefix")]
    pub category_prefix: String,
    #[serde(default = "default_section_prefix")]
    pub section_prefix: String,
    #[serde(default = "default_article_prefix")]
    pub article_prefix: String,
}

impl Default for PermalinkConfig {
    fn default() -> Self {
        Self {
            category_prefix: default_category_prefix(),
            section_prefix: default_section_prefix(),
            article_prefix: default_article_prefix(),
        }
    }
}

fn default_category_prefix() -> String {
    "/{lang}/docs/category".into()
}
fn default_section_prefix() -> String {
    "/{lang}/docs/tag".into()
}
fn default_article_prefix() -> String {
    "/{lang}/docs".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin that permalinks are appended to for meta-refresh redirects.
    #[serde(default = "default_redirect_base")]
    pub redirect_base: String,

    /// Languages whose pages never redirect.
    #[serde(default = "default_redirect_exempt")]
    pub redirect_exempt: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            redirect_base: default_redirect_base(),
            redirect_exempt: default_redirect_exempt(),
        }
    }
}

fn default_redirect_base() -> String {
    "https://eblocker.org".into()
}
fn default_redirect_exempt() -> Vec<String> {
    vec!["de".into()]
}

/// `[wordpress]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    /// Language code exported to the feed.
    #[serde(default = "default_wp_language")]
    pub language: String,

    /// Upload bucket that attachment links are relocated to.
    #[serde(default = "default_uploads_base")]
    pub uploads_base: String,

    /// Feed template containing an `{{items}}` placeholder.
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Where the rendered feed is written.
    #[serde(default = "default_wp_output")]
    pub output: PathBuf,

    /// Number of top-level categories dropped from the start of the ordering.
    #[serde(default = "default_skip")]
    pub skip_leading: usize,

    /// Number of top-level categories dropped from the end of the ordering.
    #[serde(default = "default_skip")]
    pub skip_trailing: usize,

    /// Additional category IDs that are never exported.
    #[serde(default)]
    pub exclude_category_ids: Vec<u64>,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            language: default_wp_language(),
            uploads_base: default_uploads_base(),
            template: default_template(),
            output: default_wp_output(),
            skip_leading: default_skip(),
            skip_trailing: default_skip(),
            exclude_category_ids: Vec::new(),
        }
    }
}

fn default_wp_language() -> String {
    "en".into()
}
fn default_uploads_base() -> String {
    "https://eblocker.org/wp-content/uploads/docs".into()
}
fn default_template() -> PathBuf {
    PathBuf::from("templates/wordpress.xml")
}
fn default_wp_output() -> PathBuf {
    PathBuf::from("wordpress.xml")
}
fn default_skip() -> usize {
    1
}

impl AppConfig {
    /// Look up a configured language by its code.
    pub fn language(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|l| l.code == code)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(HelpCenterError::config("at least one language is required"));
        }

        let mut seen = HashSet::new();
        for lang in &self.languages {
            if !seen.insert(lang.code.as_str()) {
                return Err(HelpCenterError::config(format!(
                    "language '{}' is configured twice",
                    lang.code
                )));
            }
        }

        Url::parse(&self.source.api_base).map_err(|e| {
            HelpCenterError::config(format!("invalid source.api_base '{}': {e}", self.source.api_base))
        })?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, derived from the app config)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the help-center API.
    pub api_base: String,
    /// Languages to fetch.
    pub languages: Vec<LanguageConfig>,
    /// Cache root directory.
    pub cache_dir: PathBuf,
    /// Items requested per page.
    pub per_page: u32,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Redirect limit.
    pub max_redirects: usize,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_base: config.source.api_base.clone(),
            languages: config.languages.clone(),
            cache_dir: config.paths.cache_dir.clone(),
            per_page: config.source.per_page,
            timeout_secs: config.source.timeout_secs,
            max_redirects: config.source.max_redirects,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.hcexport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HelpCenterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.hcexport/hcexport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config, honouring an explicit path first.
///
/// Without an explicit path, `./hcexport.toml` wins over the user config.
/// Returns defaults if neither file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let user = config_file_path()?;
    if user.exists() {
        return load_config_from(&user);
    }

    tracing::debug!("no config file found, using defaults");
    let config = AppConfig::default();
    config.validate()?;
    Ok(config)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HelpCenterError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        HelpCenterError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.languages.len(), 2);
        assert_eq!(config.languages[0].code, "de");
        assert_eq!(config.wordpress.skip_leading, 1);
        assert_eq!(config.wordpress.skip_trailing, 1);
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.source.hosts, config.source.hosts);
        assert_eq!(parsed.site.redirect_exempt, vec!["de".to_string()]);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
api_base = "https://help.example.com"

[[languages]]
code = "en"
locale = "en-us"

[wordpress]
skip_leading = 0
exclude_category_ids = [42]

[translations.en]
site_title = "Example Help"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.languages.len(), 1);
        assert_eq!(config.source.max_redirects, 5);
        assert_eq!(config.wordpress.skip_leading, 0);
        assert_eq!(config.wordpress.skip_trailing, 1);
        assert_eq!(config.wordpress.exclude_category_ids, vec![42]);
        assert_eq!(config.translations["en"]["site_title"], "Example Help");
    }

    #[test]
    fn duplicate_language_rejected() {
        let mut config = AppConfig::default();
        config.languages.push(LanguageConfig {
            code: "de".into(),
            locale: "de-ch".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn site_only_config_need_not_list_the_wordpress_language() {
        let toml_str = r#"
[[languages]]
code = "de"
locale = "de"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.wordpress.language, "en");
        config.validate().expect("valid without an 'en' language");
        assert!(config.language(&config.wordpress.language).is_none());
    }

    #[test]
    fn load_config_from_accepts_single_language_file() {
        let dir = std::env::temp_dir().join(format!("hc-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hcexport.toml");
        std::fs::write(&path, "[[languages]]\ncode = \"de\"\nlocale = \"de\"\n").unwrap();

        let config = load_config_from(&path).expect("loads");
        assert_eq!(config.languages.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.per_page, 100);
        assert_eq!(fetch.max_redirects, 5);
        assert_eq!(fetch.cache_dir, PathBuf::from("data"));
        assert_eq!(fetch.languages[1].locale, "en-us");
    }
}
