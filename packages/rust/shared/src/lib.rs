//! Shared types, error model, and configuration for hcexport.
//!
//! This crate is the foundation depended on by all other hcexport crates.
//! It provides:
//! - [`HelpCenterError`]: the unified error type
//! - Help-center entities ([`Category`], [`Section`], [`Article`], [`Attachment`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)
//! - UI strings ([`Translations`])

pub mod config;
pub mod error;
pub mod translations;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, LanguageConfig, PathsConfig, PermalinkConfig, SiteConfig,
    SourceConfig, WordPressConfig, config_dir, config_file_path, load_config, load_config_from,
};
pub use error::{HelpCenterError, Result};
pub use translations::Translations;
pub use types::{
    Article, Attachment, Category, EntityId, EntityKind, LanguageContent, Position, Section,
    safe_file_name,
};
