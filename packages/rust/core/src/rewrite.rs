//! In-body link rewriting.
//!
//! Every `href`/`src` in an article body is classified by an ordered rule list
//! into a [`LinkTarget`], then resolved against the export mode. Only links on
//! the help center's own hosts are ever rewritten.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};
use url::Url;

use hcexport_shared::{EntityId, EntityKind, HelpCenterError, Result, safe_file_name};

use crate::graph::PathIndex;

/// `href="..."`, `src='...'` and friends.
static LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// What a help-center URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A file served from `/hc/article_attachments/<id>/<file_name>`.
    Attachment {
        article_id: EntityId,
        file_name: String,
    },
    /// Another category, section or article, optionally with a `#fragment`.
    CrossLink {
        kind: EntityKind,
        id: EntityId,
        fragment: Option<String>,
    },
    /// Anything else; emitted unchanged.
    Passthrough { url: String },
}

/// Where resolved links must point.
#[derive(Debug, Clone, Copy)]
pub enum RewriteMode<'a> {
    /// Static site: pages are `<id>.html`, attachments live in `../attachments/`.
    Site,
    /// WordPress import: permalinks from the language's path index, files in the uploads bucket.
    WordPress {
        uploads_base: &'a str,
        paths: &'a PathIndex,
    },
}

type RuleFn = fn(&Captures<'_>, EntityId) -> Option<LinkTarget>;

/// A URL-path pattern and the target it produces.
struct Rule {
    name: &'static str,
    pattern: Regex,
    build: RuleFn,
}

/// Classifies and rewrites links for a fixed set of source hosts.
pub struct LinkRewriter {
    hosts: Vec<String>,
    rules: Vec<Rule>,
}

impl LinkRewriter {
    /// Create a rewriter for links on the given hosts.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Attachments live under /hc/ too, so they must be tried first.
        let rules = vec![
            Rule {
                name: "attachment",
                pattern: Regex::new(r"^/hc/(?:[^/]+/)?article_attachments/\d+/([^/]+)$")
                    .expect("valid regex"),
                build: |caps, article_id| {
                    Some(LinkTarget::Attachment {
                        article_id,
                        file_name: safe_file_name(&caps[1]),
                    })
                },
            },
            Rule {
                name: "cross-link",
                pattern: Regex::new(
                    r"^/hc/[^/]+/(articles|categories|sections)/(\d+)(?:-[^/]*)?/?$",
                )
                .expect("valid regex"),
                build: |caps, _| {
                    let kind = EntityKind::from_url_segment(&caps[1])?;
                    let id = caps[2].parse().ok()?;
                    Some(LinkTarget::CrossLink {
                        kind,
                        id,
                        fragment: None,
                    })
                },
            },
        ];

        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
            rules,
        }
    }

    /// Classify a single URL found in the body of `article_id`.
    pub fn classify(&self, url: &str, article_id: EntityId) -> LinkTarget {
        let passthrough = || LinkTarget::Passthrough {
            url: url.to_string(),
        };

        let Ok(parsed) = Url::parse(url) else {
            return passthrough();
        };
        let Some(host) = parsed.host_str() else {
            return passthrough();
        };
        if !self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return passthrough();
        }

        let path = parsed.path();
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(path) {
                if let Some(mut target) = (rule.build)(&caps, article_id) {
                    if let LinkTarget::CrossLink { fragment, .. } = &mut target {
                        *fragment = parsed.fragment().map(String::from);
                    }
                    debug!(url, rule = rule.name, "link classified");
                    return target;
                }
            }
        }

        passthrough()
    }

    /// Rewrite one URL. Unresolvable WordPress cross-links are fatal.
    pub fn rewrite_url(&self, url: &str, article_id: EntityId, mode: RewriteMode<'_>) -> Result<String> {
        match self.classify(url, article_id) {
            LinkTarget::Attachment {
                article_id,
                file_name,
            } => Ok(match mode {
                RewriteMode::Site => format!("../attachments/{article_id}-{file_name}"),
                RewriteMode::WordPress { uploads_base, .. } => {
                    format!("{}/{article_id}-{file_name}", uploads_base.trim_end_matches('/'))
                }
            }),
            LinkTarget::CrossLink { kind, id, fragment } => {
                let anchor = fragment.map(|f| format!("#{f}")).unwrap_or_default();
                match mode {
                    RewriteMode::Site => Ok(format!("{id}.html{anchor}")),
                    RewriteMode::WordPress { paths, .. } => paths
                        .get(id)
                        .map(|path| format!("{path}{anchor}"))
                        .ok_or_else(|| {
                            warn!(%kind, id, url, language = paths.language(), "cross-link target unknown");
                            HelpCenterError::UnresolvedLink {
                                id,
                                url: url.to_string(),
                            }
                        }),
                }
            }
            LinkTarget::Passthrough { url } => {
                warn!(article_id, %url, "link left unchanged");
                Ok(url)
            }
        }
    }

    /// Rewrite every `href`/`src` attribute value in an article body.
    pub fn rewrite_body(&self, body: &str, article_id: EntityId, mode: RewriteMode<'_>) -> Result<String> {
        let mut out = String::with_capacity(body.len());
        let mut last = 0;

        for caps in LINK_ATTR.captures_iter(body) {
            let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            out.push_str(&body[last..value.start()]);
            out.push_str(&self.rewrite_url(value.as_str(), article_id, mode)?);
            last = value.end();
        }
        out.push_str(&body[last..]);

        Ok(out)
    }
}
