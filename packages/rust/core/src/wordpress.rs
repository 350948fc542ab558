//! WordPress (WXR) feed renderer.
//!
//! One language is flattened into a list of `<item>` elements which are
//! spliced into a caller-supplied template at [`ITEMS_PLACEHOLDER`].

use std::fmt::Write;

use chrono::DateTime;
use quick_xml::escape::escape;
use tracing::{debug, info, instrument, warn};

use hcexport_shared::{Article, HelpCenterError, Result, WordPressConfig};

use crate::graph::{CategoryNode, LanguageGraph, SectionNode};
use crate::rewrite::{LinkRewriter, RewriteMode};
use crate::slug::slugify;

/// Marker in the feed template replaced by the rendered items.
pub const ITEMS_PLACEHOLDER: &str = "{{items}}";

/// A rendered feed and the number of items in it.
#[derive(Debug, Clone)]
pub struct Feed {
    pub xml: String,
    pub items: usize,
}

/// `2021-01-01T10:00:00Z` → `2021-01-01 10:00:00`.
///
/// Purely textual: the first `T` becomes a space and one trailing `Z` is
/// dropped. Offsets and fractional seconds are kept as written.
pub fn format_timestamp(raw: &str) -> String {
    if DateTime::parse_from_rfc3339(raw).is_err() {
        warn!(timestamp = raw, "timestamp is not RFC 3339");
    }
    let spaced = raw.replacen('T', " ", 1);
    match spaced.strip_suffix('Z') {
        Some(trimmed) => trimmed.to_string(),
        None => spaced,
    }
}

/// Top-level categories that go into the feed, in display order.
///
/// The first `skip_leading` and last `skip_trailing` categories are dropped,
/// then any listed in `exclude_category_ids`.
pub fn exported_categories<'g, 'a>(
    graph: &'g LanguageGraph<'a>,
    config: &WordPressConfig,
) -> Vec<&'g CategoryNode<'a>> {
    let all = &graph.tree.categories;
    let end = all.len().saturating_sub(config.skip_trailing);
    let start = config.skip_leading.min(end);

    all[start..end]
        .iter()
        .filter(|node| {
            let excluded = config.exclude_category_ids.contains(&node.category.id);
            if excluded {
                debug!(id = node.category.id, name = %node.category.name, "category excluded from feed");
            }
            !excluded
        })
        .collect()
}

/// Render the feed for one language into `template`.
#[instrument(skip_all, fields(language = graph.language()))]
pub fn render_feed(
    template: &str,
    graph: &LanguageGraph<'_>,
    rewriter: &LinkRewriter,
    config: &WordPressConfig,
) -> Result<Feed> {
    if !template.contains(ITEMS_PLACEHOLDER) {
        return Err(HelpCenterError::validation(format!(
            "feed template has no {ITEMS_PLACEHOLDER} placeholder"
        )));
    }

    let mode = RewriteMode::WordPress {
        uploads_base: &config.uploads_base,
        paths: &graph.paths,
    };

    let mut items = String::new();
    let mut count = 0;
    for category in exported_categories(graph, config) {
        for section in &category.sections {
            for article in &section.articles {
                render_item(&mut items, graph, category, section, article, rewriter, mode)?;
                count += 1;
            }
        }
    }

    info!(items = count, "feed rendered");
    Ok(Feed {
        xml: template.replacen(ITEMS_PLACEHOLDER, items.trim_end(), 1),
        items: count,
    })
}

fn render_item(
    out: &mut String,
    graph: &LanguageGraph<'_>,
    category: &CategoryNode<'_>,
    section: &SectionNode<'_>,
    article: &Article,
    rewriter: &LinkRewriter,
    mode: RewriteMode<'_>,
) -> Result<()> {
    let body = rewriter.rewrite_body(&article.body, article.id, mode)?;
    let link = graph.paths.get(article.id).unwrap_or_default();

    out.push_str("<item>\n");
    let _ = writeln!(out, "  <title>{}</title>", escape(article.display_title()));
    let _ = writeln!(out, "  <link>{}</link>", escape(link));
    let _ = writeln!(
        out,
        "  <wp:post_date>{}</wp:post_date>",
        escape(&format_timestamp(&article.updated_at))
    );
    let _ = writeln!(out, "  <wp:post_name>{}</wp:post_name>", escape(&slugify(&article.name)));
    out.push_str("  <wp:status>publish</wp:status>\n");
    out.push_str("  <wp:post_type>post</wp:post_type>\n");
    let _ = writeln!(out, "  <content:encoded>{}</content:encoded>", cdata(&body));
    let _ = writeln!(
        out,
        "  <category domain=\"category\" nicename=\"{}\">{}</category>",
        escape(&slugify(&category.category.name)),
        cdata(&category.category.name)
    );
    let _ = writeln!(
        out,
        "  <category domain=\"post_tag\" nicename=\"{}\">{}</category>",
        escape(&slugify(&section.section.name)),
        cdata(&section.section.name)
    );
    out.push_str("</item>\n");
    Ok(())
}

/// Wrap text in a CDATA section, splitting any embedded terminator.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PathScheme;
    use crate::graph::tests::{article, sample_content};
    use hcexport_shared::{LanguageContent, PermalinkConfig};

    const TEMPLATE: &str = "<rss><channel>\n{{items}}\n</channel></rss>\n";

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new(["support.eblocker.com", "eblocker.zendesk.com"])
    }

    fn graph(content: &LanguageContent) -> LanguageGraph<'_> {
        LanguageGraph::build(
            content,
            PathScheme::permalinks(&PermalinkConfig::default(), &content.language),
        )
    }

    fn no_skip() -> WordPressConfig {
        WordPressConfig {
            skip_leading: 0,
            skip_trailing: 0,
            ..Default::default()
        }
    }

    fn item_titles(xml: &str) -> Vec<&str> {
        xml.lines()
            .filter_map(|l| l.trim().strip_prefix("<title>"))
            .filter_map(|l| l.strip_suffix("</title>"))
            .collect()
    }

    #[test]
    fn timestamp_formatting() {
        assert_eq!(format_timestamp("2021-01-01T10:00:00Z"), "2021-01-01 10:00:00");
        assert_eq!(format_timestamp("2021-01-01T10:00:00"), "2021-01-01 10:00:00");
    }

    #[test]
    fn timestamp_keeps_offset_and_fraction() {
        assert_eq!(format_timestamp("2021-01-01T10:00:00.5Z"), "2021-01-01 10:00:00.5");
        assert_eq!(
            format_timestamp("2021-01-01T12:00:00+02:00"),
            "2021-01-01 12:00:00+02:00"
        );
        assert_eq!(format_timestamp("2021-01-01T10:00:00ZZ"), "2021-01-01 10:00:00Z");
    }

    #[test]
    fn default_config_skips_first_and_last_category() {
        let content = sample_content("en");
        let graph = graph(&content);
        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &WordPressConfig::default()).unwrap();

        // categories in order: 2, 3, 1; only 3 ("Second") survives
        assert_eq!(feed.items, 1);
        assert_eq!(item_titles(&feed.xml), vec!["IPv6"]);
    }

    #[test]
    fn items_follow_tree_order() {
        let content = sample_content("en");
        let graph = graph(&content);
        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &no_skip()).unwrap();

        assert_eq!(
            item_titles(&feed.xml),
            vec![
                "Fritzbox 7490 - The WiFi is very slow.",
                "Install eBlocker",
                "IPv6",
                "Release 2.0"
            ]
        );
        assert!(feed.xml.starts_with("<rss><channel>\n<item>\n"));
        assert!(feed.xml.ends_with("</item>\n</channel></rss>\n"));
    }

    #[test]
    fn excluded_ids_are_dropped() {
        let content = sample_content("en");
        let graph = graph(&content);
        let config = WordPressConfig {
            exclude_category_ids: vec![2],
            ..no_skip()
        };
        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &config).unwrap();
        assert_eq!(item_titles(&feed.xml), vec!["IPv6", "Release 2.0"]);
    }

    #[test]
    fn oversized_skips_yield_an_empty_feed() {
        let content = sample_content("en");
        let graph = graph(&content);
        let config = WordPressConfig {
            skip_leading: 2,
            skip_trailing: 2,
            ..Default::default()
        };
        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &config).unwrap();
        assert_eq!(feed.items, 0);
        assert_eq!(feed.xml, "<rss><channel>\n\n</channel></rss>\n");
    }

    #[test]
    fn item_fields() {
        let mut content = sample_content("en");
        content.articles[1].body = concat!(
            r#"<p><a href="https://eblocker.zendesk.com/hc/en-us/articles/102">v6</a>"#,
            r#"<img src="https://support.eblocker.com/hc/article_attachments/7/router.png"></p>"#
        )
        .into();
        let graph = graph(&content);
        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &no_skip()).unwrap();
        let xml = &feed.xml;

        assert!(xml.contains("<link>/en/docs/fritzbox-7490-the-wifi-is-very-slow</link>"));
        assert!(xml.contains("<wp:post_date>2021-01-01 10:00:00</wp:post_date>"));
        assert!(xml.contains("<wp:post_name>fritzbox-7490-the-wifi-is-very-slow</wp:post_name>"));
        assert!(xml.contains(concat!(
            r#"<content:encoded><![CDATA[<p><a href="/en/docs/ipv6">v6</a>"#,
            r#"<img src="https://eblocker.org/wp-content/uploads/docs/101-router.png"></p>]]></content:encoded>"#
        )));
        assert!(xml.contains(r#"<category domain="category" nicename="first"><![CDATA[First]]></category>"#));
        assert!(xml.contains(r#"<category domain="post_tag" nicename="setup"><![CDATA[Setup]]></category>"#));
    }

    #[test]
    fn unresolved_cross_link_names_the_id() {
        let mut content = sample_content("en");
        content.articles[2].body =
            r#"<a href="https://eblocker.zendesk.com/hc/en-us/articles/555">gone</a>"#.into();
        let graph = graph(&content);

        let err = render_feed(TEMPLATE, &graph, &rewriter(), &no_skip()).unwrap_err();
        assert!(matches!(err, HelpCenterError::UnresolvedLink { id: 555, .. }));
        assert!(err.to_string().contains("555"));
    }

    #[test]
    fn links_into_skipped_categories_still_resolve() {
        let mut content = sample_content("en");
        content.articles[2].body =
            r#"<a href="https://eblocker.zendesk.com/hc/en-us/articles/103">release</a>"#.into();
        let graph = graph(&content);

        let feed = render_feed(TEMPLATE, &graph, &rewriter(), &WordPressConfig::default()).unwrap();
        assert!(feed.xml.contains(r#"<a href="/en/docs/release-2-0">release</a>"#));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let content = LanguageContent {
            language: "en".into(),
            articles: vec![article(1, "A", 0, 1)],
            ..Default::default()
        };
        let graph = graph(&content);
        let err = render_feed("<rss/>", &graph, &rewriter(), &no_skip()).unwrap_err();
        assert!(matches!(err, HelpCenterError::Validation { .. }));
    }

    #[test]
    fn cdata_terminator_is_split() {
        assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
    }
}
