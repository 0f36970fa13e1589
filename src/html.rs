//! Internal HTML queries used by the extraction engine.

use scraper::{Html, Node, Selector};

/// Elements whose content is never visible text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style"];

/// An `<a href>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub href: String,
    pub text: String,
}

/// The parts of an HTML body extraction needs: flattened text and anchors.
#[derive(Debug, Clone, Default)]
pub(crate) struct HtmlView {
    pub text: String,
    pub anchors: Vec<Anchor>,
}

impl HtmlView {
    pub(crate) fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            text: visible_text(&document),
            anchors: anchors(&document),
        }
    }
}

/// Joins every visible text node with a space, skipping script and style content.
fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

/// Lists anchors that carry an `href`, in document order.
fn anchors(document: &Html) -> Vec<Anchor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            let text = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(Anchor {
                href: href.to_string(),
                text,
            })
        })
        .collect()
}
