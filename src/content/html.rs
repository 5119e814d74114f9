//! HTML loading
//!
//! Parses a page with `scraper`, locates the content root with a caller
//! supplied CSS selector and converts that subtree into a [`ContentTree`].

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{ContentTree, ElementKind, NodeId};
use crate::{Error, Result};

static DISPLAY_NONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*display\s*:\s*none\b").expect("valid display regex")
});

/// Map an HTML tag name to the role it plays in reading order
fn tag_to_kind(name: &str) -> ElementKind {
    match name {
        "table" => ElementKind::Table,
        "thead" | "tbody" | "tfoot" => ElementKind::TableSection,
        "tr" => ElementKind::TableRow,
        "td" | "th" => ElementKind::TableCell,

        "h1" => ElementKind::Heading(1),
        "h2" => ElementKind::Heading(2),
        "h3" => ElementKind::Heading(3),
        "h4" => ElementKind::Heading(4),
        "h5" => ElementKind::Heading(5),
        "h6" => ElementKind::Heading(6),

        "ul" | "ol" | "dl" | "menu" => ElementKind::List,
        "li" | "dt" | "dd" => ElementKind::ListItem,

        "p" | "caption" | "figcaption" | "pre" => ElementKind::Paragraph,
        "blockquote" => ElementKind::BlockQuote,

        "span" | "em" | "i" | "cite" | "var" | "dfn" | "strong" | "b" | "code" | "kbd"
        | "samp" | "tt" | "sup" | "sub" | "u" | "ins" | "s" | "strike" | "del" | "small"
        | "mark" | "abbr" | "time" | "q" | "a" | "label" | "output" | "data" | "ruby"
        | "rt" | "rp" | "bdi" | "bdo" | "wbr" | "img" | "font" | "big" => ElementKind::Inline,

        "script" | "style" | "noscript" | "template" | "head" | "title" | "meta" | "link"
        | "iframe" | "object" | "embed" | "svg" | "math" | "canvas" | "audio" | "video"
        | "select" | "textarea" | "button" | "input" => ElementKind::Skipped,

        _ => ElementKind::Container,
    }
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("hidden").is_some()
        || value
            .attr("style")
            .is_some_and(|style| DISPLAY_NONE.is_match(style))
}

impl ContentTree {
    /// Parse an HTML document and build a tree rooted at the first element
    /// matching `selector`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSelector` if the selector cannot be parsed and
    /// `ContentNotFound` if it matches nothing.
    pub fn from_html(html: &str, selector: &str) -> Result<Self> {
        let parsed = Selector::parse(selector)
            .map_err(|e| Error::InvalidSelector(format!("{selector}: {e}")))?;

        let document = Html::parse_document(html);
        let root = document
            .select(&parsed)
            .next()
            .ok_or_else(|| Error::ContentNotFound(selector.to_string()))?;

        let mut tree = Self::new(tag_to_kind(root.value().name()));
        let root_id = tree.root();
        tree.set_hidden(root_id, is_hidden(&root));
        tree.convert_children(root_id, root);

        tracing::debug!(selector, nodes = tree.len(), "loaded content tree from html");
        Ok(tree)
    }

    fn convert_children(&mut self, parent: NodeId, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let name = child_element.value().name();
                if name == "br" {
                    self.append_text(parent, "\n");
                    continue;
                }
                let id = self.append_element(parent, tag_to_kind(name));
                if is_hidden(&child_element) {
                    self.set_hidden(id, true);
                }
                self.convert_children(id, child_element);
            } else if let Some(text) = child.value().as_text() {
                self.append_text(parent, &**text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeKind;

    const PAGE: &str = r#"
        <html><head><title>t</title><style>p { color: red }</style></head>
        <body>
            <nav>Menu</nav>
            <article>
                <h1>Title</h1>
                <p>Hello <em>world</em></p>
                <div style="color: blue; display:none">gone</div>
                <p hidden>also gone</p>
            </article>
        </body></html>
    "#;

    #[test]
    fn selects_root_by_selector() {
        let tree = ContentTree::from_html(PAGE, "article").unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.element(), Some(ElementKind::Container));

        let kinds: Vec<_> = tree
            .children(tree.root())
            .iter()
            .filter_map(|&c| tree.node(c).and_then(|n| n.element()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Heading(1),
                ElementKind::Paragraph,
                ElementKind::Container,
                ElementKind::Paragraph,
            ]
        );
        assert!(!tree.text_content(tree.root()).contains("Menu"));
    }

    #[test]
    fn hidden_elements_are_flagged() {
        let tree = ContentTree::from_html(PAGE, "article").unwrap();
        let text = tree.text_content(tree.root());
        assert!(text.contains("Hello world"));
        assert!(!text.contains("gone"));
    }

    #[test]
    fn missing_root_is_content_not_found() {
        let err = ContentTree::from_html(PAGE, "main.story").unwrap_err();
        assert!(matches!(err, Error::ContentNotFound(ref s) if s == "main.story"));
    }

    #[test]
    fn bad_selector_is_rejected() {
        let err = ContentTree::from_html(PAGE, "p[[").unwrap_err();
        assert!(matches!(err, Error::InvalidSelector(_)));
    }

    #[test]
    fn line_breaks_become_whitespace() {
        let tree = ContentTree::from_html("<p>one<br>two</p>", "p").unwrap();
        assert_eq!(tree.text_content(tree.root()), "one\ntwo");
        let texts = tree
            .children(tree.root())
            .iter()
            .filter(|&&c| matches!(tree.node(c).map(|n| &n.kind), Some(NodeKind::Text(_))))
            .count();
        assert_eq!(texts, 3);
    }

    #[test]
    fn tags_map_to_roles() {
        assert_eq!(tag_to_kind("td"), ElementKind::TableCell);
        assert_eq!(tag_to_kind("h3"), ElementKind::Heading(3));
        assert_eq!(tag_to_kind("script"), ElementKind::Skipped);
        assert_eq!(tag_to_kind("strong"), ElementKind::Inline);
        assert_eq!(tag_to_kind("section"), ElementKind::Container);
    }
}
