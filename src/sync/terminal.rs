//! Highlighting in a terminal

use std::collections::HashMap;
use std::io::Write;

use super::{HighlightSurface, Rect};
use crate::content::NodeId;
use crate::segment::{PauseKind, Segmentation};

/// Where a word landed in the wrapped text
#[derive(Debug, Clone, Copy)]
struct Placement {
    line: usize,
    column: usize,
    len: usize,
}

/// Prints the spoken word in context, one line per highlight change
///
/// The content is wrapped to `width` columns with a break after every block,
/// and a `height`-line window over it plays the role of the viewport.
pub struct TerminalSurface<W> {
    out: W,
    width: usize,
    height: usize,
    lines: Vec<String>,
    placements: HashMap<NodeId, Placement>,
    scroll: usize,
}

impl<W: Write> TerminalSurface<W> {
    #[must_use]
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self {
            out,
            width: width.max(1),
            height: height.max(1),
            lines: Vec::new(),
            placements: HashMap::new(),
            scroll: 0,
        }
    }

    /// First visible line
    #[must_use]
    pub const fn scroll(&self) -> usize {
        self.scroll
    }

    /// Wrapped content
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HighlightSurface for TerminalSurface<W> {
    fn prepare(&mut self, segmentation: &Segmentation) {
        self.lines = vec![String::new()];
        self.placements.clear();
        self.scroll = 0;

        let mut pauses = segmentation.pauses().iter().peekable();
        for token in segmentation.tokens() {
            let mut block_break = false;
            while let Some(pause) = pauses.next_if(|p| p.start < token.start) {
                block_break |= pause.kind >= PauseKind::Block;
            }

            let len = token.display.chars().count();
            let current = self.lines.last().map_or(0, |l| l.chars().count());
            let fits = current == 0 || current + 1 + len <= self.width;
            if block_break || !fits {
                self.lines.push(String::new());
            }

            let line = self.lines.len() - 1;
            let Some(text) = self.lines.last_mut() else {
                continue;
            };
            if !text.is_empty() {
                text.push(' ');
            }
            let column = text.chars().count();
            text.push_str(&token.display);
            self.placements.insert(token.element, Placement { line, column, len });
        }
    }

    fn activate(&mut self, element: NodeId) {
        let Some(p) = self.placements.get(&element).copied() else {
            return;
        };
        let Some(line) = self.lines.get(p.line) else {
            return;
        };
        let before: String = line.chars().take(p.column).collect();
        let word: String = line.chars().skip(p.column).take(p.len).collect();
        let after: String = line.chars().skip(p.column + p.len).collect();

        if let Err(e) = writeln!(self.out, "{:>4} | {before}[{word}]{after}", p.line + 1) {
            tracing::debug!(error = %e, "failed to write highlight");
        }
    }

    fn deactivate(&mut self, _element: NodeId) {}

    #[allow(clippy::cast_precision_loss)]
    fn bounding_box(&self, element: NodeId) -> Option<Rect> {
        let p = self.placements.get(&element)?;
        let top = p.line as f64 - self.scroll as f64;
        Some(Rect::new(top, top + 1.0))
    }

    #[allow(clippy::cast_precision_loss)]
    fn viewport_height(&self) -> f64 {
        self.height as f64
    }

    fn scroll_to_center(&mut self, element: NodeId) {
        if let Some(p) = self.placements.get(&element) {
            self.scroll = p.line.saturating_sub(self.height / 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentTree, ElementKind};
    use crate::segment::Segmenter;

    fn article() -> (ContentTree, Segmentation) {
        let mut tree = ContentTree::new(ElementKind::Container);
        let root = tree.root();
        let h = tree.append_element(root, ElementKind::Heading(1));
        tree.append_text(h, "Title");
        let p = tree.append_element(root, ElementKind::Paragraph);
        tree.append_text(p, "one two three four five six");
        let seg = Segmenter::default().segment(&mut tree);
        (tree, seg)
    }

    #[test]
    fn blocks_start_new_lines_and_text_wraps() {
        let (_, seg) = article();
        let mut surface = TerminalSurface::new(Vec::new(), 14, 4);
        surface.prepare(&seg);
        assert_eq!(surface.lines(), ["Title", "one two three", "four five six"]);
    }

    #[test]
    fn activation_prints_word_in_context() {
        let (_, seg) = article();
        let mut surface = TerminalSurface::new(Vec::new(), 14, 4);
        surface.prepare(&seg);
        surface.activate(seg.tokens()[2].element);

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(out, "   2 | one [two] three\n");
    }

    #[test]
    fn scrolling_centers_the_line() {
        let (_, seg) = article();
        let mut surface = TerminalSurface::new(Vec::new(), 14, 2);
        surface.prepare(&seg);
        let five = seg.tokens()[5].element;

        surface.scroll_to_center(five);
        assert_eq!(surface.scroll(), 1);
        assert_eq!(surface.bounding_box(five), Some(Rect::new(1.0, 2.0)));
    }
}
