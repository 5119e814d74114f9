//! Content linearization
//!
//! Walks a [`ContentTree`] once in reading order and produces the speakable
//! buffer sent for synthesis, the tokens it contains, the pauses between them
//! and an [`OffsetIndex`] mapping every buffer offset back to its token.
//!
//! Structural rules, first match wins:
//!
//! 1. tables are read column by column (see [`TableOrder`])
//! 2. headings end with a block pause
//! 3. list items end with an item pause
//! 4. paragraphs, quotes and containers without block children end with a
//!    block pause
//! 5. anything else recurses into its children
//!
//! Words are wrapped in place into [`NodeKind::Word`] handles the first time a
//! tree is segmented. A second pass reuses those handles, so segmenting an
//! already processed tree yields the same buffer and index.
//!
//! Offsets count Unicode scalar values, not bytes.

mod index;
mod sanitize;
mod table;

use serde::{Deserialize, Serialize};

use crate::content::{ContentTree, ElementKind, NodeId, NodeKind};

pub use index::OffsetIndex;
pub use sanitize::{speakable, split_runs};

/// Index of a token within one [`Segmentation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenId(pub u32);

/// A speakable word bound to one word handle in the content tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Position in the token list
    pub id: TokenId,
    /// Word handle to highlight
    pub element: NodeId,
    /// Text as rendered, symbols included
    pub display: String,
    /// Text as synthesized, never empty
    pub speakable: String,
    /// Start offset in the speakable buffer
    pub start: usize,
    /// Length of `speakable` in chars
    pub len: usize,
}

impl Token {
    /// Offset one past the last char of the token
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether `offset` falls inside the token
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }
}

/// Structural break, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    /// Between two words
    Word,
    /// After a table cell
    Cell,
    /// After a row within a column
    Row,
    /// After a list item
    Item,
    /// After a heading, paragraph or other leaf block
    Block,
    /// After a whole table column
    Column,
}

/// Buffer region owned by no token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pause {
    /// Strength of the break
    pub kind: PauseKind,
    /// Start offset in the speakable buffer
    pub start: usize,
    /// Length in chars
    pub len: usize,
}

impl Pause {
    /// Offset one past the end of the pause
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Text inserted into the buffer for each pause kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseText {
    pub word: String,
    pub cell: String,
    pub row: String,
    pub item: String,
    pub block: String,
    pub column: String,
}

impl Default for PauseText {
    fn default() -> Self {
        Self {
            word: " ".to_string(),
            cell: ", ".to_string(),
            row: "; ".to_string(),
            item: "; ".to_string(),
            block: ". ".to_string(),
            column: ". ".to_string(),
        }
    }
}

impl PauseText {
    /// Buffer text for a pause kind
    #[must_use]
    pub fn get(&self, kind: PauseKind) -> &str {
        match kind {
            PauseKind::Word => &self.word,
            PauseKind::Cell => &self.cell,
            PauseKind::Row => &self.row,
            PauseKind::Item => &self.item,
            PauseKind::Block => &self.block,
            PauseKind::Column => &self.column,
        }
    }
}

/// Order in which table cells are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableOrder {
    /// Every row of column 0, then every row of column 1, ...
    #[default]
    ColumnMajor,
    /// Every cell of row 0, then every cell of row 1, ...
    RowMajor,
}

/// Output of one segmentation pass
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    buffer: String,
    tokens: Vec<Token>,
    pauses: Vec<Pause>,
    index: OffsetIndex,
}

impl Segmentation {
    /// Text to send for synthesis
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Buffer length in chars
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing speakable was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in buffer order
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Pauses in buffer order
    #[must_use]
    pub fn pauses(&self) -> &[Pause] {
        &self.pauses
    }

    /// Number of tokens emitted
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Offset index built in the same pass as the buffer
    #[must_use]
    pub const fn index(&self) -> &OffsetIndex {
        &self.index
    }

    /// Look up a token by id
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0 as usize)
    }

    /// Token owning a buffer offset
    #[must_use]
    pub fn owner_of(&self, offset: usize) -> Option<&Token> {
        self.index.lookup(offset).and_then(|id| self.token(id))
    }
}

/// Accumulates buffer, tokens and pauses left to right
struct Emitter<'a> {
    texts: &'a PauseText,
    buffer: String,
    chars: usize,
    tokens: Vec<Token>,
    pauses: Vec<Pause>,
    /// Byte offset of the trailing pause, if the buffer ends with one
    open_pause: Option<usize>,
}

impl<'a> Emitter<'a> {
    const fn new(texts: &'a PauseText) -> Self {
        Self {
            texts,
            buffer: String::new(),
            chars: 0,
            tokens: Vec::new(),
            pauses: Vec::new(),
            open_pause: None,
        }
    }

    fn token(&mut self, element: NodeId, text: &str) {
        let speakable = speakable(text);
        if speakable.is_empty() {
            tracing::trace!(%element, word = text, "dropping unspeakable word");
            return;
        }
        // Words within a run are separated by word pauses. A structural pause
        // already at the tail wins.
        self.pause(PauseKind::Word);

        let len = speakable.chars().count();
        #[allow(clippy::cast_possible_truncation)]
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(Token {
            id,
            element,
            display: text.to_string(),
            speakable: speakable.clone(),
            start: self.chars,
            len,
        });
        self.buffer.push_str(&speakable);
        self.chars += len;
        self.open_pause = None;
    }

    /// Append a pause, merging with a trailing one into the stronger kind
    ///
    /// Pauses at the very start of the buffer are dropped.
    fn pause(&mut self, kind: PauseKind) {
        if self.tokens.is_empty() {
            return;
        }
        if let Some(byte_start) = self.open_pause {
            let Some(last) = self.pauses.last_mut() else {
                return;
            };
            if kind <= last.kind {
                return;
            }
            let text = self.texts.get(kind);
            self.buffer.truncate(byte_start);
            self.buffer.push_str(text);
            self.chars = last.start + text.chars().count();
            last.kind = kind;
            last.len = self.chars - last.start;
            return;
        }

        let text = self.texts.get(kind);
        let len = text.chars().count();
        self.open_pause = Some(self.buffer.len());
        self.pauses.push(Pause {
            kind,
            start: self.chars,
            len,
        });
        self.buffer.push_str(text);
        self.chars += len;
    }

    fn finish(self) -> Segmentation {
        let index = OffsetIndex::build(&self.tokens, &self.pauses);
        Segmentation {
            buffer: self.buffer,
            tokens: self.tokens,
            pauses: self.pauses,
            index,
        }
    }
}

/// Linearizes content trees into speakable buffers
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    pauses: PauseText,
    table_order: TableOrder,
}

impl Segmenter {
    /// Create a segmenter with explicit pause texts and table order
    #[must_use]
    pub const fn new(pauses: PauseText, table_order: TableOrder) -> Self {
        Self {
            pauses,
            table_order,
        }
    }

    /// Segment the whole tree
    ///
    /// Wraps unprocessed words into handles in place; already wrapped words
    /// are reused.
    pub fn segment(&self, tree: &mut ContentTree) -> Segmentation {
        let mut out = Emitter::new(&self.pauses);
        self.visit(tree, tree.root(), &mut out);
        let segmentation = out.finish();

        tracing::debug!(
            tokens = segmentation.token_count(),
            pauses = segmentation.pauses().len(),
            chars = segmentation.len(),
            "segmented content"
        );
        segmentation
    }

    fn visit(&self, tree: &mut ContentTree, id: NodeId, out: &mut Emitter<'_>) {
        let Some(node) = tree.node(id) else {
            return;
        };
        if node.is_skipped() {
            return;
        }
        let Some(kind) = node.element() else {
            return;
        };
        let leaf = !tree.children(id).iter().any(|&c| is_block(tree, c));

        match kind {
            ElementKind::Table => self.read_table(tree, id, out),
            ElementKind::Heading(_) => {
                self.read_flow(tree, id, out);
                out.pause(PauseKind::Block);
            }
            ElementKind::ListItem => {
                self.read_flow(tree, id, out);
                out.pause(PauseKind::Item);
            }
            ElementKind::Paragraph | ElementKind::BlockQuote | ElementKind::Container if leaf => {
                self.read_flow(tree, id, out);
                out.pause(PauseKind::Block);
            }
            _ => self.read_flow(tree, id, out),
        }
    }

    /// Read the children of a block: inline runs become words, blocks recurse
    fn read_flow(&self, tree: &mut ContentTree, id: NodeId, out: &mut Emitter<'_>) {
        let children = tree.children(id).to_vec();
        let mixed = children.iter().any(|&c| is_block(tree, c));

        let mut run: Vec<NodeId> = Vec::new();
        for child in children {
            if is_block(tree, child) {
                self.flush_run(tree, id, &mut run, mixed, out);
                self.visit(tree, child, out);
            } else {
                run.push(child);
            }
        }
        self.flush_run(tree, id, &mut run, mixed, out);
    }

    fn flush_run(
        &self,
        tree: &mut ContentTree,
        parent: NodeId,
        run: &mut Vec<NodeId>,
        mixed: bool,
        out: &mut Emitter<'_>,
    ) {
        if run.is_empty() {
            return;
        }
        let emitted = out.tokens.len();
        self.read_run(tree, parent, run, out);
        run.clear();

        // Loose text between blocks reads like its own paragraph
        if mixed && out.tokens.len() > emitted {
            out.pause(PauseKind::Block);
        }
    }

    /// Emit the words of a run of inline siblings, wrapping them first if the
    /// run still holds raw text
    #[allow(clippy::unused_self)]
    fn read_run(
        &self,
        tree: &mut ContentTree,
        parent: NodeId,
        run: &[NodeId],
        out: &mut Emitter<'_>,
    ) {
        let words = if needs_wrapping(tree, run) {
            wrap_run(tree, parent, run)
        } else {
            run.iter().flat_map(|&n| tree.words(n)).collect()
        };

        for word in words {
            if let Some(text) = tree.word(word) {
                let text = text.to_string();
                out.token(word, &text);
            }
        }
    }
}

/// Whether a node reads as a block
///
/// Inline elements wrapping blocks (`<a><h3>..</h3><p>..</p></a>`) count as
/// blocks so their children keep their own pauses.
fn is_block(tree: &ContentTree, id: NodeId) -> bool {
    let Some(node) = tree.node(id) else {
        return false;
    };
    if node.is_block() {
        return true;
    }
    node.element() == Some(ElementKind::Inline)
        && node.children.iter().any(|&c| is_block(tree, c))
}

/// A run needs wrapping while any of it is still raw text
///
/// Runs of word handles and whitespace, as left behind by an earlier pass,
/// are read as they are.
fn needs_wrapping(tree: &ContentTree, run: &[NodeId]) -> bool {
    run.iter().any(|&id| has_raw_text(tree, id))
}

fn has_raw_text(tree: &ContentTree, id: NodeId) -> bool {
    let Some(node) = tree.node(id) else {
        return false;
    };
    if node.is_skipped() {
        return false;
    }
    match &node.kind {
        NodeKind::Word(_) => false,
        NodeKind::Text(text) => !text.trim().is_empty(),
        NodeKind::Element(_) => node.children.iter().any(|&c| has_raw_text(tree, c)),
    }
}

/// Replace a run of inline siblings with word handles and whitespace text
///
/// Hidden and skipped siblings are kept after the wrapped words.
fn wrap_run(tree: &mut ContentTree, parent: NodeId, run: &[NodeId]) -> Vec<NodeId> {
    let Some(&head) = run.first() else {
        return Vec::new();
    };
    let Some(first) = tree.children(parent).iter().position(|&c| c == head) else {
        return Vec::new();
    };
    let text: String = run.iter().map(|&id| tree.text_content(id)).collect();
    let kept: Vec<NodeId> = run
        .iter()
        .copied()
        .filter(|&id| tree.node(id).is_some_and(crate::content::Node::is_skipped))
        .collect();

    let mut replacement = Vec::new();
    let mut words = Vec::new();
    for (space, piece) in split_runs(&text) {
        if space {
            replacement.push(tree.push_detached(NodeKind::Text(piece.to_string())));
        } else {
            let word = tree.push_detached(NodeKind::Word(piece.to_string()));
            tree.mark_processed(word);
            replacement.push(word);
            words.push(word);
        }
    }
    replacement.extend(kept);

    tree.splice_children(parent, first..first + run.len(), &replacement);
    tree.mark_processed(parent);
    words
}
