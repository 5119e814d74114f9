//! Table reading order

use super::{Emitter, PauseKind, Segmenter, TableOrder};
use crate::content::{ContentTree, ElementKind, NodeId};

/// Visible children of `id` with the given role
fn children_of_kind(tree: &ContentTree, id: NodeId, kind: ElementKind) -> Vec<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .filter(|&c| {
            tree.node(c)
                .is_some_and(|n| !n.is_skipped() && n.element() == Some(kind))
        })
        .collect()
}

/// Rows of a table, looking through `thead`/`tbody`/`tfoot` but not into
/// nested tables
fn table_rows(tree: &ContentTree, table: NodeId) -> Vec<NodeId> {
    let mut rows = Vec::new();
    for &child in tree.children(table) {
        let Some(node) = tree.node(child) else {
            continue;
        };
        if node.is_skipped() {
            continue;
        }
        match node.element() {
            Some(ElementKind::TableRow) => rows.push(child),
            Some(ElementKind::TableSection) => {
                rows.extend(children_of_kind(tree, child, ElementKind::TableRow));
            }
            _ => {}
        }
    }
    rows
}

impl Segmenter {
    /// Read a table in the configured order
    ///
    /// Captions and other non-row children are read first. Column-major order
    /// emits, for each column, that column's cell from every row followed by a
    /// cell pause and a row pause, then a column pause once the column is done.
    pub(super) fn read_table(&self, tree: &mut ContentTree, table: NodeId, out: &mut Emitter<'_>) {
        let extras: Vec<NodeId> = tree
            .children(table)
            .iter()
            .copied()
            .filter(|&c| {
                tree.node(c).is_some_and(|n| {
                    n.is_block()
                        && !matches!(
                            n.element(),
                            Some(ElementKind::TableRow | ElementKind::TableSection)
                        )
                })
            })
            .collect();
        for extra in extras {
            self.visit(tree, extra, out);
        }

        let grid: Vec<Vec<NodeId>> = table_rows(tree, table)
            .into_iter()
            .map(|row| children_of_kind(tree, row, ElementKind::TableCell))
            .collect();
        let columns = grid.iter().map(Vec::len).max().unwrap_or(0);

        tracing::trace!(%table, rows = grid.len(), columns, order = ?self.table_order, "reading table");

        match self.table_order {
            TableOrder::ColumnMajor => {
                for column in 0..columns {
                    for row in &grid {
                        if let Some(&cell) = row.get(column) {
                            self.read_flow(tree, cell, out);
                            out.pause(PauseKind::Cell);
                        }
                        out.pause(PauseKind::Row);
                    }
                    out.pause(PauseKind::Column);
                }
            }
            TableOrder::RowMajor => {
                for row in &grid {
                    for &cell in row {
                        self.read_flow(tree, cell, out);
                        out.pause(PauseKind::Cell);
                    }
                    out.pause(PauseKind::Row);
                }
                out.pause(PauseKind::Block);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::content::{ContentTree, ElementKind};
    use crate::segment::{PauseKind, PauseText, Segmenter, TableOrder};

    fn table(rows: &[&[&str]], sectioned: bool) -> ContentTree {
        let mut tree = ContentTree::new(ElementKind::Table);
        let mut parent = tree.root();
        if sectioned {
            parent = tree.append_element(parent, ElementKind::TableSection);
        }
        for row in rows {
            let tr = tree.append_element(parent, ElementKind::TableRow);
            for cell in *row {
                let td = tree.append_element(tr, ElementKind::TableCell);
                tree.append_text(td, *cell);
            }
        }
        tree
    }

    fn words(tree: &mut ContentTree, order: TableOrder) -> Vec<String> {
        Segmenter::new(PauseText::default(), order)
            .segment(tree)
            .tokens()
            .iter()
            .map(|t| t.speakable.clone())
            .collect()
    }

    #[test]
    fn two_by_two_reads_column_major() {
        let mut tree = table(&[&["A", "B"], &["C", "D"]], false);
        assert_eq!(words(&mut tree, TableOrder::ColumnMajor), ["A", "C", "B", "D"]);
    }

    #[test]
    fn row_major_is_available() {
        let mut tree = table(&[&["A", "B"], &["C", "D"]], true);
        assert_eq!(words(&mut tree, TableOrder::RowMajor), ["A", "B", "C", "D"]);
    }

    #[test]
    fn ragged_rows_skip_missing_cells() {
        let mut tree = table(&[&["A", "B", "X"], &["C"], &["E", "F"]], true);
        assert_eq!(
            words(&mut tree, TableOrder::ColumnMajor),
            ["A", "C", "E", "B", "F", "X"]
        );
    }

    #[test]
    fn column_pause_separates_columns() {
        let mut tree = table(&[&["A", "B"], &["C", "D"]], false);
        let seg = Segmenter::default().segment(&mut tree);
        let kinds: Vec<PauseKind> = seg.pauses().iter().map(|p| p.kind).collect();

        // A|row C|column B|row D|column
        assert_eq!(
            kinds,
            [PauseKind::Row, PauseKind::Column, PauseKind::Row, PauseKind::Column]
        );
        assert_eq!(seg.buffer(), "A; C. B; D. ");
    }

    #[test]
    fn caption_is_read_before_cells() {
        let mut tree = table(&[&["A"]], false);
        let root = tree.root();
        let caption = tree.append_element(root, ElementKind::Paragraph);
        tree.append_text(caption, "Totals");
        assert_eq!(words(&mut tree, TableOrder::ColumnMajor), ["Totals", "A"]);
    }

    #[test]
    fn multi_word_cells_keep_word_pauses() {
        let mut tree = table(&[&["New York", "Boston"], &["8m", "650k"]], false);
        let seg = Segmenter::default().segment(&mut tree);
        assert_eq!(seg.buffer(), "New York; 8m. Boston; 650k. ");
    }
}
