use anyhow::Result;
use std::ops::{Add, AddAssign};
use std::path::Path;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// Struct tallies for one file or any number of files folded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Struct types with at least one field.
    pub total: usize,
    /// The subset of `total` with a tag on at least one field.
    pub tagged: usize,
}

impl Counts {
    pub fn new(total: usize, tagged: usize) -> Self {
        Self { total, tagged }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.tagged += other.tagged;
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(mut self, other: Self) -> Counts {
        self += other;
        self
    }
}

impl std::iter::Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), Add::add)
    }
}

/// Single-file Go parser that tallies `struct` types and their tags.
pub struct DeclarationCounter {
    parser: Parser,
}

impl DeclarationCounter {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Counts one file. Unreadable or unparsable files count as zero.
    pub fn count_file(&mut self, path: &Path) -> Counts {
        match std::fs::read(path) {
            Ok(source) => self.count_bytes(&source).unwrap_or_else(|| {
                debug!(file = %path.display(), "parse failed, skipping");
                Counts::default()
            }),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "read failed, skipping");
                Counts::default()
            }
        }
    }

    pub fn count_source(&mut self, source: &str) -> Counts {
        self.count_bytes(source.as_bytes()).unwrap_or_default()
    }

    fn count_bytes(&mut self, source: &[u8]) -> Option<Counts> {
        let tree = self.parser.parse(source, None)?;
        if tree.root_node().has_error() {
            return None;
        }
        Some(count_tree(&tree))
    }
}

fn count_tree(tree: &Tree) -> Counts {
    let mut counts = Counts::default();
    inspect(tree, |node| {
        if node.kind() == "struct_type" {
            if let Some(tagged) = classify_struct(node) {
                counts.total += 1;
                if tagged {
                    counts.tagged += 1;
                }
            }
        }
        true
    });
    counts
}

/// Pre-order walk of the whole tree. Children of a node are skipped when
/// `visit` returns false for it.
pub fn inspect<'t>(tree: &'t Tree, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = tree.walk();
    loop {
        if visit(cursor.node()) && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// `None` for a struct without fields, otherwise whether any field is tagged.
fn classify_struct(node: Node) -> Option<bool> {
    let mut cursor = node.walk();
    let list = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "field_declaration_list")?;

    let mut list_cursor = list.walk();
    let mut fields = list
        .named_children(&mut list_cursor)
        .filter(|child| child.kind() == "field_declaration")
        .peekable();
    fields.peek()?;

    Some(fields.any(|field| field.child_by_field_name("tag").is_some()))
}
