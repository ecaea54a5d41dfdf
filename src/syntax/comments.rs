//! Documentation comments and their association with declarations.
use std::collections::BTreeMap;

use super::{NodeId, SourceTree, Span, TopLevel};

/// Line-comment marker used for synthesized comments.
pub const LINE_COMMENT: &str = "//";

/// A documentation comment: the ordered lines of the comment group directly
/// above a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocComment {
    pub lines: Vec<String>,
    /// Where the group sits in the source; `None` for synthesized comments.
    pub span: Option<Span>,
}

impl DocComment {
    /// Build a line comment from free prose. Each line gets a `// ` prefix,
    /// blank lines become a bare `//`, and lines that are already comments
    /// are kept as they are. Empty text still yields a bare `//` line.
    #[must_use]
    pub fn synthesize(text: &str) -> Self {
        let mut lines: Vec<String> = text
            .trim()
            .lines()
            .map(|line| {
                let line = line.trim_end();
                if line.trim().is_empty() {
                    LINE_COMMENT.to_string()
                } else if line.trim_start().starts_with(LINE_COMMENT) {
                    line.trim_start().to_string()
                } else {
                    format!("{LINE_COMMENT} {line}")
                }
            })
            .collect();
        if lines.is_empty() {
            lines.push(LINE_COMMENT.to_string());
        }
        Self { lines, span: None }
    }

    /// Render the comment as source lines, each prefixed with `indent` and
    /// terminated by a newline.
    #[must_use]
    pub fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Mapping from declaration to its documentation comment.
///
/// The map is a view derived from one [`SourceTree`]; after the tree changes
/// it must be derived again or filtered with [`CommentMap::retain_live`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentMap {
    entries: BTreeMap<NodeId, DocComment>,
}

impl CommentMap {
    /// Associate every declaration of `tree` with the comment group directly
    /// above it.
    ///
    /// A group belongs to a declaration when its last comment ends on the line
    /// right before the declaration and no blank line separates its comments.
    /// A comment that shares a line with the preceding item is that item's
    /// trailing comment and never starts a group.
    #[must_use]
    pub fn derive(tree: &SourceTree) -> Self {
        let items = tree.items();
        let mut entries = BTreeMap::new();

        for (pos, item) in items.iter().enumerate() {
            let TopLevel::Decl(index) = item else {
                continue;
            };
            let decl = &tree.decls()[*index];

            let mut group = Vec::new();
            let mut next_row = decl.extent().start_row;
            let mut previous_end_row = None;
            for earlier in items[..pos].iter().rev() {
                match earlier {
                    TopLevel::Comment(c)
                        if c.end_row + 1 == next_row
                            || (!group.is_empty() && c.end_row == next_row) =>
                    {
                        next_row = c.start_row;
                        group.push(c);
                    }
                    TopLevel::Comment(_) => break,
                    TopLevel::Decl(i) => {
                        previous_end_row = Some(tree.decls()[*i].extent().end_row);
                        break;
                    }
                    TopLevel::Other(o) => {
                        previous_end_row = Some(o.end_row);
                        break;
                    }
                }
            }

            if let Some(row) = previous_end_row {
                while group.last().is_some_and(|c| c.start_row == row) {
                    group.pop();
                }
            }
            if group.is_empty() {
                continue;
            }

            group.reverse();
            let span = group[0].span.start..group[group.len() - 1].span.end;
            let lines = group
                .iter()
                .flat_map(|c| tree.slice(c.span.clone()).lines())
                .map(str::to_string)
                .collect();
            entries.insert(
                decl.id(),
                DocComment {
                    lines,
                    span: Some(span),
                },
            );
        }

        Self { entries }
    }

    pub fn insert(&mut self, id: NodeId, doc: DocComment) {
        self.entries.insert(id, doc);
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DocComment> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &DocComment)> {
        self.entries.iter()
    }

    /// Drop associations whose declaration is not present in `tree`.
    pub fn retain_live(&mut self, tree: &SourceTree) {
        self.entries.retain(|id, _| tree.contains(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_lines(src: &str) -> Vec<(String, Vec<String>)> {
        let tree = SourceTree::parse(src).unwrap();
        let map = CommentMap::derive(&tree);
        tree.decls()
            .iter()
            .filter_map(|d| map.get(d.id()).map(|doc| (d.label(), doc.lines.clone())))
            .collect()
    }

    #[test]
    fn test_adjacent_group_is_doc() {
        let src = "package p\n\n// Foo does X.\n// More detail.\nfunc Foo() {}\n";
        assert_eq!(
            doc_lines(src),
            vec![(
                "func Foo".to_string(),
                vec!["// Foo does X.".to_string(), "// More detail.".to_string()]
            )]
        );
    }

    #[test]
    fn test_blank_line_breaks_association() {
        let src = "package p\n\n// Detached.\n\nfunc Foo() {}\n";
        assert!(doc_lines(src).is_empty());
    }

    #[test]
    fn test_blank_line_inside_group_keeps_only_tail() {
        let src = "package p\n\n// Header.\n\n// Foo does X.\nfunc Foo() {}\n";
        assert_eq!(
            doc_lines(src)[0].1,
            vec!["// Foo does X.".to_string()]
        );
    }

    #[test]
    fn test_trailing_comment_is_not_doc() {
        let src = "package p\n\nvar a = 1 // counter\nfunc Foo() {}\n";
        assert!(doc_lines(src).is_empty());
    }

    #[test]
    fn test_block_comment_doc() {
        let src = "package p\n\n/*\nFoo does X.\n*/\nfunc Foo() {}\n";
        let docs = doc_lines(src);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].1.first().map(String::as_str), Some("/*"));
    }

    #[test]
    fn test_package_doc_is_not_decl_doc() {
        let src = "// Package p is a demo.\npackage p\n\nfunc Foo() {}\n";
        assert!(doc_lines(src).is_empty());
    }

    #[test]
    fn test_synthesize_prefixes_every_line() {
        let doc = DocComment::synthesize("Foo does X.\n\nIt also does Y.  \n");
        assert_eq!(doc.lines, vec!["// Foo does X.", "//", "// It also does Y."]);
        assert_eq!(
            doc.render(""),
            "// Foo does X.\n//\n// It also does Y.\n"
        );
    }

    #[test]
    fn test_synthesize_blank_text() {
        assert_eq!(DocComment::synthesize("").lines, vec!["//"]);
        assert_eq!(DocComment::synthesize("  \n\t\n").render("\t"), "\t//\n");
    }

    #[test]
    fn test_synthesize_keeps_existing_markers() {
        let doc = DocComment::synthesize("// Already a comment.");
        assert_eq!(doc.lines, vec!["// Already a comment."]);
    }

    #[test]
    fn test_retain_live_drops_foreign_nodes() {
        let first = SourceTree::parse("package p\n\n// A.\nfunc A() {}\n").unwrap();
        let mut map = CommentMap::derive(&first);
        assert_eq!(map.len(), 1);

        let second = SourceTree::parse("package p\n\n\n\n\n\nfunc B() {}\n").unwrap();
        map.retain_live(&second);
        assert!(map.is_empty());

        let mut map = CommentMap::derive(&first);
        map.retain_live(&first);
        assert_eq!(map.len(), 1);
    }
}
