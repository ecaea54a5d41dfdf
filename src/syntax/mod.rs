//! Structural model of a Go source file built with Tree-sitter.
//!
//! [`SourceTree`] keeps the canonical text together with every top-level
//! declaration and comment, addressed by byte offsets into that text. The
//! documentation comments attached to declarations are a derived view, see
//! [`comments::CommentMap`].
pub mod comments;

use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};

/// Byte range into the text a [`SourceTree`] was built from.
pub type Span = Range<usize>;

/// Identity of a declaration: its document-order index plus start offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub index: usize,
    pub offset: usize,
}

/// Byte span plus the (0-based) rows it starts and ends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    pub span: Span,
    pub start_row: usize,
    pub end_row: usize,
}

impl Extent {
    fn of(node: Node) -> Self {
        Self {
            span: node.start_byte()..node.end_byte(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNode {
    pub id: NodeId,
    pub extent: Extent,
    pub name: String,
    /// Receiver parameter list for methods, e.g. `(s *Server)`.
    pub receiver: Option<String>,
    /// The `{ ... }` block; `None` for body-less declarations.
    pub body: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub id: NodeId,
    pub extent: Extent,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralKind {
    Const,
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralNode {
    pub id: NodeId,
    pub extent: Extent,
    pub kind: GeneralKind,
    pub names: Vec<String>,
}

/// A top-level declaration. Package clauses and imports are not declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Function(FunctionNode),
    Type(TypeNode),
    General(GeneralNode),
}

impl Decl {
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Decl::Function(f) => f.id,
            Decl::Type(t) => t.id,
            Decl::General(g) => g.id,
        }
    }

    #[must_use]
    pub fn extent(&self) -> &Extent {
        match self {
            Decl::Function(f) => &f.extent,
            Decl::Type(t) => &t.extent,
            Decl::General(g) => &g.extent,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.extent().span.clone()
    }

    /// Short human readable label used in log records, e.g. `func Foo`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Decl::Function(f) => match &f.receiver {
                Some(recv) => format!("func {recv} {}", f.name),
                None => format!("func {}", f.name),
            },
            Decl::Type(t) => format!("type {}", t.names.join(", ")),
            Decl::General(g) => {
                let keyword = match g.kind {
                    GeneralKind::Const => "const",
                    GeneralKind::Var => "var",
                };
                format!("{keyword} {}", g.names.join(", "))
            }
        }
    }
}

/// Callback interface over the declarations of a tree, in document order.
pub trait DeclVisitor {
    fn visit_function(&mut self, _node: &FunctionNode) {}
    fn visit_type(&mut self, _node: &TypeNode) {}
    fn visit_general(&mut self, _node: &GeneralNode) {}
}

/// A top-level item of the file, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    /// Index into [`SourceTree::decls`].
    Decl(usize),
    Comment(Extent),
    /// Package clause, imports and anything else that is not a declaration.
    Other(Extent),
}

/// Position-addressable structural model of one Go file.
#[derive(Debug, Clone)]
pub struct SourceTree {
    source: String,
    decls: Vec<Decl>,
    items: Vec<TopLevel>,
}

impl SourceTree {
    /// Parse Go source text. Any syntax error fails with [`Error::Parse`].
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let tree = parse_go(&source)?;
        let root = tree.root_node();

        let bytes = source.as_bytes();
        let mut decls = Vec::new();
        let mut items = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let extent = Extent::of(child);
            let id = NodeId {
                index: decls.len(),
                offset: extent.span.start,
            };
            let decl = match child.kind() {
                "function_declaration" | "method_declaration" => Decl::Function(FunctionNode {
                    id,
                    name: field_text(child, "name", bytes).unwrap_or_default(),
                    receiver: field_text(child, "receiver", bytes),
                    body: child
                        .child_by_field_name("body")
                        .map(|b| b.start_byte()..b.end_byte()),
                    extent,
                }),
                "type_declaration" => Decl::Type(TypeNode {
                    id,
                    names: spec_names(child, bytes),
                    extent,
                }),
                "const_declaration" | "var_declaration" => Decl::General(GeneralNode {
                    id,
                    kind: if child.kind() == "const_declaration" {
                        GeneralKind::Const
                    } else {
                        GeneralKind::Var
                    },
                    names: spec_names(child, bytes),
                    extent,
                }),
                "comment" => {
                    items.push(TopLevel::Comment(extent));
                    continue;
                }
                _ => {
                    items.push(TopLevel::Other(extent));
                    continue;
                }
            };
            items.push(TopLevel::Decl(decls.len()));
            decls.push(decl);
        }

        Ok(Self {
            source,
            decls,
            items,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn decls(&self) -> &[Decl] {
        &self.decls
    }

    #[must_use]
    pub fn items(&self) -> &[TopLevel] {
        &self.items
    }

    #[must_use]
    pub fn decl(&self, id: NodeId) -> Option<&Decl> {
        self.decls.get(id.index).filter(|d| d.id() == id)
    }

    /// Whether `id` names a declaration of this tree.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.decl(id).is_some()
    }

    /// Source text of `span`.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        &self.source[span]
    }

    pub fn walk<V: DeclVisitor>(&self, visitor: &mut V) {
        for decl in &self.decls {
            match decl {
                Decl::Function(f) => visitor.visit_function(f),
                Decl::Type(t) => visitor.visit_type(t),
                Decl::General(g) => visitor.visit_general(g),
            }
        }
    }
}

/// Parse Go source, rejecting input with any syntax error.
fn parse_go(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| Error::Parse(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::Parse("parser produced no tree".to_string()))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::Parse(describe_first_error(root)));
    }
    Ok(tree)
}

/// Spans of raw string literals and comments that cross a line break. Text
/// inside them is significant and must not be normalized.
pub fn verbatim_spans(source: &str) -> Result<Vec<Span>> {
    let tree = parse_go(source)?;
    let root = tree.root_node();

    let mut spans = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "raw_string_literal" | "comment") {
            if node.start_position().row != node.end_position().row {
                spans.push(node.start_byte()..node.end_byte());
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    spans.sort_by_key(|s| s.start);
    Ok(spans)
}

fn field_text(node: Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
        .map(str::to_string)
}

/// Names declared by the specs of a `type`, `const` or `var` declaration,
/// including grouped `( ... )` forms.
fn spec_names(decl: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    collect_spec_names(decl, source, &mut names);
    names
}

fn collect_spec_names(node: Node, source: &[u8], names: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "type_spec" | "type_alias" | "const_spec" | "var_spec" => {
                let mut name_cursor = child.walk();
                for name in child.children_by_field_name("name", &mut name_cursor) {
                    if let Ok(text) = name.utf8_text(source) {
                        names.push(text.to_string());
                    }
                }
            }
            kind if kind.ends_with("_list") => collect_spec_names(child, source, names),
            _ => {}
        }
    }
}

fn describe_first_error(root: Node) -> String {
    match first_error(root) {
        Some(node) => {
            let pos = node.start_position();
            let what = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "unexpected input".to_string()
            };
            format!("{}:{}: {what}", pos.row + 1, pos.column + 1)
        }
        None => "syntax error".to_string(),
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
