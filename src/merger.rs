/// Comment merging: attach proposed comments to the declarations they name.
///
/// A proposal is matched against declarations in document order. The first
/// declaration without a documentation comment whose source contains the
/// proposal's position marker receives it, and each declaration receives at
/// most one. Existing documentation is never replaced.
use tracing::debug;

use crate::annotator::AnnotationEntry;
use crate::error::{Error, Result};
use crate::syntax::SourceTree;
use crate::syntax::comments::{CommentMap, DocComment};

/// Result of merging proposals into a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub source: String,
    /// Number of comments that were attached.
    pub attached: usize,
    /// Proposals that did not match any undocumented declaration.
    pub unmatched: Vec<AnnotationEntry>,
}

/// Merge `entries` into `tree`, whose existing documentation is `docs`.
pub fn merge(tree: &SourceTree, docs: &CommentMap, entries: &[AnnotationEntry]) -> Result<Merged> {
    let mut consumed = vec![false; entries.len()];
    let mut pending = CommentMap::default();

    for decl in tree.decls() {
        if docs.contains(decl.id()) {
            continue;
        }
        let code = tree.slice(decl.span());
        let hit = entries.iter().enumerate().find(|(i, entry)| {
            !consumed[*i] && !entry.position.is_empty() && code.contains(entry.position.as_str())
        });
        if let Some((i, entry)) = hit {
            debug!("Attaching comment to {} (position {:?})", decl.label(), entry.position);
            pending.insert(decl.id(), DocComment::synthesize(&entry.comment));
            consumed[i] = true;
        }
    }

    // Only nodes of the tree being rendered may emit a comment.
    pending.retain_live(tree);
    let source = render(tree, &pending);
    SourceTree::parse(source.as_str()).map_err(|e| Error::MergeSerialization(e.to_string()))?;

    let unmatched = entries
        .iter()
        .zip(&consumed)
        .filter(|(_, used)| !**used)
        .map(|(entry, _)| entry.clone())
        .collect();

    Ok(Merged {
        source,
        attached: pending.len(),
        unmatched,
    })
}

/// Re-emit the source of `tree` with each comment in `pending` placed
/// directly above its declaration.
fn render(tree: &SourceTree, pending: &CommentMap) -> String {
    let source = tree.source();
    let extra: usize = pending
        .iter()
        .map(|(_, doc)| doc.lines.iter().map(|l| l.len() + 1).sum::<usize>() + 1)
        .sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;

    for (id, doc) in pending.iter() {
        let Some(decl) = tree.decl(*id) else {
            continue;
        };
        let start = decl.span().start;
        out.push_str(&source[cursor..start]);

        let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &source[line_start..start];
        if prefix.trim().is_empty() {
            // Keep the declaration's indentation on the line it starts.
            out.truncate(out.len() - prefix.len());
            out.push_str(&doc.render(prefix));
            out.push_str(prefix);
        } else {
            out.push('\n');
            out.push_str(&doc.render(""));
        }
        cursor = start;
    }
    out.push_str(&source[cursor..]);
    out
}
