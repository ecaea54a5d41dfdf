/// Body elision: shrink a file to its declarations before it is sent out.
///
/// Every function body becomes a single no-op statement, which keeps all
/// signatures, types and existing comments while dropping the code the
/// annotation service does not need.
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::syntax::{DeclVisitor, FunctionNode, SourceTree, Span};

/// Replacement for every function body.
pub const PLACEHOLDER_BODY: &str = "{\n\t\"\"\n}";

static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)package\s+\w+\s+import\s+\((.*?)\)").expect("valid boilerplate regex")
});

#[derive(Default)]
struct BodyCollector {
    bodies: Vec<Span>,
}

impl DeclVisitor for BodyCollector {
    fn visit_function(&mut self, node: &FunctionNode) {
        if let Some(body) = &node.body {
            self.bodies.push(body.clone());
        }
    }
}

/// Return the source of `tree` with every function body replaced by
/// [`PLACEHOLDER_BODY`]. The result is re-parsed to make sure it is still
/// valid Go.
pub fn elide(tree: &SourceTree) -> Result<String> {
    let mut collector = BodyCollector::default();
    tree.walk(&mut collector);

    let source = tree.source();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for body in &collector.bodies {
        out.push_str(&source[cursor..body.start]);
        out.push_str(PLACEHOLDER_BODY);
        cursor = body.end;
    }
    out.push_str(&source[cursor..]);

    SourceTree::parse(out.as_str())
        .map_err(|e| Error::Parse(format!("elided code is invalid: {e}")))?;
    Ok(out)
}

/// Remove the leading `package ... import ( ... )` block.
pub fn strip_boilerplate(source: &str) -> Result<String> {
    let prologue = BOILERPLATE_RE
        .find(source)
        .ok_or(Error::BoilerplateNotFound)?;
    Ok(source.replace(prologue.as_str(), "").trim().to_string())
}

/// Elide bodies and strip the prologue, keeping the prologue when it cannot
/// be found.
pub fn prepare_payload(tree: &SourceTree) -> Result<String> {
    let elided = elide(tree)?;
    match strip_boilerplate(&elided) {
        Ok(stripped) => Ok(stripped),
        Err(Error::BoilerplateNotFound) => {
            debug!("No package/import prologue found, sending unstripped code");
            Ok(elided)
        }
        Err(e) => Err(e),
    }
}
