//! Request/response contract with the external annotation service.
//!
//! The service receives the elided source inside a natural-language
//! instruction and answers with `{"comments": [{"position", "comment"}]}`.
pub mod mock;
pub mod moonshot;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One proposed comment: `position` is a literal fragment expected in the
/// source of the target declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub position: String,
    pub comment: String,
}

impl AnnotationEntry {
    pub fn new(position: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationResponse {
    pub comments: Vec<AnnotationEntry>,
}

/// A single annotation request for one file.
#[derive(Debug, Clone)]
pub struct AnnotationRequest {
    pub source: String,
}

impl AnnotationRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The instruction payload embedding the elided source.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            r#"### Role ###
You are an experienced Go engineer who holds code comments to a high standard and writes clear, professional English.
### Requirements ###
- Write a meaningful, technical comment for every struct, interface, method, function and other key declaration that lacks one.
- Identify each declaration by a position: a fragment copied verbatim from the first line of the declaration.
- Return every comment to add as JSON in the format below.
- Reply with plain text only; do not wrap the JSON in three backticks.
### Output Format Example ###
{{
    "comments": [
        {{
            "position": "type MockManagerInterface interface {{",
            "comment": "MockManagerInterface defines the interface for mock manager."
        }},
        {{
            "position": "type mockManager struct {{",
            "comment": "mockManager is the implementation that mock manager."
        }}
    ]
}}
### Target Code ###
{}"#,
            self.source
        )
    }
}

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("valid fence regex")
});

/// Parse a reply from the service, tolerating a surrounding code fence.
pub fn parse_response(reply: &str) -> Result<AnnotationResponse> {
    let body = FENCE_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());
    Ok(serde_json::from_str(body.trim())?)
}

/// External text-generation collaborator producing annotation replies.
///
/// Implementations must be `Send + Sync` so one instance can serve every
/// worker behind an `Arc`.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Send `request` and return the raw reply text.
    async fn annotate(&self, request: &AnnotationRequest) -> Result<String>;
}
