/// Scripted annotator for testing purposes.
///
/// Chooses a canned reply by looking for a substring in the request source,
/// so tests can drive the pipeline without a real annotation service.
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AnnotationRequest, Annotator};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// An annotator whose replies are fixed up front.
#[derive(Debug)]
pub struct ScriptedAnnotator {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    requests: Mutex<Vec<String>>,
}

impl Default for ScriptedAnnotator {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Text(r#"{"comments":[]}"#.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedAnnotator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` for requests whose source contains `needle`.
    #[must_use]
    pub fn reply_when(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(text.into())));
        self
    }

    /// Fail with a service error for requests whose source contains `needle`.
    #[must_use]
    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Fail(message.into())));
        self
    }

    /// Reply used when no rule matches.
    #[must_use]
    pub fn otherwise(mut self, text: impl Into<String>) -> Self {
        self.fallback = Reply::Text(text.into());
        self
    }

    /// Sources of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Annotator for ScriptedAnnotator {
    async fn annotate(&self, request: &AnnotationRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.source.clone());
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| request.source.contains(needle.as_str()))
            .map_or(&self.fallback, |(_, reply)| reply);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(Error::AnnotationService(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_match_by_substring() {
        let annotator = ScriptedAnnotator::new()
            .reply_when("func A", "reply-a")
            .fail_when("func B", "boom");

        let a = annotator.annotate(&AnnotationRequest::new("func A() {}")).await;
        assert_eq!(a.unwrap(), "reply-a");

        let b = annotator.annotate(&AnnotationRequest::new("func B() {}")).await;
        assert!(matches!(b, Err(Error::AnnotationService(_))));

        let c = annotator.annotate(&AnnotationRequest::new("func C() {}")).await;
        assert_eq!(c.unwrap(), r#"{"comments":[]}"#);

        assert_eq!(annotator.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_otherwise_overrides_fallback() {
        let annotator = ScriptedAnnotator::new().otherwise("custom");
        let reply = annotator.annotate(&AnnotationRequest::new("x")).await.unwrap();
        assert_eq!(reply, "custom");
    }
}
