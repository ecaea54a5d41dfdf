//! # gocmt — documentation comments for Go code
//!
//! Finds Go files that lack documentation comments, asks an LLM annotation
//! service to propose comments for their declarations and writes the
//! comments back in place, keeping every file syntactically valid.
//!
//! ## Architecture
//!
//! - **[`discovery`]** — Target files from a path walk or a git change-set
//! - **[`formatter`]** — `gofmt` integration and a builtin whitespace normalizer
//! - **[`syntax`]** — Tree-sitter structural model and comment association
//! - **[`elider`]** — Body elision and prologue stripping for the payload
//! - **[`annotator`]** — Annotation service contract, HTTP client and mock
//! - **[`merger`]** — Attaching proposed comments to declarations
//! - **[`pipeline`]** — Bounded-concurrency orchestration and progress
//! - **[`config`]** / **[`cli`]** — Configuration, credentials and flags

pub mod annotator;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod elider;
pub mod error;
pub mod formatter;
pub mod merger;
pub mod pipeline;
pub mod syntax;
