//! Crate-wide error taxonomy.
//!
//! Every fallible core function returns `Result<T, GamalError>`. The five
//! variants mirror the error kinds laid out in the design: configuration
//! failures are fatal at startup, `Llm`/`Search` abort an in-flight pipeline
//! run, `ExtractionEmpty` is recoverable, and `TestMismatch` is only ever
//! produced by the file-based test runner.

/// Top-level error type for the pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GamalError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("search request failed: {0}")]
    Search(String),

    #[error("extraction produced no keyphrases")]
    ExtractionEmpty,

    #[error("test expectation failed: {0}")]
    TestMismatch(String),
}

pub type Result<T> = std::result::Result<T, GamalError>;
