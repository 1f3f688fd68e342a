//! Semantic row operators.
//!
//! Model-backed predicates and projections are supplied by the host through
//! [`SemanticOperator`]; this crate ships no implementation.

use lsmvec_vector::SearchParams;

use crate::error::{Error, Result};

/// The row an operator is asked about, rendered alongside a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticContext {
    /// Instruction for the operator.
    pub prompt: String,
    /// Column name and value pairs of the row.
    pub columns: Vec<(String, String)>,
}

impl SemanticContext {
    /// Create a context with no columns.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), columns: Vec::new() }
    }

    /// Add a column.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    /// The prompt followed by one `name: value` line per column.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.prompt.clone();
        for (name, value) in &self.columns {
            out.push('\n');
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }
}

/// Host-provided model operations over rows.
pub trait SemanticOperator: Send + Sync {
    /// Whether the row satisfies the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Semantic`] if the backend fails.
    fn filter(&self, context: &SemanticContext) -> Result<bool>;

    /// Transform the row into text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Semantic`] if the backend fails.
    fn map(&self, context: &SemanticContext) -> Result<String>;

    /// Extract a value from the row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Semantic`] if the backend fails.
    fn extract(&self, context: &SemanticContext) -> Result<String>;

    /// Embed text as a vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Semantic`] if the backend fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Search parameters whose query vector is the embedding of `text`.
///
/// # Errors
///
/// Returns the operator's error, or [`Error::Semantic`] if the embedding is
/// empty.
pub fn embed_query(operator: &dyn SemanticOperator, text: &str, k: usize) -> Result<SearchParams> {
    let query = operator.embed(text)?;
    if query.is_empty() {
        return Err(Error::Semantic(format!("empty embedding for '{text}'")));
    }
    Ok(SearchParams::new(query, k))
}
