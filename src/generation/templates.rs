//! Collaborator seam for retrieval of proven campaign templates.
//!
//! Template search is strictly best-effort: it runs at most once per
//! request under its own short deadline, and any failure degrades to an
//! unassisted prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::TransportError;

/// A retrieved template fragment offered to the model as a hint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSnippet {
    pub title: String,
    pub body: String,
    /// Retrieval score in `0.0..=1.0`, higher is closer.
    pub relevance: f32,
}

impl TemplateSnippet {
    pub fn new(title: impl Into<String>, body: impl Into<String>, relevance: f32) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            relevance,
        }
    }
}

/// Search over a template library by campaign description.
#[async_trait]
pub trait TemplateSearch: Send + Sync {
    async fn search(&self, description: &str) -> Result<Vec<TemplateSnippet>, TransportError>;
}

/// The no-op search used when no template library is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTemplates;

#[async_trait]
impl TemplateSearch for NoTemplates {
    async fn search(&self, _description: &str) -> Result<Vec<TemplateSnippet>, TransportError> {
        Ok(Vec::new())
    }
}
