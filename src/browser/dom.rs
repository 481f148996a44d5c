//! Typed DOM responses from the DevTools `DOM` domain.

use serde_json::Value;

use super::error::{BrowserError, Result};

/// DevTools node identifier, valid for the lifetime of the current document.
pub type NodeId = i64;

/// A node as returned by `DOM.getDocument`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub node_id: NodeId,
    #[serde(default)]
    pub node_name: String,
    #[serde(default, rename = "documentURL")]
    pub document_url: Option<String>,
}

/// The rendered document tree. The root node is always present; a
/// response without one never becomes a `Document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: DomNode,
}

/// Raw `DOM.getDocument` result.
#[derive(Debug, serde::Deserialize)]
struct GetDocumentResult {
    root: Option<DomNode>,
}

/// Raw `DOM.getOuterHTML` result.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OuterHtmlResult {
    outer_html: String,
}

impl Document {
    pub fn new(root: DomNode) -> Self {
        Self { root }
    }

    /// Parses a `DOM.getDocument` result, failing with
    /// [`BrowserError::MissingRoot`] when the root entry is absent.
    pub fn from_result(result: Value) -> Result<Self> {
        let parsed: GetDocumentResult = serde_json::from_value(result)?;
        let root = parsed.root.ok_or(BrowserError::MissingRoot)?;
        Ok(Self { root })
    }

    pub fn root_node_id(&self) -> NodeId {
        self.root.node_id
    }
}

/// Extracts the markup from a `DOM.getOuterHTML` result.
pub(crate) fn outer_html_from_result(result: Value) -> Result<String> {
    let parsed: OuterHtmlResult = serde_json::from_value(result)?;
    Ok(parsed.outer_html)
}
