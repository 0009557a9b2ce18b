use graphport_core::error::{ClassifiedError, ErrorCode};
use graphport_core::model::{SourceConstraint, SourceIndex, SourceNode, SourceRelationship};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("cannot open source {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("source is closed")]
    Closed,
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("cannot read node {id}: {reason}")]
    UnreadableNode { id: i64, reason: String },
    #[error("cannot read relationship {id}: {reason}")]
    UnreadableRelationship { id: i64, reason: String },
}

impl SourceError {
    /// Per-record failures are skipped by the migration; everything else is fatal.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            SourceError::MalformedRecord { .. }
                | SourceError::UnreadableNode { .. }
                | SourceError::UnreadableRelationship { .. }
        )
    }
}

impl ClassifiedError for SourceError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SourceError::Open { .. } => ErrorCode::Unavailable,
            SourceError::Closed => ErrorCode::FailedPrecondition,
            SourceError::MalformedRecord { .. } => ErrorCode::InvalidArgument,
            SourceError::UnreadableNode { .. } => ErrorCode::Internal,
            SourceError::UnreadableRelationship { .. } => ErrorCode::Internal,
        }
    }
}

pub type NodeIter<'a> = Box<dyn Iterator<Item = Result<SourceNode, SourceError>> + 'a>;
pub type RelationshipIter<'a> =
    Box<dyn Iterator<Item = Result<SourceRelationship, SourceError>> + 'a>;

/// Read access to the source property graph.
///
/// The outer `Result` of the enumeration methods is connection-level; the
/// per-item `Result` reports a single unreadable record, which callers skip.
/// Iteration order is whatever the source delivers and is stable for one run.
pub trait SourceGraphReader: Send + Sync {
    fn nodes(&self) -> Result<NodeIter<'_>, SourceError>;

    fn relationships(&self) -> Result<RelationshipIter<'_>, SourceError>;

    /// Nodes carrying `label`. Unreadable records are passed through so the
    /// caller can log and skip them.
    fn nodes_with_label<'a>(&'a self, label: &'a str) -> Result<NodeIter<'a>, SourceError> {
        Ok(Box::new(self.nodes()?.filter(move |item| match item {
            Ok(node) => node.has_label(label),
            Err(_) => true,
        })))
    }

    fn relationships_with_type<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> Result<RelationshipIter<'a>, SourceError> {
        Ok(Box::new(self.relationships()?.filter(move |item| match item {
            Ok(rel) => rel.rel_type == rel_type,
            Err(_) => true,
        })))
    }

    fn constraints(&self) -> Result<Vec<SourceConstraint>, SourceError>;

    fn indexes(&self) -> Result<Vec<SourceIndex>, SourceError>;

    fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
