use graphport_core::error::{ClassifiedError, ErrorCode};
use source::SourceError;
use storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Destination error: {0}")]
    Destination(#[from] StoreError),
}

impl MigrationError {
    /// Connection-level failures end the run. Anything else is recorded
    /// against a single entity and the run continues.
    pub fn is_fatal(&self) -> bool {
        match self {
            MigrationError::Source(err) => !err.is_record_level(),
            MigrationError::Destination(err) => matches!(
                err,
                StoreError::Wal(_)
                    | StoreError::Io(_)
                    | StoreError::DestinationExists(_)
                    | StoreError::DestinationMissing(_)
            ),
        }
    }
}

impl ClassifiedError for MigrationError {
    fn error_code(&self) -> ErrorCode {
        match self {
            MigrationError::Source(err) => err.error_code(),
            MigrationError::Destination(err) => err.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_destination_is_fatal() {
        let err = MigrationError::from(StoreError::DestinationExists("/tmp/db".into()));
        assert!(err.is_fatal());
        assert_eq!(err.error_code(), ErrorCode::AlreadyExists);
    }

    #[test]
    fn unreadable_record_is_not_fatal() {
        let err = MigrationError::from(SourceError::UnreadableNode {
            id: 4,
            reason: "truncated".into(),
        });
        assert!(!err.is_fatal());
        assert!(MigrationError::from(SourceError::Closed).is_fatal());
    }

    #[test]
    fn duplicate_key_is_not_fatal() {
        let err = MigrationError::from(StoreError::DuplicateKey {
            index: "Person.email".into(),
            key: "s:a@b".into(),
        });
        assert!(!err.is_fatal());
    }
}
