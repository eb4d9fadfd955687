use std::error::Error as StdError;
use thiserror::Error;

use crate::validate::ValidationReport;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DraftError {
    /// One or more fields failed a step gate or the pre-publish check.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    /// An operation needing a record id ran before `initialize` resolved.
    #[error("draft has not been initialized")]
    NotInitialized,

    /// The session already holds a draft.
    #[error("draft is already initialized")]
    AlreadyInitialized,

    #[error("could not create draft: {0}")]
    Initialization(#[source] BoxError),

    #[error("could not persist draft: {0}")]
    Persistence(#[source] BoxError),

    #[error("invalid content type: {0}")]
    InvalidType(String),

    #[error("draft is already published")]
    AlreadyPublished,

    #[error("a transition is already being persisted")]
    Busy,

    #[error("draft {0} not found")]
    NotFound(String),

    #[error("draft session is closed")]
    Closed,
}

impl DraftError {
    #[inline]
    pub fn persistence(err: impl Into<BoxError>) -> Self {
        DraftError::Persistence(err.into())
    }

    #[inline]
    pub fn initialization(err: impl Into<BoxError>) -> Self {
        DraftError::Initialization(err.into())
    }

    /// Recoverable locally by the user (fix input, retry), as opposed to
    /// configuration or lifecycle mistakes by the caller.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            DraftError::Validation(_)
                | DraftError::Persistence(_)
                | DraftError::Initialization(_)
                | DraftError::NotInitialized
                | DraftError::Busy
        )
    }

    /// Message suitable for showing next to the form.
    pub fn user_message(&self) -> String {
        match self {
            DraftError::Validation(report) => report
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Please check the highlighted fields.".into()),
            DraftError::NotInitialized => "The draft is still being created. Please try again.".into(),
            DraftError::AlreadyInitialized => "This editor is already working on a draft.".into(),
            DraftError::Initialization(_) => "We couldn't start a new draft. Please try again.".into(),
            DraftError::Persistence(_) => "We couldn't save your changes. Please try again.".into(),
            DraftError::InvalidType(_) => "Something went wrong with this form.".into(),
            DraftError::AlreadyPublished => "This content has already been published.".into(),
            DraftError::Busy => "Still saving, please wait a moment.".into(),
            DraftError::NotFound(_) => "This draft no longer exists.".into(),
            DraftError::Closed => "This editor has been closed.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FieldError;

    #[test]
    fn validation_user_message_is_first_field_error() {
        let report = ValidationReport::from(vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("location", "Location is required"),
        ]);
        let err = DraftError::Validation(report);
        assert_eq!(err.user_message(), "Title is required");
        assert!(err.is_user_recoverable());
    }

    #[test]
    fn persistence_message_hides_cause() {
        let err = DraftError::persistence("connection reset by peer");
        assert!(!err.user_message().contains("connection"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn invalid_type_is_not_user_recoverable() {
        assert!(!DraftError::InvalidType("coupon".into()).is_user_recoverable());
        assert!(!DraftError::AlreadyPublished.is_user_recoverable());
    }
}
