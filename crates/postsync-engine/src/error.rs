use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A collaborator failure that aborts a platform run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read sheet range {range}: {source}")]
    SheetRead {
        range: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to write sheet ({stage}): {source}")]
    SheetWrite {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("snapshot store error: {0}")]
    Snapshot(#[source] BoxError),
}

impl SyncError {
    pub(crate) fn sheet_read<E>(range: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SheetRead {
            range: range.to_string(),
            source: Box::new(err),
        }
    }

    pub(crate) fn sheet_write<E>(stage: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SheetWrite {
            stage,
            source: Box::new(err),
        }
    }

    pub(crate) fn snapshot<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Snapshot(Box::new(err))
    }
}
