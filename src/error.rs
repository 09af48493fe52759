use thiserror::Error;

/// Errors returned by the closure-table APIs.
#[derive(Debug, Error)]
pub enum ClosureTableError {
    #[error("closure-table currently supports PostgreSQL connections only")]
    UnsupportedBackend,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("node is not tracked by this repository")]
    UntrackedNode,

    #[error("invalid sort options specified: field `{field}`, direction `{direction}`")]
    InvalidSort { field: String, direction: String },

    #[error("repository session was closed by a failed transaction")]
    SessionClosed,

    /// Raised only after the transaction has been rolled back.
    #[error("transaction failed: {0}")]
    TransactionFailed(#[source] Box<ClosureTableError>),

    #[error("hierarchy assembly failed: {0}")]
    Assembly(String),

    #[error("closure-table invariant violation: {0}")]
    Invariant(String),
}

impl ClosureTableError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }

    pub fn assembly(detail: impl Into<String>) -> Self {
        Self::Assembly(detail.into())
    }

    /// True for errors caused by bad caller input, detected before any write.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::UntrackedNode | Self::InvalidSort { .. })
    }
}
