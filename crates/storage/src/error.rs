use thiserror::Error;

/// A failed store operation, tagged with the collection and operation names.
#[derive(Error, Debug)]
#[error("{operation} on collection '{collection}' failed: {kind}")]
pub struct StoreError {
    pub collection: String,
    pub operation: &'static str,
    #[source]
    pub kind: StoreErrorKind,
}

impl StoreError {
    pub fn new(collection: &str, operation: &'static str, kind: impl Into<StoreErrorKind>) -> Self {
        Self {
            collection: collection.to_string(),
            operation,
            kind: kind.into(),
        }
    }

    /// Adapter for `map_err` on sqlx results.
    pub fn db<'a>(collection: &'a str, operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self + 'a {
        move |e| Self::new(collection, operation, e)
    }
}

#[derive(Error, Debug)]
pub enum StoreErrorKind {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("collection does not exist")]
    CollectionMissing,

    #[error("collection already exists")]
    CollectionExists,

    #[error("{chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("nothing to insert")]
    Empty,
}
