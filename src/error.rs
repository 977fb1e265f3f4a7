use thiserror::Error;

/// Failures raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be reached or rejected the query.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A stored document no longer matches the shape the caller expects.
    #[error("malformed document in `{collection}`: {source}")]
    Malformed {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document has no string `id` field")]
    MissingId,

    #[error("cannot store timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl StoreError {
    pub(crate) fn malformed(collection: &str, source: serde_json::Error) -> Self {
        Self::Malformed {
            collection: collection.to_owned(),
            source,
        }
    }
}

/// Failures raised while building a notification feed.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// One generator failed, so the whole feed is abandoned.
    #[error("could not get notifications: {generator} generator failed")]
    AggregationFailed {
        generator: &'static str,
        #[source]
        source: StoreError,
    },
}

impl NotifyError {
    pub(crate) fn in_generator(generator: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::AggregationFailed { generator, source }
    }
}

/// Request-level failures with their own status code.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("not logged in")]
    Unauthenticated,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("dev login is disabled")]
    DevLoginDisabled,
    #[error("not a member of this conversation")]
    NotMember,
}
