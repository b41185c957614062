use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no channel named {0:?}")]
    UnknownChannel(String),

    #[error("channel {channel:?} takes arguments of type {expected}")]
    ArgumentType {
        channel: String,
        expected: &'static str,
    },

    #[error("channel {0:?} declared twice")]
    DuplicateChannel(String),

    /// A channel's reducer stream failed. Ends the whole bound instance.
    #[error("channel {channel:?} failed: {source}")]
    Channel {
        channel: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("dependency channel failed: {0}")]
    Dependency(#[source] anyhow::Error),

    /// The output channel failed. The visible timeline ends with it.
    #[error("output channel failed: {0}")]
    Output(#[source] anyhow::Error),
}
