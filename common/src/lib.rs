use aws_sdk_s3::primitives::ByteStreamError;
use aws_smithy_runtime_api::client::result::CreateUnhandledError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use thiserror::Error;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Storage request rejected: {0}")]
    StorageRejected(String),

    #[error("ByteStream error: {0}")]
    ByteStream(#[from] ByteStreamError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot parse truck id from filename: {0}")]
    MalformedFilename(String),

    #[error("Payment method '{0}' not found in database")]
    PaymentMethodNotFound(String),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No files to merge")]
    EmptyBatch,
}

impl Error {
    /// Errors worth retrying: transport-level failures against S3 or the
    /// warehouse. Data errors, missing objects and rejected requests fail the
    /// same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::AwsSdk(_) | Error::Storage(_) | Error::ByteStream(_) => true,
            Error::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

// Implement From for various SdkError types
impl<E: std::fmt::Debug + CreateUnhandledError> From<SdkError<E, Response>> for Error {
    fn from(err: SdkError<E, Response>) -> Self {
        Error::AwsSdk(format!("{:?}", err))
    }
}
