pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error taxonomy. `TransientNetwork` never reaches this enum
/// directly — it is retried inside `procure_providers::retry` and only
/// surfaces here as `Provider` once the retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Validation: {message}")]
	Validation { message: String },
	#[error("Invariant violation: {message}")]
	InvariantViolation { message: String },
	#[error("Cancelled")]
	Cancelled,
}

impl From<procure_storage::Error> for Error {
	fn from(err: procure_storage::Error) -> Self {
		match err {
			procure_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			procure_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			procure_storage::Error::NotFound(message) => Self::NotFound { message },
			procure_storage::Error::Conflict(message) => Self::InvariantViolation { message },
			procure_storage::Error::InvariantViolation(message) => Self::InvariantViolation { message },
		}
	}
}

impl From<procure_providers::Error> for Error {
	fn from(err: procure_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
