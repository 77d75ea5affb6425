pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<biolink_domain::Error> for Error {
	fn from(err: biolink_domain::Error) -> Self {
		match err {
			biolink_domain::Error::Validation { message } => Self::Validation { message },
		}
	}
}

impl From<biolink_providers::Error> for Error {
	fn from(err: biolink_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<biolink_storage::Error> for Error {
	fn from(err: biolink_storage::Error) -> Self {
		match err {
			biolink_storage::Error::InvalidArgument(message) => Self::Validation { message },
			biolink_storage::Error::DimensionMismatch { .. } =>
				Self::Provider { message: err.to_string() },
			biolink_storage::Error::Io { .. } | biolink_storage::Error::SerdeJson(_) =>
				Self::Storage { message: err.to_string() },
		}
	}
}
