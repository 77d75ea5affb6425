pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	InvalidArgument(String),
	#[error("Vector has {actual} dimensions, expected {expected}.")]
	DimensionMismatch { expected: usize, actual: usize },
	#[error("Graph store I/O failed at {path:?}.")]
	Io { path: std::path::PathBuf, source: std::io::Error },
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}
