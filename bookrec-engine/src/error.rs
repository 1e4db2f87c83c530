use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
	#[error("Malformed input: {0}")]
	MalformedInput(String),
	#[error("Table '{table}' unavailable: {reason}")]
	DataUnavailable { table: String, reason: String },
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl LibraryError {
	pub fn code(&self) -> &str {
		match self {
			Self::MalformedInput(_) => "BOOKREC_MALFORMED_INPUT",
			Self::DataUnavailable { .. } => "BOOKREC_DATA_UNAVAILABLE",
			Self::Io(_) => "BOOKREC_IO",
			Self::Serialization(_) => "BOOKREC_SERIALIZATION",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"libraryCode": self.code(),
			"message": self.to_string(),
		})
	}
}
