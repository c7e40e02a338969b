use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
	Truncated { offset: usize, needed: usize, available: usize },
	#[error("failed to decompress block at offset {offset}: {reason}")]
	Decompression { offset: usize, reason: String },
	#[error("unrecognized level format (version {version:#010x})")]
	UnrecognizedFormat { version: u32 },
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn is_truncated(&self) -> bool {
		matches!(self, Error::Truncated { .. })
	}
}

pub type Result<T> = std::result::Result<T, Error>;
