use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] json5::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
