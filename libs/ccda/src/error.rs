use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("XML syntax error at byte {position}: {message}")]
    XmlSyntax { position: usize, message: String },

    #[error("XML input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Error::XmlSyntax {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
