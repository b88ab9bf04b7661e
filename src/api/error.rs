use thiserror::Error;

pub type Result<T> = std::result::Result<T, LpmError>;

#[derive(Error, Debug)]
pub enum LpmError {
    #[error("Invalid mask length: /{mask_len} (must be 0-32)")]
    InvalidMaskLength { mask_len: u8 },
    #[error("Parse Error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("REPL Error: {0}")]
    Repl(#[from] rustyline::error::ReadlineError),
}

impl LpmError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof { expected: expected.into() }
    }
}
