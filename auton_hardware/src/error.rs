use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("{0} disconnected")]
    Disconnected(&'static str),
    #[error("device timeout")]
    Timeout,
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, HwError>;
