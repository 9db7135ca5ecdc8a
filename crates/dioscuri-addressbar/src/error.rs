//! Address bar error types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Destination must start with '/': {0}")]
    NotAPath(String),

    #[error("Address is empty")]
    Empty,

    #[error("Destination is not valid UTF-8 once decoded: {0}")]
    InvalidUtf8(String),
}
