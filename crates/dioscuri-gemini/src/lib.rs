//! Dioscuri Gemini Client
//!
//! - `gemini://` URL handling and the local proxy path mapping
//! - Request/response codec (`<STATUS> <META>\r\n` + body)
//! - TLS client with trust-on-first-use certificate pinning

mod client;
mod error;
mod response;
mod tofu;
mod url;

pub use client::{Client, ClientOptions};
pub use error::{GeminiError, TrustError};
pub use response::{read_response, Response, Status};
pub use tofu::{evaluate, KnownHost, KnownHosts, PresentedCertificate, TrustDecision};
pub use url::{GeminiUrl, LinkTarget, DEFAULT_PORT, MAX_REQUEST_LEN};

pub type Result<T> = std::result::Result<T, GeminiError>;
