//! Dioscuri Core
//!
//! Everything between an HTTP request and a Gemini capsule:
//! configuration, theme files, gemtext rendering and the [`Browser`]
//! that turns Gemini responses into pages.

mod browser;
mod config;
mod error;
mod gemtext;
mod html;
mod theme;

pub use browser::{Browser, Page};
pub use config::Config;
pub use error::CoreError;
pub use gemtext::{render_gemtext, Rendered};
pub use html::escape_html;
pub use theme::Theme;

// Re-export the protocol layer for the server
pub use dioscuri_gemini::{
    GeminiError, GeminiUrl, KnownHost, KnownHosts, LinkTarget, PresentedCertificate, Response,
    Status, TrustError,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
