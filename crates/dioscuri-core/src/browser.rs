//! Main browser state container
//!
//! Owns the Gemini client, the pinned-host store and the theme, and
//! turns each Gemini response into something the HTTP layer can send.

use dioscuri_gemini::{
    Client, GeminiError, GeminiUrl, KnownHosts, LinkTarget, Response, Status, TrustError,
};
use dioscuri_storage::Database;

use crate::config::Config;
use crate::gemtext::render_gemtext;
use crate::html::escape_html;
use crate::theme::Theme;
use crate::Result;

/// What to send back for one proxied request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Html { status: u16, html: String },
    Raw { mime: String, body: Vec<u8> },
    Redirect { location: String, permanent: bool },
}

pub struct Browser {
    config: Config,
    client: Client,
    theme: Theme,
}

impl Browser {
    /// Open the database, load the theme and build the client
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let db = Database::open(config.database_path())?;
        let theme = Theme::load(&config.theme_dir(), &config.static_dir())?;
        let client = Client::new(KnownHosts::new(db), config.client_options());

        tracing::info!(
            data_dir = %config.data_dir.display(),
            theme = %config.theme,
            "Browser initialized"
        );

        Ok(Self::with_parts(config, client, theme))
    }

    pub fn with_parts(config: Config, client: Client, theme: Theme) -> Self {
        Self {
            config,
            client,
            theme,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn known_hosts(&self) -> &KnownHosts {
        self.client.known_hosts()
    }

    pub fn homepage(&self) -> String {
        self.theme.homepage()
    }

    /// Fetch a capsule page and convert the response
    pub async fn visit(&self, url: &GeminiUrl) -> Page {
        match self.client.fetch(url).await {
            Ok(response) => self.present(url, response),
            Err(err) => {
                tracing::warn!(%url, error = %err, "Gemini request failed");
                self.fetch_error_page(url, &err)
            }
        }
    }

    /// Convert a Gemini response for `url` into a page
    pub fn present(&self, url: &GeminiUrl, response: Response) -> Page {
        match response.status() {
            Status::Input => self.input_page(url, &response.meta, false),
            Status::SensitiveInput => self.input_page(url, &response.meta, true),
            Status::Success if response.is_gemtext() => {
                let rendered = render_gemtext(&response.body_text(), url);
                let title = rendered.title.unwrap_or_else(|| url.to_string());
                Page::Html {
                    status: 200,
                    html: self.theme.page(&title, &rendered.html),
                }
            }
            Status::Success if response.is_text() => {
                let content = format!("<pre>{}</pre>\n", escape_html(&response.body_text()));
                Page::Html {
                    status: 200,
                    html: self.theme.page(url.as_str(), &content),
                }
            }
            Status::Success => Page::Raw {
                mime: response.mime_type().to_string(),
                body: response.body,
            },
            Status::Redirect { permanent } => match url.resolve(&response.meta) {
                Some(LinkTarget::Gemini(target)) => Page::Redirect {
                    location: target.proxy_path(),
                    permanent,
                },
                Some(LinkTarget::External(target)) => Page::Redirect {
                    location: target,
                    permanent,
                },
                None => self.error_page(
                    502,
                    "Invalid redirect",
                    &format!("{url} redirected to {:?}", response.meta),
                ),
            },
            Status::TemporaryFailure(code) | Status::PermanentFailure(code) => {
                let status = match code {
                    44 => 429,
                    51 => 404,
                    52 => 410,
                    59 => 400,
                    40..=49 => 503,
                    _ => 502,
                };
                let message = if response.meta.is_empty() {
                    format!("{url} answered with status {code}")
                } else {
                    response.meta.clone()
                };
                self.error_page(status, &format!("Error {code}"), &message)
            }
            Status::CertificateRequired(code) => self.error_page(
                403,
                &format!("Error {code}"),
                "This capsule requires a client certificate, which Dioscuri does not support.",
            ),
        }
    }

    fn input_page(&self, url: &GeminiUrl, prompt: &str, sensitive: bool) -> Page {
        let action = url.with_raw_query(None).proxy_path();
        let input_type = if sensitive { "password" } else { "text" };
        let prompt = if prompt.is_empty() { "Input" } else { prompt };
        let content = format!(
            "<form class=\"gemini-input\" action=\"{}\" method=\"POST\">\n\
             <label for=\"gemini-input\">{}</label>\n\
             <input id=\"gemini-input\" type=\"{input_type}\" name=\"input\" autofocus>\n\
             <button type=\"submit\">Send</button>\n\
             </form>\n",
            escape_html(&action),
            escape_html(prompt),
        );
        Page::Html {
            status: 200,
            html: self.theme.page(prompt, &content),
        }
    }

    fn fetch_error_page(&self, url: &GeminiUrl, err: &GeminiError) -> Page {
        match err {
            GeminiError::Untrusted(TrustError::KeyMismatch(host)) => self.error_page(
                502,
                "Certificate changed",
                &format!(
                    "{host} presented a different key than the one pinned on first visit. \
                     If the change is expected, remove the pin with \
                     DELETE /api/known-hosts/{host} and reload."
                ),
            ),
            GeminiError::Timeout(_) => self.error_page(504, "Timed out", &format!("{url}: {err}")),
            GeminiError::InvalidUrl(_) | GeminiError::RequestTooLong(_) => {
                self.error_page(400, "Bad address", &err.to_string())
            }
            _ => self.error_page(502, "Could not load capsule", &format!("{url}: {err}")),
        }
    }

    pub fn error_page(&self, status: u16, title: &str, message: &str) -> Page {
        let content = format!(
            "<h1>{}</h1>\n<p>{}</p>\n",
            escape_html(title),
            escape_html(message)
        );
        Page::Html {
            status,
            html: self.theme.page(title, &content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dioscuri_gemini::ClientOptions;

    fn browser() -> Browser {
        let known_hosts = KnownHosts::new(Database::open_in_memory().unwrap());
        Browser::with_parts(
            Config::new(std::env::temp_dir()),
            Client::new(known_hosts, ClientOptions::default()),
            Theme::builtin(),
        )
    }

    fn url() -> GeminiUrl {
        GeminiUrl::parse("gemini://example.org/dir/page.gmi").unwrap()
    }

    fn response(code: u8, meta: &str, body: &[u8]) -> Response {
        Response {
            code,
            meta: meta.to_string(),
            body: body.to_vec(),
        }
    }

    fn html_of(page: Page) -> (u16, String) {
        match page {
            Page::Html { status, html } => (status, html),
            other => panic!("Expected Html, got {other:?}"),
        }
    }

    #[test]
    fn test_gemtext_page() {
        let page = browser().present(&url(), response(20, "text/gemini", b"# Welcome\n=> next.gmi"));
        let (status, html) = html_of(page);
        assert_eq!(status, 200);
        assert!(html.contains("<title>Welcome | Dioscuri</title>"));
        assert!(html.contains("href=\"/example.org/dir/next.gmi\""));
    }

    #[test]
    fn test_plain_text_and_binary() {
        let (_, html) = html_of(browser().present(&url(), response(20, "text/plain", b"a < b")));
        assert!(html.contains("<pre>a &lt; b</pre>"));

        let page = browser().present(&url(), response(20, "image/png", &[0x89, b'P']));
        assert_eq!(
            page,
            Page::Raw {
                mime: "image/png".to_string(),
                body: vec![0x89, b'P'],
            }
        );
    }

    #[test]
    fn test_redirects() {
        let page = browser().present(&url(), response(31, "/moved/", b""));
        assert_eq!(
            page,
            Page::Redirect {
                location: "/example.org/moved/".to_string(),
                permanent: true,
            }
        );

        let page = browser().present(&url(), response(30, "https://example.com/", b""));
        assert_eq!(
            page,
            Page::Redirect {
                location: "https://example.com/".to_string(),
                permanent: false,
            }
        );
    }

    #[test]
    fn test_input_prompts() {
        let (status, html) = html_of(browser().present(&url(), response(10, "Search for?", b"")));
        assert_eq!(status, 200);
        assert!(html.contains("action=\"/example.org/dir/page.gmi\" method=\"POST\""));
        assert!(html.contains("type=\"text\" name=\"input\""));
        assert!(html.contains("Search for?"));

        let (_, html) = html_of(browser().present(&url(), response(11, "Password", b"")));
        assert!(html.contains("type=\"password\""));
    }

    #[test]
    fn test_failure_status_mapping() {
        let status_for = |code: u8| html_of(browser().present(&url(), response(code, "", b""))).0;
        assert_eq!(status_for(51), 404);
        assert_eq!(status_for(52), 410);
        assert_eq!(status_for(59), 400);
        assert_eq!(status_for(44), 429);
        assert_eq!(status_for(41), 503);
        assert_eq!(status_for(50), 502);
        assert_eq!(status_for(60), 403);
    }

    #[test]
    fn test_fetch_error_status_mapping() {
        let browser = browser();
        let status_for = |err: GeminiError| html_of(browser.fetch_error_page(&url(), &err));

        let (status, _) = status_for(GeminiError::Timeout("waiting for response"));
        assert_eq!(status, 504);

        let (status, html) = status_for(GeminiError::Untrusted(TrustError::KeyMismatch(
            "example.org:1965".to_string(),
        )));
        assert_eq!(status, 502);
        assert!(html.contains("<h1>Certificate changed</h1>"));
        assert!(html.contains("DELETE /api/known-hosts/example.org:1965"));

        let (status, html) = status_for(GeminiError::InvalidUrl("nope".to_string()));
        assert_eq!(status, 400);
        assert!(html.contains("Bad address"));
        assert_eq!(status_for(GeminiError::RequestTooLong(2048)).0, 400);

        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let (status, html) = status_for(GeminiError::Io(refused));
        assert_eq!(status, 502);
        assert!(html.contains("Could not load capsule"));
        assert_eq!(
            status_for(GeminiError::MalformedHeader("junk".to_string())).0,
            502
        );
        assert_eq!(
            status_for(GeminiError::Untrusted(TrustError::Expired)).0,
            502
        );
    }

    #[test]
    fn test_failure_meta_is_shown_escaped() {
        let (_, html) = html_of(browser().present(&url(), response(51, "No <such> page", b"")));
        assert!(html.contains("No &lt;such&gt; page"));
    }
}
