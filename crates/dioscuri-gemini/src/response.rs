//! Response codec
//!
//! `<STATUS><SPACE><META>\r\n` followed by the body until the server
//! closes the connection.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::{GeminiError, Result};

/// Two digits, a space, up to 1024 bytes of meta, CRLF
const MAX_HEADER_LEN: u64 = 2 + 1 + 1024 + 2;

/// Status categories, keyed on the first digit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Input,
    SensitiveInput,
    Success,
    Redirect { permanent: bool },
    TemporaryFailure(u8),
    PermanentFailure(u8),
    CertificateRequired(u8),
}

impl Status {
    pub fn from_code(code: u8) -> Option<Self> {
        let status = match code {
            11 => Self::SensitiveInput,
            10..=19 => Self::Input,
            20..=29 => Self::Success,
            31 => Self::Redirect { permanent: true },
            30..=39 => Self::Redirect { permanent: false },
            40..=49 => Self::TemporaryFailure(code),
            50..=59 => Self::PermanentFailure(code),
            60..=69 => Self::CertificateRequired(code),
            _ => return None,
        };
        Some(status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u8,
    pub meta: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn status(&self) -> Status {
        // `code` is only ever built from a validated header
        Status::from_code(self.code).unwrap_or(Status::PermanentFailure(self.code))
    }

    /// MIME type of a success response; empty meta means `text/gemini`
    pub fn mime_type(&self) -> &str {
        let essence = self.meta.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            "text/gemini; charset=utf-8"
        } else {
            &self.meta
        }
    }

    pub fn is_gemtext(&self) -> bool {
        self.mime_type()
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/gemini"))
    }

    pub fn is_text(&self) -> bool {
        self.mime_type()
            .trim_start()
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("text/"))
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Parse a header line (without the trailing line break)
pub fn parse_header(line: &str) -> Result<(u8, String)> {
    let malformed = || GeminiError::MalformedHeader(line.chars().take(64).collect());

    let digits = line.get(..2).ok_or_else(malformed)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code: u8 = digits.parse().map_err(|_| malformed())?;
    if Status::from_code(code).is_none() {
        return Err(malformed());
    }

    let meta = match &line[2..] {
        "" => "",
        rest => rest.strip_prefix(' ').ok_or_else(malformed)?,
    };
    if meta.len() > 1024 {
        return Err(malformed());
    }

    Ok((code, meta.to_string()))
}

/// Read a full response from `reader`, refusing bodies over `max_body` bytes
pub async fn read_response<R>(reader: R, max_body: usize) -> Result<Response>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);

    let mut header = Vec::new();
    (&mut reader)
        .take(MAX_HEADER_LEN)
        .read_until(b'\n', &mut header)
        .await?;
    if header.last() != Some(&b'\n') {
        return Err(GeminiError::MalformedHeader(
            "header line not terminated".to_string(),
        ));
    }
    let line = std::str::from_utf8(&header)
        .map_err(|_| GeminiError::MalformedHeader("header is not UTF-8".to_string()))?
        .trim_end_matches(['\r', '\n']);
    let (code, meta) = parse_header(line)?;

    let mut body = Vec::new();
    let read = (&mut reader)
        .take(max_body as u64 + 1)
        .read_to_end(&mut body)
        .await;
    match read {
        Ok(_) => {}
        // Plenty of servers close without a TLS close_notify
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            tracing::trace!("Connection closed without close_notify");
        }
        Err(err) => return Err(err.into()),
    }
    if body.len() > max_body {
        return Err(GeminiError::BodyTooLarge(max_body));
    }

    tracing::debug!(code, meta = %meta, bytes = body.len(), "Gemini response");
    Ok(Response { code, meta, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn respond(raw: &[u8], max_body: usize) -> Result<Response> {
        let (mut server, client) = tokio::io::duplex(4096);
        server.write_all(raw).await.unwrap();
        drop(server);
        read_response(client, max_body).await
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(Status::from_code(10), Some(Status::Input));
        assert_eq!(Status::from_code(11), Some(Status::SensitiveInput));
        assert_eq!(Status::from_code(20), Some(Status::Success));
        assert_eq!(
            Status::from_code(31),
            Some(Status::Redirect { permanent: true })
        );
        assert_eq!(
            Status::from_code(30),
            Some(Status::Redirect { permanent: false })
        );
        assert_eq!(Status::from_code(51), Some(Status::PermanentFailure(51)));
        assert_eq!(Status::from_code(62), Some(Status::CertificateRequired(62)));
        assert_eq!(Status::from_code(7), None);
        assert_eq!(Status::from_code(70), None);
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("20 text/gemini").unwrap(),
            (20, "text/gemini".to_string())
        );
        assert_eq!(parse_header("51").unwrap(), (51, String::new()));
        assert_eq!(
            parse_header("10 Search query").unwrap(),
            (10, "Search query".to_string())
        );

        assert!(parse_header("2 text/gemini").is_err());
        assert!(parse_header("20text/gemini").is_err());
        assert!(parse_header("ab foo").is_err());
        assert!(parse_header("99 nope").is_err());
        assert!(parse_header(&format!("20 {}", "x".repeat(1025))).is_err());
    }

    #[tokio::test]
    async fn test_read_success_response() {
        let response = respond(b"20 text/gemini\r\n# Hello\n=> /a link\n", 1024)
            .await
            .unwrap();
        assert_eq!(response.code, 20);
        assert_eq!(response.status(), Status::Success);
        assert!(response.is_gemtext());
        assert_eq!(response.body_text(), "# Hello\n=> /a link\n");
    }

    #[tokio::test]
    async fn test_read_header_with_bare_newline() {
        let response = respond(b"31 gemini://example.org/new\n", 1024)
            .await
            .unwrap();
        assert_eq!(response.status(), Status::Redirect { permanent: true });
        assert_eq!(response.meta, "gemini://example.org/new");
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let result = respond(b"20 text/plain\r\n0123456789", 4).await;
        assert!(matches!(result, Err(GeminiError::BodyTooLarge(4))));

        let response = respond(b"20 text/plain\r\n0123", 4).await.unwrap();
        assert_eq!(response.body, b"0123");
    }

    #[tokio::test]
    async fn test_unterminated_header() {
        let result = respond(b"20 text/gemini", 1024).await;
        assert!(matches!(result, Err(GeminiError::MalformedHeader(_))));
    }

    #[test]
    fn test_mime_helpers() {
        let response = |meta: &str| Response {
            code: 20,
            meta: meta.to_string(),
            body: Vec::new(),
        };

        assert!(response("").is_gemtext());
        assert!(response("text/gemini; lang=en").is_gemtext());
        assert!(response("text/plain").is_text());
        assert!(!response("text/plain").is_gemtext());
        assert!(!response("image/png").is_text());
        assert_eq!(response("image/png").mime_type(), "image/png");
    }
}
