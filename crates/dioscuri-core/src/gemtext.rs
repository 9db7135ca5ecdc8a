//! Gemtext to HTML
//!
//! Line oriented; see the `text/gemini` format. Links to Gemini URLs,
//! absolute or relative, are rewritten to their local proxy path so the
//! page keeps browsing through the proxy.

use dioscuri_gemini::{GeminiUrl, LinkTarget};

use crate::html::escape_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// First heading on the page, if any
    pub title: Option<String>,
    pub html: String,
}

/// Render a gemtext document fetched from `base`
pub fn render_gemtext(source: &str, base: &GeminiUrl) -> Rendered {
    let mut html = String::with_capacity(source.len() * 2);
    let mut title = None;
    let mut in_list = false;
    let mut preformatted = false;

    for line in source.lines() {
        if preformatted {
            if line.starts_with("```") {
                html.push_str("</pre>\n");
                preformatted = false;
            } else {
                html.push_str(&escape_html(line));
                html.push('\n');
            }
            continue;
        }

        if let Some(item) = line.strip_prefix("* ") {
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{}</li>\n", escape_html(item.trim())));
            continue;
        }

        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }

        if let Some(alt) = line.strip_prefix("```") {
            let alt = alt.trim();
            if alt.is_empty() {
                html.push_str("<pre>");
            } else {
                html.push_str(&format!("<pre aria-label=\"{}\">", escape_html(alt)));
            }
            preformatted = true;
        } else if let Some(rest) = line.strip_prefix("=>") {
            html.push_str(&render_link(rest, base));
        } else if let Some((level, text)) = heading(line) {
            if title.is_none() && !text.is_empty() {
                title = Some(text.to_string());
            }
            html.push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(text)));
        } else if let Some(quote) = line.strip_prefix('>') {
            html.push_str(&format!(
                "<blockquote>{}</blockquote>\n",
                escape_html(quote.trim())
            ));
        } else if !line.trim().is_empty() {
            html.push_str(&format!("<p>{}</p>\n", escape_html(line)));
        }
    }

    if in_list {
        html.push_str("</ul>\n");
    }
    if preformatted {
        html.push_str("</pre>\n");
    }

    Rendered { title, html }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    ["###", "##", "#"]
        .into_iter()
        .zip([3u8, 2, 1])
        .find_map(|(marker, level)| line.strip_prefix(marker).map(|text| (level, text.trim())))
}

fn render_link(rest: &str, base: &GeminiUrl) -> String {
    let rest = rest.trim();
    let (target, label) = match rest.split_once(char::is_whitespace) {
        Some((target, label)) => (target, label.trim()),
        None => (rest, ""),
    };
    if target.is_empty() {
        return String::new();
    }

    let href = match base.resolve(target) {
        Some(LinkTarget::Gemini(url)) => url.proxy_path(),
        Some(LinkTarget::External(url)) => url,
        None => target.to_string(),
    };
    let label = if label.is_empty() { target } else { label };

    format!(
        "<p><a href=\"{}\">{}</a></p>\n",
        escape_html(&href),
        escape_html(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GeminiUrl {
        GeminiUrl::parse("gemini://example.org/docs/index.gmi").unwrap()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let rendered = render_gemtext("# Title\nThis is a paragraph.\n\n## Sub", &base());
        assert_eq!(
            rendered.html,
            "<h1>Title</h1>\n<p>This is a paragraph.</p>\n<h2>Sub</h2>\n"
        );
        assert_eq!(rendered.title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_links_are_rewritten() {
        let source = "=>/relative/link.gmi\n\
                      => faq.gmi my custom / text!\n\
                      =>gemini://new_address.net/foo.gmi go to new address!\n\
                      => https://example.com/ the web";
        let html = render_gemtext(source, &base()).html;
        let lines: Vec<&str> = html.lines().collect();

        assert_eq!(
            lines[0],
            "<p><a href=\"/example.org/relative/link.gmi\">/relative/link.gmi</a></p>"
        );
        assert_eq!(
            lines[1],
            "<p><a href=\"/example.org/docs/faq.gmi\">my custom / text!</a></p>"
        );
        assert_eq!(
            lines[2],
            "<p><a href=\"/new_address.net/foo.gmi\">go to new address!</a></p>"
        );
        assert_eq!(
            lines[3],
            "<p><a href=\"https://example.com/\">the web</a></p>"
        );
    }

    #[test]
    fn test_list_items_are_grouped() {
        let html = render_gemtext("* one\n* two\nafter", &base()).html;
        assert_eq!(html, "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<p>after</p>\n");
    }

    #[test]
    fn test_preformatted_block_is_verbatim() {
        let source = "```rust code\nfn main() { a < b }\n=> not a link\n```\ndone";
        let html = render_gemtext(source, &base()).html;
        assert_eq!(
            html,
            "<pre aria-label=\"rust code\">fn main() { a &lt; b }\n=&gt; not a link\n</pre>\n<p>done</p>\n"
        );
    }

    #[test]
    fn test_unterminated_blocks_are_closed() {
        let html = render_gemtext("* item\n```\nraw", &base()).html;
        assert_eq!(html, "<ul>\n<li>item</li>\n</ul>\n<pre>raw\n</pre>\n");
    }

    #[test]
    fn test_quote_and_escaping() {
        let rendered = render_gemtext("> <b>quoted</b>\nplain & simple", &base());
        assert_eq!(
            rendered.html,
            "<blockquote>&lt;b&gt;quoted&lt;/b&gt;</blockquote>\n<p>plain &amp; simple</p>\n"
        );
        assert_eq!(rendered.title, None);
    }
}
