//! Theme files and page assembly
//!
//! A theme is three HTML fragments in `themes/<name>/`: `head.html`,
//! `nav.html` (the address bar) and `body.html` (the homepage). Missing
//! files are written out with built-in defaults so users can edit them.

use std::path::Path;

use crate::html::escape_html;
use crate::Result;

const HTML_PREAMBLE: &str = "<!DOCTYPE html><html>";
const HTML_CLOSE_TAG: &str = "</html>";
const TITLE_PLACEHOLDER: &str = "{{title}}";

const DEFAULT_HEAD: &str = r#"<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1, viewport-fit=cover">
<title>{{title}} | Dioscuri</title>
<link rel="stylesheet" href="/static/css/style.css">
</head>
"#;

const DEFAULT_NAV: &str = r#"<nav>
<!-- Submits to /?address= without JS; with the wasm bundle in static/pkg it navigates client-side -->
<form id="addressbar" action="/" method="GET">
<input type="text" name="address" placeholder="geminiprotocol.net/" autocomplete="off">
<button type="submit">Go</button>
</form>
<a href="/geminiprotocol.net/">geminiprotocol.net</a>
<a href="/bbs.geminispace.org/">bbs.geminispace.org</a>
<script type="module">
import("/static/pkg/dioscuri_addressbar_web.js").then((m) => m.default()).catch(() => {});
</script>
</nav>
"#;

const DEFAULT_BODY: &str = r#"<main>
<h1>Hello, Geminispace!</h1>
<p>Type a capsule address above, e.g. <code>geminiprotocol.net/docs/</code>.</p>
</main>
"#;

const DEFAULT_STYLE: &str = r#"body { max-width: 46rem; margin: 0 auto; padding: 1rem; font-family: sans-serif; line-height: 1.5; }
nav { display: flex; gap: 1rem; align-items: center; flex-wrap: wrap; border-bottom: 1px solid #ccc; padding-bottom: .5rem; }
#addressbar { display: flex; flex: 1; gap: .5rem; }
#addressbar input { flex: 1; }
pre { overflow-x: auto; background: #f4f4f4; padding: .5rem; }
blockquote { border-left: 3px solid #ccc; margin-left: 0; padding-left: 1rem; }
"#;

#[derive(Debug, Clone)]
pub struct Theme {
    head: String,
    nav: String,
    body: String,
}

impl Theme {
    /// Load a theme, writing defaults for any missing file
    pub fn load(theme_dir: &Path, static_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(theme_dir)?;
        ensure_file(&static_dir.join("css").join("style.css"), DEFAULT_STYLE)?;

        Ok(Self {
            head: load_or_create(&theme_dir.join("head.html"), DEFAULT_HEAD)?,
            nav: load_or_create(&theme_dir.join("nav.html"), DEFAULT_NAV)?,
            body: load_or_create(&theme_dir.join("body.html"), DEFAULT_BODY)?,
        })
    }

    /// The built-in theme, without touching the filesystem
    pub fn builtin() -> Self {
        Self {
            head: DEFAULT_HEAD.to_string(),
            nav: DEFAULT_NAV.to_string(),
            body: DEFAULT_BODY.to_string(),
        }
    }

    pub fn homepage(&self) -> String {
        self.wrap("Home", &self.body)
    }

    /// A page with `content` below the address bar
    pub fn page(&self, title: &str, content: &str) -> String {
        self.wrap(title, &format!("<main>\n{content}</main>\n"))
    }

    fn wrap(&self, title: &str, main: &str) -> String {
        let head = self.head.replace(TITLE_PLACEHOLDER, &escape_html(title));
        format!(
            "{HTML_PREAMBLE}{head}<body>\n{}{main}</body>{HTML_CLOSE_TAG}",
            self.nav
        )
    }
}

fn load_or_create(path: &Path, default: &str) -> Result<String> {
    ensure_file(path, default)?;
    Ok(std::fs::read_to_string(path)?)
}

fn ensure_file(path: &Path, default: &str) -> Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default)?;
        tracing::info!(path = %path.display(), "Created default theme file");
    }
    Ok(())
}
