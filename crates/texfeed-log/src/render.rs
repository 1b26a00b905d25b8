use crate::ir::Diagnostic;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Template used when none is configured: a plain `file://` link.
pub const DEFAULT_LINK_TEMPLATE: &str = "{url}";

/// Turns classified output into HTML fragments.
///
/// Link targets come from a template with three placeholders:
/// `{url}` (the `file://` URL of the file), `{path}` and `{line}` (empty when
/// the diagnostic has no line).
#[derive(Debug, Clone)]
pub struct Renderer {
    base_dir: Option<PathBuf>,
    link_template: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Renderer {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            link_template: DEFAULT_LINK_TEMPLATE.to_string(),
        }
    }

    pub fn with_link_template(mut self, template: impl Into<String>) -> Self {
        self.link_template = template.into();
        self
    }

    /// Rewrites a `.`-relative path against the base directory.
    ///
    /// Other paths, and every path when no base directory is known, are
    /// returned unchanged.
    pub fn normalize(&self, file: &str) -> String {
        match &self.base_dir {
            Some(base) if file.starts_with('.') => {
                lexical_join(base, file).to_string_lossy().into_owned()
            }
            _ => file.to_string(),
        }
    }

    /// Link target for `file` at `line`.
    pub fn link(&self, file: &str, line: Option<u32>) -> String {
        let url = url::Url::from_file_path(file)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{file}"));
        let line = line.map(|n| n.to_string()).unwrap_or_default();
        self.link_template
            .replace("{url}", &url)
            .replace("{path}", file)
            .replace("{line}", &line)
    }

    /// `<p><a href="…">basename[:line]</a> message</p>` for a diagnostic
    /// whose file has already been resolved to `file`.
    pub fn diagnostic(&self, file: &str, diagnostic: &Diagnostic) -> String {
        let basename = Path::new(file)
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or(Cow::Borrowed(file));
        let location = match diagnostic.line {
            Some(line) => format!("{basename}:{line}"),
            None => basename.into_owned(),
        };
        format!(
            "<p><a href=\"{}\">{}</a> {}</p>",
            encode_double_quoted_attribute(&self.link(file, diagnostic.line)),
            encode_text(&location),
            encode_text(&diagnostic.message)
        )
    }

    pub fn headline(&self, text: &str) -> String {
        format!("<h4>{}…</h4>", encode_text(text))
    }

    pub fn separator(&self) -> String {
        "<hr/>".to_string()
    }
}

/// Joins `relative` onto `base`, folding `.` and `..` components.
fn lexical_join(base: &Path, relative: &str) -> PathBuf {
    let mut joined = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                joined.pop();
            }
            other => joined.push(other.as_os_str()),
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DiagnosticKind, Severity};

    fn diag(line: Option<u32>, message: &str) -> Diagnostic {
        Diagnostic {
            file: None,
            line,
            message: message.to_string(),
            severity: Severity::None,
            kind: DiagnosticKind::Error,
        }
    }

    #[cfg(unix)]
    #[test]
    fn relative_paths_resolve_against_base() {
        let renderer = Renderer::new(Some(PathBuf::from("/home/me/thesis")));
        assert_eq!(
            renderer.normalize("./chapters/intro.tex"),
            "/home/me/thesis/chapters/intro.tex"
        );
        assert_eq!(renderer.normalize("../shared/macros.tex"), "/home/me/shared/macros.tex");
        assert_eq!(renderer.normalize("/abs/file.tex"), "/abs/file.tex");
        assert_eq!(renderer.normalize("plain.tex"), "plain.tex");
    }

    #[test]
    fn relative_path_without_base_is_kept() {
        assert_eq!(Renderer::default().normalize("./main.tex"), "./main.tex");
    }

    #[cfg(unix)]
    #[test]
    fn diagnostic_fragment_shape() {
        let renderer = Renderer::default();
        let html = renderer.diagnostic("/doc/main.tex", &diag(Some(12), "\\foo"));
        assert_eq!(
            html,
            "<p><a href=\"file:///doc/main.tex\">main.tex:12</a> \\foo</p>"
        );

        let html = renderer.diagnostic("/doc/main.tex", &diag(None, "! Emergency stop."));
        assert_eq!(
            html,
            "<p><a href=\"file:///doc/main.tex\">main.tex</a> ! Emergency stop.</p>"
        );
    }

    #[cfg(unix)]
    #[test]
    fn link_template_placeholders() {
        let renderer = Renderer::default().with_link_template("txmt://open?url={url}&line={line}");
        assert_eq!(
            renderer.link("/doc/my thesis.tex", Some(3)),
            "txmt://open?url=file:///doc/my%20thesis.tex&line=3"
        );
        assert_eq!(renderer.link("/doc/a.tex", None), "txmt://open?url=file:///doc/a.tex&line=");
    }

    #[test]
    fn markup_in_messages_is_escaped() {
        let renderer = Renderer::default();
        let html = renderer.diagnostic("main.tex", &diag(None, "<argument> a & b"));
        assert!(html.ends_with("&lt;argument&gt; a &amp; b</p>"));
        assert_eq!(renderer.headline("Running <bibtex>"), "<h4>Running &lt;bibtex&gt;…</h4>");
    }

    #[test]
    fn link_is_escaped_inside_href() {
        let renderer = Renderer::default().with_link_template("open?path={path}&line={line}");
        let html = renderer.diagnostic("say \"hi\".tex", &diag(Some(2), "x"));
        assert!(html.starts_with("<p><a href=\"open?path=say &quot;hi&quot;.tex&amp;line=2\">"));
    }
}
