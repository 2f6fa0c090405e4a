//! Reading texts, commentary notes and introductions.
//!
//! TEI XML under `<file_root>/xml/<kind>/` is transformed to HTML by a
//! [`TextRenderer`] and cached under `<file_root>/cache/<kind>/`. A cached
//! file is reused until the document or the stylesheet is modified.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::store::EditionStatus;
use crate::config::ProjectConfig;

pub const NOT_FOUND: &str = "Content does not exist";
pub const NOT_PUBLISHED: &str = "Content is not published";
pub const NOT_EXTERNALLY_PUBLISHED: &str = "Content is not externally published";
pub const FILE_NOT_FOUND: &str = "File not found";
pub const RENDER_FAILED: &str = "Error parsing document";

const SLS_TEI_NAMESPACE: &str = r#"xmlns="http://www.sls.fi/tei""#;
const TEI_NAMESPACE: &str = r#"xmlns="http://www.tei-c.org/ns/1.0""#;

/// Reason a text may not be shown, as the message returned in its place.
pub fn gate(edition: Option<&EditionStatus>, project: &ProjectConfig) -> Option<&'static str> {
    let Some(edition) = edition else {
        return Some(NOT_FOUND);
    };
    let level = edition.lansering.unwrap_or(0);
    if level < 1 && !project.show_unpublished {
        Some(NOT_PUBLISHED)
    } else if level == 1 && !project.show_internally_published && !project.show_unpublished {
        Some(NOT_EXTERNALLY_PUBLISHED)
    } else {
        None
    }
}

/// The edition a text id belongs to: everything before the first `_`.
pub fn edition_of(text_id: &str) -> &str {
    text_id.split('_').next().unwrap_or(text_id)
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("transformation failed: {0}")]
    Failed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextRenderer: Send + Sync {
    /// Transform `document` with `stylesheet`, passing `params` as string
    /// parameters.
    async fn render(
        &self,
        stylesheet: &Path,
        document: &Path,
        params: &[(String, String)],
    ) -> Result<String, RenderError>;
}

/// [`TextRenderer`] running libxslt's `xsltproc`.
///
/// The document is fed on stdin after the legacy SLS TEI namespace has been
/// replaced with the standard TEI one.
pub struct XsltProc {
    program: PathBuf,
}

impl XsltProc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl TextRenderer for XsltProc {
    async fn render(
        &self,
        stylesheet: &Path,
        document: &Path,
        params: &[(String, String)],
    ) -> Result<String, RenderError> {
        let source = fs::read_to_string(document)
            .await?
            .replace(SLS_TEI_NAMESPACE, TEI_NAMESPACE);

        let mut cmd = Command::new(&self.program);
        for (name, value) in params {
            cmd.arg("--stringparam").arg(name).arg(value);
        }
        cmd.arg(stylesheet)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // A processor that exits early closes the pipe; its status says why.
            if let Err(e) = stdin.write_all(source.as_bytes()).await {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(RenderError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Everything needed to produce one text.
#[derive(Debug, Clone)]
pub struct TextSource {
    pub document: PathBuf,
    pub stylesheet: PathBuf,
    pub cache: PathBuf,
    pub params: Vec<(String, String)>,
}

/// Return the cached HTML for `source`, rendering and caching it first when
/// the cache is missing or stale. Failures are reported as message text.
pub async fn load(renderer: &dyn TextRenderer, source: &TextSource) -> String {
    if let Some(cached) = read_fresh_cache(source).await {
        debug!(cache = %source.cache.display(), "serving text from cache");
        return cached;
    }

    if !fs::try_exists(&source.document).await.unwrap_or(false) {
        debug!(document = %source.document.display(), "text document missing");
        return FILE_NOT_FOUND.to_owned();
    }

    let html = match renderer
        .render(&source.stylesheet, &source.document, &source.params)
        .await
    {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, document = %source.document.display(), "text transformation failed");
            return RENDER_FAILED.to_owned();
        }
    };
    info!(document = %source.document.display(), "text rendered");

    if let Err(e) = write_cache(&source.cache, &html).await {
        warn!(error = %e, cache = %source.cache.display(), "could not write text cache");
    }
    html
}

async fn read_fresh_cache(source: &TextSource) -> Option<String> {
    let cached_at = fs::metadata(&source.cache).await.ok()?.modified().ok()?;
    for input in [&source.document, &source.stylesheet] {
        if let Ok(modified) = fs::metadata(input).await.and_then(|m| m.modified()) {
            if modified > cached_at {
                debug!(cache = %source.cache.display(), "text cache is stale");
                return None;
            }
        }
    }
    match fs::read_to_string(&source.cache).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, cache = %source.cache.display(), "could not read text cache");
            None
        }
    }
}

async fn write_cache(path: &Path, html: &str) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    fs::write(path, html).await
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn project(show_unpublished: bool, show_internally_published: bool) -> ProjectConfig {
        let yaml = format!(
            "address: db\nusername: u\npassword: p\ndatabase: d\n\
             show_unpublished: {show_unpublished}\n\
             show_internally_published: {show_internally_published}\n"
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn edition(lansering: i64) -> EditionStatus {
        EditionStatus {
            id: 1,
            lansering: Some(lansering),
            multiple_files: None,
        }
    }

    #[test]
    fn gate_messages() {
        let public = project(false, false);
        assert_eq!(gate(None, &public), Some(NOT_FOUND));
        assert_eq!(gate(Some(&edition(0)), &public), Some(NOT_PUBLISHED));
        assert_eq!(gate(Some(&edition(1)), &public), Some(NOT_EXTERNALLY_PUBLISHED));
        assert_eq!(gate(Some(&edition(2)), &public), None);

        let internal = project(false, true);
        assert_eq!(gate(Some(&edition(0)), &internal), Some(NOT_PUBLISHED));
        assert_eq!(gate(Some(&edition(1)), &internal), None);

        let everything = project(true, false);
        assert_eq!(gate(Some(&edition(0)), &everything), None);
        assert_eq!(gate(Some(&edition(1)), &everything), None);
    }

    #[test]
    fn launch_level_is_the_only_gate() {
        let letters = EditionStatus {
            id: 15,
            lansering: Some(2),
            multiple_files: None,
        };
        assert_eq!(edition_of("15_2036_est"), "15");
        assert_eq!(gate(Some(&letters), &project(false, false)), None);
    }

    #[test]
    fn edition_is_prefix_of_text_id() {
        assert_eq!(edition_of("15_2036_est"), "15");
        assert_eq!(edition_of("7"), "7");
    }

    fn source(dir: &Path) -> TextSource {
        TextSource {
            document: dir.join("xml/est/1_2_est.xml"),
            stylesheet: dir.join("est.xsl"),
            cache: dir.join("cache/est/1_2_est.html"),
            params: Vec::new(),
        }
    }

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn backdate(path: &Path) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
    }

    #[tokio::test]
    async fn renders_once_then_serves_cache() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        write(&src.document, "<TEI/>");
        write(&src.stylesheet, "<xsl/>");
        backdate(&src.document);
        backdate(&src.stylesheet);

        let mut renderer = MockTextRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(|_, _, _| Ok("<p id=\"a\">text</p>".into()));

        assert_eq!(load(&renderer, &src).await, "<p id=\"a\">text</p>");
        assert_eq!(
            std::fs::read_to_string(&src.cache).unwrap(),
            "<p id=\"a\">text</p>"
        );
        assert_eq!(load(&renderer, &src).await, "<p id=\"a\">text</p>");
    }

    #[tokio::test]
    async fn stale_cache_is_rerendered() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        write(&src.document, "<TEI/>");
        write(&src.stylesheet, "<xsl/>");
        write(&src.cache, "old");
        backdate(&src.cache);

        let mut renderer = MockTextRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(|_, _, _| Ok("new".into()));

        assert_eq!(load(&renderer, &src).await, "new");
        assert_eq!(std::fs::read_to_string(&src.cache).unwrap(), "new");
    }

    #[tokio::test]
    async fn missing_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = MockTextRenderer::new();
        renderer.expect_render().never();
        assert_eq!(load(&renderer, &source(dir.path())).await, FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn render_failure_is_reported_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        write(&src.document, "<TEI");

        let mut renderer = MockTextRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _, _| Err(RenderError::Failed("parse error".into())));

        assert_eq!(load(&renderer, &src).await, RENDER_FAILED);
        assert!(!src.cache.exists());
    }

    #[tokio::test]
    async fn unwritable_cache_still_returns_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = source(dir.path());
        write(&src.document, "<TEI/>");
        // A regular file where the cache directory should be.
        write(&dir.path().join("blocked"), "");
        src.cache = dir.path().join("blocked/est/1_2_est.html");

        let mut renderer = MockTextRenderer::new();
        renderer.expect_render().returning(|_, _, _| Ok("html".into()));

        assert_eq!(load(&renderer, &src).await, "html");
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-xsltproc");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn xsltproc_gets_params_and_rewritten_document() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo \"$@\"\ncat");
        let doc = dir.path().join("1_com.xml");
        std::fs::write(&doc, r#"<TEI xmlns="http://www.sls.fi/tei"/>"#).unwrap();

        let out = XsltProc::new(program)
            .render(
                Path::new("notes.xsl"),
                &doc,
                &[("noteId".into(), "en5".into())],
            )
            .await
            .unwrap();

        assert!(out.starts_with("--stringparam noteId en5 notes.xsl -"));
        assert!(out.contains(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"/>"#));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn xsltproc_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo 'compilation error' >&2\nexit 5");
        let doc = dir.path().join("a.xml");
        std::fs::write(&doc, "<TEI/>").unwrap();

        let err = XsltProc::new(program)
            .render(Path::new("est.xsl"), &doc, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Failed(msg) if msg == "compilation error"));
    }
}
