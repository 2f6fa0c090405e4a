//! The set of object paths that may be served from Swift.
//!
//! Reads are lock-free; a reload swaps in a whole new set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use tokio::time;
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
pub struct AllowList {
    inner: Arc<ArcSwap<HashSet<String>>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.load().contains(path)
    }

    pub fn replace(&self, paths: HashSet<String>) {
        self.inner.store(Arc::new(paths));
    }

    /// Read `path` and replace the current set with its entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read; the current set is kept.
    pub async fn load(&self, path: &Path) -> Result<usize> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read allow-list {}", path.display()))?;
        let paths = parse(&text);
        let count = paths.len();
        self.replace(paths);
        Ok(count)
    }
}

/// One path per line; surrounding whitespace is trimmed and blank lines are
/// ignored.
pub fn parse(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Spawn a background task that reloads the allow-list every `interval`.
///
/// On failure the previous list is retained and a warning is emitted.
pub fn refresh_task(
    list: AllowList,
    path: PathBuf,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; startup already loaded the list.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match list.load(&path).await {
                Ok(count) => info!(entries = count, "access-file allow-list refreshed"),
                Err(e) => warn!(error = %e, "allow-list refresh failed; retaining previous list"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_trims_and_skips_blank_lines() {
        let set = parse("a/b.jpg\n  c/d.tif \n\n\t\ne.mp3\r\n");
        assert_eq!(set.len(), 3);
        assert!(set.contains("a/b.jpg"));
        assert!(set.contains("c/d.tif"));
        assert!(set.contains("e.mp3"));
    }

    #[test]
    fn initially_empty() {
        let list = AllowList::new();
        assert!(list.is_empty());
        assert!(!list.contains("a"));
    }

    #[tokio::test]
    async fn load_replaces_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one.jpg\ntwo.jpg").unwrap();

        let list = AllowList::new();
        list.replace(parse("old.jpg"));
        assert_eq!(list.load(file.path()).await.unwrap(), 2);
        assert!(list.contains("one.jpg"));
        assert!(!list.contains("old.jpg"));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let list = AllowList::new();
        list.replace(parse("kept.jpg"));
        assert!(list.load(Path::new("/nonexistent/list.txt")).await.is_err());
        assert!(list.contains("kept.jpg"));
    }

    #[tokio::test]
    async fn refresh_task_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "first.jpg\n").unwrap();

        let list = AllowList::new();
        list.load(&path).await.unwrap();
        let handle = refresh_task(list.clone(), path.clone(), Duration::from_millis(20));

        std::fs::write(&path, "second.jpg\n").unwrap();
        for _ in 0..100 {
            if list.contains("second.jpg") {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        assert!(list.contains("second.jpg"));
        assert!(!list.contains("first.jpg"));
        handle.abort();
    }
}
