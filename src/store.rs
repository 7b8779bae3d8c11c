//! Storage layout for comment threads.
//!
//! ```text
//! <root>/
//!     my-post.thread      # one line per comment: level, order, uid, parent
//!     my-post/            # one file per comment
//!         3k9zq.md
//!         0f2ab.md
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Thread-log file extension.
pub const THREAD_EXTENSION: &str = "thread";

/// Resolves thread-log and comment paths below a storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
    extension: String,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Store {
            root: root.into(),
            extension: normalize_extension(extension),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Comment file extension, always with a leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn thread_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.{}", slug, THREAD_EXTENSION))
    }

    pub fn comment_dir(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    pub fn comment_path(&self, slug: &str, uid: &str) -> PathBuf {
        self.comment_dir(slug)
            .join(format!("{}{}", uid, self.extension))
    }

    /// Create the comment directory for a slug (and the root) if missing.
    pub fn ensure_comment_dir(&self, slug: &str) -> Result<PathBuf> {
        let dir = self.comment_dir(slug);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(dir)
    }

    /// Identifier for a comment file name, if it carries this store's extension.
    pub fn uid_from_file_name(&self, name: &str) -> Option<String> {
        name.strip_suffix(self.extension.as_str())
            .filter(|stem| !stem.is_empty())
            .map(|stem| stem.to_string())
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = Store::new("/site/comments", ".md");
        assert_eq!(
            store.thread_path("hello-world"),
            PathBuf::from("/site/comments/hello-world.thread")
        );
        assert_eq!(
            store.comment_dir("hello-world"),
            PathBuf::from("/site/comments/hello-world")
        );
        assert_eq!(
            store.comment_path("hello-world", "ab12c"),
            PathBuf::from("/site/comments/hello-world/ab12c.md")
        );
    }

    #[test]
    fn test_extension_normalized() {
        let cases = vec![(".md", ".md"), ("md", ".md"), ("", ""), (".markdown", ".markdown")];

        for (input, want) in cases {
            let got = Store::new("x", input);
            assert_eq!(
                got.extension(),
                want,
                "Store::new(_, {:?}).extension() = {:?}, want {:?}",
                input,
                got.extension(),
                want
            );
        }
    }

    #[test]
    fn test_uid_from_file_name() {
        let store = Store::new("x", ".md");
        let cases = vec![
            ("abc12.md", Some("abc12")),
            ("abc12.txt", None),
            (".md", None),
            ("first-top.md", Some("first-top")),
        ];

        for (name, want) in cases {
            let got = store.uid_from_file_name(name);
            assert_eq!(
                got.as_deref(),
                want,
                "uid_from_file_name({:?}) = {:?}, want {:?}",
                name,
                got,
                want
            );
        }
    }

    #[test]
    fn test_ensure_comment_dir_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path().join("comments"), ".md");

        let dir = store.ensure_comment_dir("post").unwrap();
        assert!(dir.is_dir());
        // Second call is a no-op
        store.ensure_comment_dir("post").unwrap();
    }
}
