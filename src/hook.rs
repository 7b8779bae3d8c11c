//! Integration with a static site generator.
//!
//! For every content item with a slug, build its thread, load it, and hand it to
//! the item for templates to iterate. A thread that can't be loaded (no log
//! yet, broken file) is attached empty so one bad thread doesn't stop the build.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::thread::Thread;

/// A piece of content that can carry a comment thread.
pub trait Content {
    fn slug(&self) -> &str;

    fn attach_comments(&mut self, thread: Thread);
}

/// Build and load the thread for one slug.
pub fn load_thread(slug: &str, config: &Config, site_root: &Path) -> Result<Thread> {
    let mut thread = Thread::open(slug, config, site_root);
    thread.load()?;
    if config.tolerant {
        thread.load_comments(true)?;
    }
    Ok(thread)
}

/// Attach a loaded thread to every content item. Failures degrade to an empty thread.
pub fn inject_comments<C: Content>(items: &mut [C], config: &Config, site_root: &Path) {
    for item in items.iter_mut() {
        let slug = item.slug().to_string();
        let thread = match load_thread(&slug, config, site_root) {
            Ok(thread) => thread,
            Err(e) => {
                if e.is_missing_file() {
                    debug!(slug = %slug, "no comment thread");
                } else {
                    warn!(slug = %slug, error = %e, "could not load comment thread");
                }
                Thread::open(&slug, config, site_root)
            }
        };
        item.attach_comments(thread);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Article {
        slug: String,
        comments: Option<Thread>,
    }

    impl Content for Article {
        fn slug(&self) -> &str {
            &self.slug
        }

        fn attach_comments(&mut self, thread: Thread) {
            self.comments = Some(thread);
        }
    }

    fn article(slug: &str) -> Article {
        Article {
            slug: slug.to_string(),
            comments: None,
        }
    }

    fn config() -> Config {
        Config {
            source_dir: "comments".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_inject_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("comments");
        fs::create_dir_all(root.join("with-comments")).unwrap();
        fs::write(root.join("with-comments.thread"), "0\t0\ta\n1\t1\tb\ta\n").unwrap();
        fs::write(root.join("broken.thread"), "x\ty\tz\n").unwrap();

        let mut items = vec![article("with-comments"), article("no-comments"), article("broken")];
        inject_comments(&mut items, &config(), tmp.path());

        let uids: Vec<&str> = items[0]
            .comments
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.uid())
            .collect();
        assert_eq!(uids, vec!["a", "b"]);
        assert!(items[1].comments.as_ref().unwrap().is_empty());
        assert!(items[2].comments.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_load_thread_tolerant_loads_bodies() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("comments");
        fs::create_dir_all(root.join("post")).unwrap();
        fs::write(root.join("post.thread"), "0\t0\ta\n").unwrap();

        let config = Config {
            tolerant: true,
            ..config()
        };
        let thread = load_thread("post", &config, tmp.path()).unwrap();
        assert_eq!(
            thread.get("a").unwrap().body(),
            Some(crate::comment::REMOVED_BODY)
        );
    }
}
