//! Short random comment identifiers.
//!
//! Identifiers are three random bytes written in base 36, which keeps them
//! five characters long and safe as file names. Uniqueness is only checked
//! against the comment files of one slug plus whatever this generator has
//! handed out, so two processes generating for the same slug can collide.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::Store;

/// Default number of attempts before giving up on a unique identifier.
pub const DEFAULT_MAX_RETRIES: usize = 10;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encoded width of a 24-bit value in base 36 (36^5 > 2^24).
const UID_WIDTH: usize = 5;

/// Generates identifiers that don't collide with existing comments of a slug.
#[derive(Debug)]
pub struct UidMaker<R = StdRng> {
    dir: PathBuf,
    store: Store,
    uids: HashSet<String>,
    rng: R,
    max_retries: usize,
}

impl UidMaker<StdRng> {
    /// Generator seeded from the operating system.
    pub fn new(store: &Store, slug: &str) -> Self {
        Self::with_rng(store, slug, StdRng::from_entropy())
    }
}

impl<R: RngCore> UidMaker<R> {
    pub fn with_rng(store: &Store, slug: &str, rng: R) -> Self {
        UidMaker {
            dir: store.comment_dir(slug),
            store: store.clone(),
            uids: HashSet::new(),
            rng,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Add the identifiers of existing comment files to the known set.
    ///
    /// A missing comment directory simply means there are none yet.
    pub fn load(&mut self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let before = self.uids.len();
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            if let Some(uid) = entry
                .file_name()
                .to_str()
                .and_then(|name| self.store.uid_from_file_name(name))
            {
                self.uids.insert(uid);
            }
        }
        debug!(
            dir = %self.dir.display(),
            found = self.uids.len() - before,
            "loaded existing identifiers"
        );
        Ok(())
    }

    /// One candidate identifier, not checked against the known set.
    pub fn generate(&mut self) -> String {
        let mut bytes = [0u8; 3];
        self.rng.fill_bytes(&mut bytes);
        encode(bytes)
    }

    /// A fresh identifier, reserved before it is returned.
    ///
    /// With `retry`, candidates are drawn until one is unused or the retry cap is
    /// hit; without it a single collision fails with `UidExists`.
    pub fn next(&mut self, retry: bool) -> Result<String> {
        let attempts = if retry { self.max_retries } else { 1 };

        for _ in 0..attempts {
            let uid = self.generate();
            if self.uids.insert(uid.clone()) {
                return Ok(uid);
            }
            if !retry {
                return Err(Error::UidExists(uid));
            }
            debug!(uid = %uid, "identifier collision, retrying");
        }

        Err(Error::UidTooManyRetries(attempts))
    }

    /// Mark an externally chosen identifier as taken. Returns false if it already was.
    pub fn reserve(&mut self, uid: &str) -> bool {
        self.uids.insert(uid.to_string())
    }

    /// Give back an identifier handed out by `next()` that ended up unused.
    pub fn release(&mut self, uid: &str) -> bool {
        self.uids.remove(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.uids.contains(uid)
    }

    pub fn uids(&self) -> &HashSet<String> {
        &self.uids
    }
}

/// Fixed-width base-36 encoding of three bytes.
pub fn encode(bytes: [u8; 3]) -> String {
    let mut n = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
    let mut out = [b'0'; UID_WIDTH];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    out.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Random source that always produces the same byte.
    struct Constant(u8);

    impl RngCore for Constant {
        fn next_u32(&mut self) -> u32 {
            u32::from_ne_bytes([self.0; 4])
        }

        fn next_u64(&mut self) -> u64 {
            u64::from_ne_bytes([self.0; 8])
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(self.0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn seeded(root: &Path) -> UidMaker {
        let store = Store::new(root, ".md");
        UidMaker::with_rng(&store, "article-2", StdRng::seed_from_u64(1))
    }

    fn write_comments(root: &Path, uids: &[&str]) {
        let dir = root.join("article-2");
        fs::create_dir_all(&dir).unwrap();
        for uid in uids {
            fs::write(dir.join(format!("{}.md", uid)), "author: x\n\nbody").unwrap();
        }
        fs::write(dir.join("notes.txt"), "not a comment").unwrap();
    }

    #[test]
    fn test_encode() {
        let cases = vec![
            ([0, 0, 0], "00000"),
            ([0, 0, 35], "0000z"),
            ([0, 0, 36], "00010"),
            ([255, 255, 255], "9zldr"),
        ];

        for (bytes, want) in cases {
            let got = encode(bytes);
            assert_eq!(got, want, "encode({:?}) = {:?}, want {:?}", bytes, got, want);
        }
    }

    #[test]
    fn test_generated_uids_are_short_lowercase() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uids = seeded(tmp.path());
        for _ in 0..50 {
            let uid = uids.generate();
            assert_eq!(uid.len(), UID_WIDTH);
            assert!(
                uid.bytes().all(|b| ALPHABET.contains(&b)),
                "unexpected character in {:?}",
                uid
            );
        }
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = seeded(tmp.path());
        let mut b = seeded(tmp.path());
        let first: Vec<String> = (0..5).map(|_| a.next(true).unwrap()).collect();
        let second: Vec<String> = (0..5).map(|_| b.next(true).unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_next_reserves_without_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uids = seeded(tmp.path());

        let made: Vec<String> = (0..3).map(|_| uids.next(true).unwrap()).collect();

        assert_eq!(uids.uids().len(), 3);
        for uid in &made {
            assert!(uids.contains(uid));
        }
    }

    #[test]
    fn test_load_uids() {
        let tmp = tempfile::tempdir().unwrap();
        write_comments(tmp.path(), &["yjeuodfpw", "mryhkgfer", "mvvsxpukx"]);

        let mut uids = seeded(tmp.path());
        uids.load().unwrap();

        let want: HashSet<String> = ["yjeuodfpw", "mryhkgfer", "mvvsxpukx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(uids.uids(), &want);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uids = seeded(&tmp.path().join("does-not-exist"));
        uids.load().unwrap();
        assert!(uids.uids().is_empty());
    }

    #[test]
    fn test_load_and_add() {
        let tmp = tempfile::tempdir().unwrap();
        write_comments(tmp.path(), &["yjeuodfpw", "mryhkgfer"]);

        let mut uids = seeded(tmp.path());
        uids.load().unwrap();
        for _ in 0..4 {
            let uid = uids.next(true).unwrap();
            assert_ne!(uid, "yjeuodfpw");
            assert_ne!(uid, "mryhkgfer");
        }

        assert_eq!(uids.uids().len(), 6);
    }

    #[test]
    fn test_too_many_retries() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path(), ".md");
        let mut uids = UidMaker::with_rng(&store, "article-2", Constant(7));

        let first = uids.next(true).unwrap();
        assert_eq!(first, encode([7, 7, 7]));

        match uids.next(true) {
            Err(Error::UidTooManyRetries(n)) => assert_eq!(n, DEFAULT_MAX_RETRIES),
            other => panic!("expected UidTooManyRetries, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_cap_is_configurable() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path(), ".md");
        let mut uids = UidMaker::with_rng(&store, "a", Constant(1)).with_max_retries(3);
        uids.next(true).unwrap();
        assert!(matches!(uids.next(true), Err(Error::UidTooManyRetries(3))));
    }

    #[test]
    fn test_existing_without_retry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path(), ".md");
        let mut uids = UidMaker::with_rng(&store, "article-2", Constant(0));

        assert_eq!(uids.next(false).unwrap(), "00000");
        match uids.next(false) {
            Err(Error::UidExists(uid)) => assert_eq!(uid, "00000"),
            other => panic!("expected UidExists, got {:?}", other),
        }
    }

    #[test]
    fn test_reserve() {
        let tmp = tempfile::tempdir().unwrap();
        let mut uids = seeded(tmp.path());
        assert!(uids.reserve("first-top"));
        assert!(!uids.reserve("first-top"));
        assert!(uids.contains("first-top"));
    }

    #[test]
    fn test_release() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path(), ".md");
        let mut uids = UidMaker::with_rng(&store, "a", Constant(2));

        let uid = uids.next(false).unwrap();
        assert!(uids.release(&uid));
        assert!(!uids.contains(&uid));
        assert_eq!(uids.next(false).unwrap(), uid);
    }
}
