//! Comment threads: reconstruction from the thread log and ordered insertion.
//!
//! The thread log (`<slug>.thread`) holds one line per comment:
//!
//! ```text
//! level<TAB>order<TAB>uid<TAB>parent
//! ```
//!
//! Lines may appear in any order, e.g. when comments were appended out of
//! order. Loading replays every line through the same insertion used for new
//! comments, so the in-memory list is always depth-first: each comment is
//! followed directly by its whole reply subtree, siblings sorted by
//! `(order, uid)`.
//!
//! A reply whose parent has not been seen yet hangs below a placeholder entry.
//! Placeholders sit after all top-level comments and are swapped for the real
//! comment, subtree included, once it arrives.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::RngCore;
use rand::rngs::StdRng;
use regex::Regex;
use tracing::{debug, info};

use crate::comment::Comment;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::uid::UidMaker;

static UID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Check that an identifier is usable as a file stem and a log field.
pub fn validate_uid(uid: &str) -> Result<()> {
    if UID_RE.is_match(uid) {
        Ok(())
    } else {
        Err(Error::InvalidUid(uid.to_string()))
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Stand-in for a parent that is referenced but not (yet) in the thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub uid: String,
    pub level: usize,
    pub order: u64,
}

/// One slot of the linearized thread.
#[derive(Debug, Clone)]
pub enum Entry {
    Comment(Comment),
    Placeholder(Placeholder),
}

impl Entry {
    pub fn uid(&self) -> &str {
        match self {
            Entry::Comment(c) => c.uid(),
            Entry::Placeholder(p) => &p.uid,
        }
    }

    pub fn level(&self) -> usize {
        match self {
            Entry::Comment(c) => c.level(),
            Entry::Placeholder(p) => p.level,
        }
    }

    pub fn order(&self) -> u64 {
        match self {
            Entry::Comment(c) => c.order(),
            Entry::Placeholder(p) => p.order,
        }
    }

    /// Placeholders never have a parent.
    pub fn parent(&self) -> Option<&str> {
        match self {
            Entry::Comment(c) => c.parent(),
            Entry::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Entry::Placeholder(_))
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Entry::Comment(c) => Some(c),
            Entry::Placeholder(_) => None,
        }
    }

    fn set_level(&mut self, level: usize) {
        match self {
            Entry::Comment(c) => c.set_level(level),
            Entry::Placeholder(p) => p.level = level,
        }
    }

    /// Sibling sort key.
    fn key(&self) -> (u64, &str) {
        (self.order(), self.uid())
    }
}

// ============================================================================
// Layout - the placement algorithm
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Layout {
    entries: Vec<Entry>,
    placeholders: HashSet<String>,
    next_order: u64,
}

impl Layout {
    fn position(&self, uid: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.uid() == uid)
    }

    /// One past the last entry of the subtree rooted at `start`.
    fn subtree_end(&self, start: usize) -> usize {
        let mut members: HashSet<&str> = HashSet::new();
        members.insert(self.entries[start].uid());

        let mut end = start + 1;
        while let Some(entry) = self.entries.get(end) {
            match entry.parent() {
                Some(parent) if members.contains(parent) => {
                    members.insert(entry.uid());
                    end += 1;
                }
                _ => break,
            }
        }
        end
    }

    fn observe_order(&mut self, order: u64) {
        self.next_order = self.next_order.max(order.saturating_add(1));
    }

    /// Insert or re-place a comment, returning its index.
    ///
    /// If the identifier is already present (as placeholder or comment), the old
    /// entry is dropped and its descendants follow the comment to its new slot.
    fn insert(&mut self, comment: Comment) -> Result<usize> {
        if comment.parent() == Some(comment.uid()) {
            return Err(Error::ParentCycle(comment.uid().to_string()));
        }

        let Some(pos) = self.position(comment.uid()) else {
            self.observe_order(comment.order());
            return Ok(self.place(Entry::Comment(comment)));
        };

        let end = self.subtree_end(pos);
        if let Some(parent) = comment.parent()
            && self.entries[pos..end].iter().any(|e| e.uid() == parent)
        {
            return Err(Error::ParentCycle(comment.uid().to_string()));
        }

        let mut moved: Vec<Entry> = self.entries.drain(pos..end).collect();
        let old = moved.remove(0);
        if old.is_placeholder() {
            self.placeholders.remove(old.uid());
            debug!(uid = old.uid(), replies = moved.len(), "replacing placeholder");
        } else {
            debug!(uid = old.uid(), replies = moved.len(), "re-placing comment");
        }

        self.observe_order(comment.order());
        let at = self.place(Entry::Comment(comment));

        let new_level = self.entries[at].level();
        for entry in &mut moved {
            let level = (entry.level() + new_level).saturating_sub(old.level());
            entry.set_level(level);
        }
        self.entries.splice(at + 1..at + 1, moved);

        Ok(at)
    }

    /// Put an entry into its sibling run. Never re-places existing entries.
    fn place(&mut self, mut entry: Entry) -> usize {
        let at = match entry.parent().map(str::to_string) {
            Some(parent) => {
                let parent_at = match self.position(&parent) {
                    Some(i) => i,
                    None => self.add_placeholder(&parent, &entry),
                };
                entry.set_level(self.entries[parent_at].level() + 1);
                self.slot_after_siblings(parent_at + 1, self.subtree_end(parent_at), &entry)
            }
            None if entry.is_placeholder() => self.placeholder_slot(entry.uid()),
            None => {
                entry.set_level(0);
                let top_end = self
                    .entries
                    .iter()
                    .position(Entry::is_placeholder)
                    .unwrap_or(self.entries.len());
                self.slot_after_siblings(0, top_end, &entry)
            }
        };

        debug!(uid = entry.uid(), level = entry.level(), at, "placed");
        self.entries.insert(at, entry);
        at
    }

    /// Slot after the subtree of the last sibling in `start..end` sorting at or
    /// before `entry`, or `start` if there is none. Siblings in that range are
    /// consecutive subtrees.
    fn slot_after_siblings(&self, start: usize, end: usize, entry: &Entry) -> usize {
        let mut at = start;
        let mut i = start;
        while i < end {
            let sibling_end = self.subtree_end(i);
            if self.entries[i].key().cmp(&entry.key()) != Ordering::Greater {
                at = sibling_end;
            }
            i = sibling_end;
        }
        at
    }

    /// Placeholders are kept after the top-level run, sorted by identifier.
    fn placeholder_slot(&self, uid: &str) -> usize {
        let mut i = self
            .entries
            .iter()
            .position(Entry::is_placeholder)
            .unwrap_or(self.entries.len());
        while i < self.entries.len() {
            if self.entries[i].uid() > uid {
                break;
            }
            i = self.subtree_end(i);
        }
        i
    }

    fn add_placeholder(&mut self, uid: &str, child: &Entry) -> usize {
        // Fixed level and order: nothing about a placeholder may depend on
        // which of its replies arrived first
        let placeholder = Placeholder {
            uid: uid.to_string(),
            level: 0,
            order: 0,
        };
        debug!(uid, child = child.uid(), "parent unknown, adding placeholder");
        self.placeholders.insert(uid.to_string());
        self.place(Entry::Placeholder(placeholder))
    }
}

// ============================================================================
// Thread log
// ============================================================================

/// One parsed line of a thread log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: usize,
    pub order: u64,
    pub uid: String,
    pub parent: Option<String>,
}

/// Parse thread-log content. Fails on the first malformed line.
pub fn parse_thread_log(path: &Path, content: &str) -> Result<Vec<LogRecord>> {
    let malformed = |line: usize, reason: String| Error::MalformedThreadLine {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        if parts.len() < 3 {
            return Err(malformed(
                i + 1,
                format!("expected at least 3 tab-separated fields, got {}", parts.len()),
            ));
        }

        // Negative values are clamped to zero
        let level: i64 = parts[0]
            .parse()
            .map_err(|_| malformed(i + 1, format!("invalid level '{}'", parts[0])))?;
        let order: i64 = parts[1]
            .parse()
            .map_err(|_| malformed(i + 1, format!("invalid order '{}'", parts[1])))?;

        let uid = parts[2];
        validate_uid(uid).map_err(|e| malformed(i + 1, e.to_string()))?;

        let parent = parts.get(3).copied().filter(|p| !p.is_empty());
        if let Some(p) = parent {
            validate_uid(p).map_err(|e| malformed(i + 1, e.to_string()))?;
        }

        records.push(LogRecord {
            level: level.max(0) as usize,
            order: order.max(0) as u64,
            uid: uid.to_string(),
            parent: parent.map(str::to_string),
        });
    }
    Ok(records)
}

/// Serialize comments (placeholders skipped) in list order.
pub fn format_thread_log<'a>(comments: impl IntoIterator<Item = &'a Comment>) -> String {
    let mut out = String::new();
    for c in comments {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            c.level(),
            c.order(),
            c.uid(),
            c.parent().unwrap_or("")
        );
    }
    out
}

// ============================================================================
// Thread
// ============================================================================

/// Options for a comment added through `Thread::add`.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    /// Generated when absent
    pub uid: Option<String>,
    pub parent: Option<String>,
    /// Next free order when absent
    pub order: Option<u64>,
}

impl NewComment {
    pub fn reply_to(parent: &str) -> Self {
        NewComment {
            parent: Some(parent.to_string()),
            ..Default::default()
        }
    }
}

/// The comments of one slug, in display order.
///
/// Not safe for concurrent writers: nothing coordinates two processes saving
/// the same thread.
#[derive(Debug)]
pub struct Thread<R = StdRng> {
    slug: String,
    store: Store,
    layout: Layout,
    uids: UidMaker<R>,
}

impl Thread<StdRng> {
    pub fn new(slug: &str, store: Store) -> Self {
        let uids = UidMaker::new(&store, slug);
        Thread::with_uid_maker(slug, store, uids)
    }

    /// Thread for `slug` with the configured storage and retry cap, not yet loaded.
    pub fn open(slug: &str, config: &Config, site_root: &Path) -> Self {
        let store = config.store(site_root);
        let uids = UidMaker::new(&store, slug).with_max_retries(config.max_retries);
        Thread::with_uid_maker(slug, store, uids)
    }
}

impl<R: RngCore> Thread<R> {
    pub fn with_uid_maker(slug: &str, store: Store, uids: UidMaker<R>) -> Self {
        Thread {
            slug: slug.to_string(),
            store,
            layout: Layout::default(),
            uids,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn thread_path(&self) -> PathBuf {
        self.store.thread_path(&self.slug)
    }

    pub fn comment_dir(&self) -> PathBuf {
        self.store.comment_dir(&self.slug)
    }

    /// Order assigned to the next comment added without one.
    pub fn next_order(&self) -> u64 {
        self.layout.next_order
    }

    pub fn uids(&self) -> &UidMaker<R> {
        &self.uids
    }

    pub fn uids_mut(&mut self) -> &mut UidMaker<R> {
        &mut self.uids
    }

    /// Replace the in-memory thread with the thread log on disk.
    ///
    /// All or nothing: on error the thread is left as it was.
    pub fn load(&mut self) -> Result<()> {
        let path = self.thread_path();
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let records = parse_thread_log(&path, &content)?;

        let mut layout = Layout::default();
        for record in &records {
            let comment = Comment::new(
                &self.store,
                &self.slug,
                &record.uid,
                record.level,
                record.order,
                record.parent.as_deref(),
            );
            layout.insert(comment)?;
        }

        self.uids.load()?;
        for record in &records {
            self.uids.reserve(&record.uid);
        }
        self.layout = layout;

        info!(
            slug = %self.slug,
            comments = self.len(),
            placeholders = self.layout.placeholders.len(),
            "loaded thread"
        );
        Ok(())
    }

    /// Read every comment file. Tolerant mode substitutes unreadable ones.
    pub fn load_comments(&mut self, tolerant: bool) -> Result<()> {
        for comment in self.iter_mut() {
            if tolerant {
                comment.load_tolerant();
            } else {
                comment.load()?;
            }
        }
        Ok(())
    }

    /// Create a new comment in memory and place it. Nothing is written.
    ///
    /// On error the thread is unchanged and no identifier stays reserved.
    pub fn add(&mut self, new: NewComment) -> Result<&mut Comment> {
        if let Some(parent) = &new.parent {
            validate_uid(parent)?;
        }
        let (uid, generated) = match new.uid {
            Some(uid) => {
                validate_uid(&uid)?;
                (uid, false)
            }
            None => (self.uids.next(true)?, true),
        };

        let order = new.order.unwrap_or(self.layout.next_order);
        let comment = Comment::draft(
            &self.store,
            &self.slug,
            &uid,
            0,
            order,
            new.parent.as_deref(),
        );
        match self.layout.insert(comment) {
            Ok(at) => {
                self.uids.reserve(&uid);
                Ok(self.comment_at(at))
            }
            Err(e) => {
                if generated {
                    self.uids.release(&uid);
                }
                Err(e)
            }
        }
    }

    /// Place an existing comment, replacing any entry with the same identifier.
    pub fn insert(&mut self, comment: Comment) -> Result<&mut Comment> {
        validate_uid(comment.uid())?;
        let uid = comment.uid().to_string();
        let at = self.layout.insert(comment)?;
        self.uids.reserve(&uid);
        Ok(self.comment_at(at))
    }

    fn comment_at(&mut self, at: usize) -> &mut Comment {
        match &mut self.layout.entries[at] {
            Entry::Comment(c) => c,
            Entry::Placeholder(p) => unreachable!("placeholder '{}' placed by insert", p.uid),
        }
    }

    /// Write the thread log in display order, creating the comment directory.
    pub fn save(&mut self) -> Result<()> {
        self.store.ensure_comment_dir(&self.slug)?;

        let path = self.thread_path();
        fs::write(&path, format_thread_log(self.iter())).map_err(|e| Error::io(&path, e))?;

        if let Some(max) = self.iter().map(Comment::order).max() {
            self.layout.observe_order(max);
        }
        info!(slug = %self.slug, comments = self.len(), "saved thread");
        Ok(())
    }

    /// Comments in display order, placeholders skipped.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.layout.entries.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Comment> {
        self.layout.entries.iter_mut().filter_map(|e| match e {
            Entry::Comment(c) => Some(c),
            Entry::Placeholder(_) => None,
        })
    }

    /// All entries including placeholders.
    pub fn entries(&self) -> &[Entry] {
        &self.layout.entries
    }

    /// Identifiers currently held by placeholders.
    pub fn placeholders(&self) -> &HashSet<String> {
        &self.layout.placeholders
    }

    pub fn get(&self, uid: &str) -> Option<&Comment> {
        self.iter().find(|c| c.uid() == uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Comment> {
        self.iter_mut().find(|c| c.uid() == uid)
    }

    /// Number of real comments.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Iterator over the comments of a thread.
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Comment;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.by_ref().find_map(Entry::as_comment)
    }
}

impl<'a, R: RngCore> IntoIterator for &'a Thread<R> {
    type Item = &'a Comment;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
