//! A single comment: its place in the thread plus the file holding its text.
//!
//! Comment files start with `key: value` metadata lines, end the block with a
//! blank line, and carry the markdown body after it:
//!
//! ```text
//! author: Jenifer Forcythe
//! date: 2016-02-11 23:40:22+00:00
//!
//! # Hello World
//! ```

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

use crate::error::{Error, Result};
use crate::render::{Format, Markdown, Render};
use crate::store::Store;

/// Body shown in place of a comment whose file could not be read.
pub const REMOVED_BODY: &str = "*This comment has been removed.*";

/// Metadata key parsed into a date-time.
pub const DATE_KEY: &str = "date";

/// Fractional seconds are written only when present, so whole-second dates keep
/// the short form.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Text(String),
    Date(DateTime<FixedOffset>),
}

impl MetaValue {
    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            MetaValue::Date(d) => Some(d),
            MetaValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<DateTime<FixedOffset>> for MetaValue {
    fn from(d: DateTime<FixedOffset>) -> Self {
        MetaValue::Date(d)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(d: DateTime<Utc>) -> Self {
        MetaValue::Date(d.fixed_offset())
    }
}

/// Comment metadata in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Set a value, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn date(&self) -> Option<&DateTime<FixedOffset>> {
        self.get(DATE_KEY).and_then(MetaValue::as_date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            match value {
                MetaValue::Text(s) => map.serialize_entry(key, s)?,
                MetaValue::Date(d) => map.serialize_entry(key, &d.to_rfc3339())?,
            }
        }
        map.end()
    }
}

/// Parse a date the way people write them in comment files.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[+HH:MM]`, and a bare date. Values
/// without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();

    if let Ok(d) = DateTime::parse_from_rfc3339(value) {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(d) = DateTime::parse_from_str(value, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Split comment file content into metadata and body.
pub fn parse_comment_file(path: &Path, content: &str) -> Result<(Metadata, String)> {
    let mut metadata = Metadata::default();
    let mut rest = content;

    while !rest.is_empty() {
        let (line, tail) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        rest = tail;

        if line.trim().is_empty() {
            return Ok((metadata, rest.to_string()));
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| Error::MalformedMetadataLine {
                path: path.to_path_buf(),
                line: line.to_string(),
            })?;
        let key = key.trim();
        let value = value.trim();

        if key == DATE_KEY {
            let date = parse_date(value).ok_or_else(|| Error::InvalidDate {
                path: path.to_path_buf(),
                value: value.to_string(),
            })?;
            metadata.insert(key, date);
        } else {
            metadata.insert(key, value);
        }
    }

    // Metadata only, no body
    Ok((metadata, String::new()))
}

// ============================================================================
// Comment
// ============================================================================

/// Whether metadata and body reflect the comment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unloaded,
    Loaded,
}

/// One comment of a thread. Equality is by identifier only.
#[derive(Debug, Clone)]
pub struct Comment {
    uid: String,
    level: usize,
    order: u64,
    parent: Option<String>,
    path: PathBuf,
    metadata: Metadata,
    body: String,
    state: State,
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for Comment {}

impl Comment {
    /// A comment that already exists on disk; its file is read on `load()`.
    pub fn new(
        store: &Store,
        slug: &str,
        uid: &str,
        level: usize,
        order: u64,
        parent: Option<&str>,
    ) -> Self {
        Comment {
            uid: uid.to_string(),
            level,
            order,
            parent: parent
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            path: store.comment_path(slug, uid),
            metadata: Metadata::default(),
            body: String::new(),
            state: State::Unloaded,
        }
    }

    /// A comment that exists only in memory until saved.
    pub fn draft(
        store: &Store,
        slug: &str,
        uid: &str,
        level: usize,
        order: u64,
        parent: Option<&str>,
    ) -> Self {
        let mut comment = Comment::new(store, slug, uid, level, order, parent);
        comment.state = State::Loaded;
        comment
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == State::Loaded
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Raw markdown body; `None` until the comment is loaded.
    pub fn body(&self) -> Option<&str> {
        match self.state {
            State::Loaded => Some(&self.body),
            State::Unloaded => None,
        }
    }

    /// Replace the body in memory; the comment counts as loaded afterwards.
    pub fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
        self.state = State::Loaded;
    }

    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Read metadata and body from the comment file. No-op once loaded.
    pub fn load(&mut self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let (metadata, body) = parse_comment_file(&self.path, &content)?;

        self.metadata = metadata;
        self.body = body;
        self.state = State::Loaded;
        Ok(())
    }

    /// Like `load()`, but a missing or broken file yields `REMOVED_BODY` instead of an error.
    pub fn load_tolerant(&mut self) {
        if let Err(e) = self.load() {
            warn!(uid = %self.uid, error = %e, "comment unreadable, showing placeholder body");
            self.metadata = Metadata::default();
            self.body = REMOVED_BODY.to_string();
            self.state = State::Loaded;
        }
    }

    /// Body in the requested format, loading the file first if needed.
    pub fn parse(&mut self, format: Format) -> Result<String> {
        self.parse_with(format, &Markdown)
    }

    pub fn parse_with(&mut self, format: Format, renderer: &dyn Render) -> Result<String> {
        self.load()?;
        match format {
            Format::Markdown => Ok(self.body.clone()),
            _ => Ok(renderer.render(&self.body, format)),
        }
    }

    /// Write the comment file, creating the comment directory if needed.
    ///
    /// `content`, when given, replaces the body. Saving an unloaded comment
    /// without new content reads the existing file first so its body survives.
    pub fn save(&mut self, content: Option<&str>) -> Result<()> {
        match content {
            Some(c) => self.set_body(c),
            None => self.load()?,
        }
        self.check_metadata()?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }

        fs::write(&self.path, self.render_file()).map_err(|e| Error::io(&self.path, e))
    }

    /// `save()` with a body given as raw bytes.
    pub fn save_bytes(&mut self, content: &[u8]) -> Result<()> {
        let body = String::from_utf8(content.to_vec())?;
        self.save(Some(&body))
    }

    /// Refuse metadata that would not read back as written.
    fn check_metadata(&self) -> Result<()> {
        for (key, value) in self.metadata.iter() {
            let bad_key = key.is_empty() || key != key.trim() || key.contains([':', '\n', '\r']);
            let bad_value = matches!(value, MetaValue::Text(s) if s.contains(['\n', '\r']));
            if bad_key || bad_value {
                return Err(Error::MalformedMetadataLine {
                    path: self.path.clone(),
                    line: format!("{}: {}", key, value),
                });
            }
            if let MetaValue::Text(text) = value
                && key == DATE_KEY
            {
                return Err(Error::InvalidDate {
                    path: self.path.clone(),
                    value: text.clone(),
                });
            }
        }
        Ok(())
    }

    fn render_file(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.metadata.iter() {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }
}
