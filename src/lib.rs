//! File-backed threaded comments for static sites.
//!
//! Each page (identified by a slug) owns a thread log, `<root>/<slug>.thread`,
//! with one tab-separated line per comment, and a directory `<root>/<slug>/`
//! holding one file per comment: `key: value` metadata lines, a blank line,
//! then a markdown body.
//!
//! Loading a thread log replays its lines through the placement algorithm, so
//! the in-memory order is the depth-first display order no matter how the
//! lines were ordered on disk. Replies whose parent is unknown hang under a
//! placeholder until the parent shows up.

pub mod comment;
pub mod config;
pub mod error;
pub mod generator;
pub mod hook;
pub mod render;
pub mod store;
pub mod thread;
pub mod uid;

pub use comment::{Comment, MetaValue, Metadata};
pub use config::Config;
pub use error::{Error, Result};
pub use hook::{Content, inject_comments, load_thread};
pub use render::Format;
pub use store::Store;
pub use thread::{NewComment, Thread};
pub use uid::UidMaker;
