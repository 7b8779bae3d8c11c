pub mod add;
pub mod config_cmd;
pub mod generate;
pub mod show;
pub mod uid;
pub mod validate;

use std::path::Path;

use comments::config::Config;
use comments::thread::Thread;

/// Load the thread log; a thread that doesn't exist yet starts empty when `allow_missing`.
pub fn load_thread(
    slug: &str,
    root: &Path,
    config: &Config,
    allow_missing: bool,
) -> Result<Thread, String> {
    let mut thread = Thread::open(slug, config, root);
    match thread.load() {
        Ok(()) => Ok(thread),
        Err(e) if allow_missing && e.is_missing_file() => {
            // Still pick up comment files so new identifiers avoid them
            thread.uids_mut().load().map_err(|e| e.to_string())?;
            Ok(thread)
        }
        Err(e) => Err(e.to_string()),
    }
}
