//! Writing the feed file and CI output variables.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Mode of a freshly published feed; static hosts serve it to everyone.
#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

/// Write `bytes` to `path` via a temporary file in the same directory and a
/// rename, so readers never observe a half-written feed.
///
/// Temporary files are created owner-only. On unix the file takes the
/// permissions of the feed it replaces, or `0644` for a new one.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<u64> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    tmp.as_file().set_permissions(published_permissions(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(bytes.len() as u64)
}

#[cfg(unix)]
fn published_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(PUBLISHED_MODE);
    fs::Permissions::from_mode(mode)
}

/// Append `key=value` lines to a CI output file.
pub fn append_ci_outputs(path: &Path, outputs: &[(&str, String)]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (key, value) in outputs {
        writeln!(file, "{}={}", key, value)?;
    }
    Ok(())
}
