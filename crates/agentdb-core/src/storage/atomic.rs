//! Crash-safe whole-file replacement.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Returns the temp path used while `path` is being rewritten.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to `path` so that readers observe either the old or the new
/// contents, never a mix.
///
/// The data goes to `<path>.tmp`, is fsynced, then renamed over `path`. If any
/// step fails the temp file is removed and `path` is untouched.
///
/// # Errors
///
/// Returns an error if writing, syncing or renaming fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_path_for(path);

    let result = (|| {
        let mut file = std::fs::File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        replace(&temp, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result
}

/// On Unix, `rename()` atomically replaces the destination.
/// On Windows, `rename()` fails if the destination exists, so the old file is
/// moved aside first and restored if the swap fails.
fn replace(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        let backup = dst.with_extension("bak");
        let _ = std::fs::remove_file(&backup);
        if dst.exists() {
            std::fs::rename(dst, &backup)?;
        }
        match std::fs::rename(src, dst) {
            Ok(()) => {
                let _ = std::fs::remove_file(&backup);
                Ok(())
            }
            Err(e) => {
                if backup.exists() {
                    let _ = std::fs::rename(&backup, dst);
                }
                Err(e)
            }
        }
    }

    #[cfg(not(windows))]
    {
        std::fs::rename(src, dst)
    }
}
