use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

/// The journal file on disk.
///
/// The corrected journal is only rewritten when its content actually
/// changed, and only after the previous version was copied into the
/// backup directory.
#[derive(Debug)]
pub struct JournalFile {
    path: PathBuf,
    contents: String,
}

impl JournalFile {
    pub fn load(path: impl Into<PathBuf>) -> io::Result<JournalFile> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        Ok(JournalFile { path, contents })
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Writes the regenerated journal.  Returns `false` when the content
    /// is unchanged (nothing is written, so the timestamp stays put).
    pub fn write_if_changed(&self, new_contents: &str, backup_dir: &Path) -> io::Result<bool> {
        if self.contents == new_contents {
            info!("journal unchanged, not rewritten");
            return Ok(false);
        }

        fs::create_dir_all(backup_dir)?;
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("journal");
        let backup = backup_dir.join(format!("{}_{}.txt", stem, timestamp));
        fs::write(&backup, &self.contents)?;

        fs::write(&self.path, new_contents)?;
        info!("journal rewritten, backup at {}", backup.display());
        Ok(true)
    }
}
