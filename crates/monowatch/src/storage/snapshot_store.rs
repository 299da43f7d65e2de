use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::Result;
use crate::reconcile::{ActionKind, GameSnapshot};

/// Canonical snapshot file plus an append-only history directory.
pub struct SnapshotStore {
    canonical: PathBuf,
    history_dir: PathBuf,
    sequence: u64,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(canonical: P, history_dir: Q) -> Self {
        Self {
            canonical: canonical.as_ref().to_path_buf(),
            history_dir: history_dir.as_ref().to_path_buf(),
            sequence: 0,
        }
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Overwrite the canonical document and append a history entry tagged
    /// with `kind`. Returns the history file path.
    pub fn save(&mut self, snapshot: &GameSnapshot, kind: ActionKind) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.canonical, json.as_bytes())?;

        fs::create_dir_all(&self.history_dir)?;
        self.sequence += 1;
        let now: DateTime<Local> = Local::now();
        let entry = self.history_dir.join(format!(
            "{}_{:06}_{}.json",
            now.format("%Y%m%d_%H%M%S%.3f"),
            self.sequence,
            kind
        ));
        fs::write(&entry, json.as_bytes())?;
        debug!("Saved snapshot to {} ({})", self.canonical.display(), entry.display());

        Ok(entry)
    }

    pub fn load(&self) -> Result<GameSnapshot> {
        load_snapshot(&self.canonical)
    }
}

pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<GameSnapshot> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write through a sibling temp file and rename it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}
