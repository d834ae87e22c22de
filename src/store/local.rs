use std::fs;
use std::path::PathBuf;

use jiff::tz::TimeZone;
use log::warn;

use super::{Load, PreferenceStore, StoreError, STORAGE_KEY};

/// Synchronous key-value backend.  The preference list lives as a JSON array
/// in one file named after [`STORAGE_KEY`] inside `dir`.
pub struct LocalStore {
    pub dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> LocalStore {
        LocalStore { dir: dir.into() }
    }

    /// Path of the preference file.  Does not check if the file exists.
    pub fn filename(&self) -> PathBuf {
        self.dir.join(format!("{}.json", STORAGE_KEY))
    }
}

/// Timezone id of the host environment, `UTC` when undetectable.
pub fn system_zone() -> String {
    TimeZone::system().iana_name().unwrap_or("UTC").to_string()
}

impl PreferenceStore for LocalStore {
    /// Missing, unreadable, or malformed data falls back to a singleton list
    /// holding the host's detected zone.
    fn load(&mut self) -> Result<Load, StoreError> {
        let path = self.filename();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Ok(Load::Ready(vec![system_zone()])),
        };
        match serde_json::from_str::<Vec<String>>(&contents) {
            Ok(zones) => Ok(Load::Ready(zones)),
            Err(e) => {
                warn!(
                    "discarding malformed preference file {}: {}",
                    path.display(),
                    e
                );
                Ok(Load::Ready(vec![system_zone()]))
            }
        }
    }

    fn save(&mut self, zones: &[String]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.filename(), serde_json::to_string(zones)?)?;
        Ok(())
    }
}
