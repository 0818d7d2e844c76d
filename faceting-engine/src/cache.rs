//! Persistent value tables, one file per problem parameter tuple.
//!
//! A cache file is written once and never mutated. Anything unreadable on
//! load (missing, truncated, wrong version, wrong parameters, checksum
//! mismatch) is treated as an empty cache.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::hash::Hasher;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::config::ProblemParams;
use crate::constants::{CACHE_CHECKSUM_SEED, CACHE_FORMAT_VERSION};
use crate::estimate::Estimate;
use crate::solver::ValueTable;
use crate::state::{StateKey, StoneState};

/// Storage seam for computed value tables.
pub trait CacheStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the table for `params`, or `None` when nothing usable is stored.
    fn load(&self, params: &ProblemParams) -> Option<ValueTable>;

    /// Persist `table` for `params` unless a table is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    fn save(&self, params: &ProblemParams, table: &ValueTable) -> Result<SaveStatus, Self::Error>;
}

/// What a call to [`CacheStore::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Written { entries: usize },
    /// A cache for these parameters already exists and was left untouched.
    AlreadyPresent,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("cache format version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("cache was built for {found}, not {expected}")]
    Params {
        found: ProblemParams,
        expected: ProblemParams,
    },
    #[error("cache checksum mismatch")]
    Checksum,
    #[error("cache holds an out-of-range state key {0:?}")]
    InvalidKey(StateKey),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// On-disk layout of a cache file.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    params: ProblemParams,
    checksum: u64,
    entries: Vec<(StateKey, Estimate)>,
}

impl CacheFile {
    fn from_table(params: &ProblemParams, table: &ValueTable) -> Self {
        let mut entries: Vec<(StateKey, Estimate)> = table
            .iter()
            .map(|(state, value)| (state.key(), *value))
            .collect();
        entries.sort_unstable_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
        Self {
            version: CACHE_FORMAT_VERSION,
            params: *params,
            checksum: entries_checksum(&entries),
            entries,
        }
    }

    fn into_table(self, expected: &ProblemParams) -> Result<ValueTable, CacheError> {
        if self.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::Version {
                found: self.version,
                expected: CACHE_FORMAT_VERSION,
            });
        }
        if self.params != *expected {
            return Err(CacheError::Params {
                found: self.params,
                expected: *expected,
            });
        }
        if entries_checksum(&self.entries) != self.checksum {
            return Err(CacheError::Checksum);
        }
        self.entries
            .into_iter()
            .map(|(key, value)| {
                StoneState::from_key(key)
                    .map(|state| (state, value))
                    .ok_or(CacheError::InvalidKey(key))
            })
            .collect()
    }
}

fn entries_checksum(entries: &[(StateKey, Estimate)]) -> u64 {
    let mut hasher = XxHash64::with_seed(CACHE_CHECKSUM_SEED);
    for (key, value) in entries {
        for field in key {
            hasher.write(&field.to_le_bytes());
        }
        for component in value.to_array() {
            hasher.write(&component.to_bits().to_le_bytes());
        }
    }
    hasher.finish()
}

/// JSON files named `dp_{attempts}_{goal1}_{goal2}_{total}_{goal3}.json` in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, params: &ProblemParams) -> PathBuf {
        self.dir.join(format!("{}.json", params.cache_stem()))
    }

    fn read(path: &Path, params: &ProblemParams) -> Result<ValueTable, CacheError> {
        let file = File::open(path).map_err(|err| CacheError::io(path, err))?;
        let parsed: CacheFile = serde_json::from_reader(BufReader::new(file))?;
        parsed.into_table(params)
    }

    fn write(&self, path: &Path, contents: &CacheFile) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|err| CacheError::io(&self.dir, err))?;
        let staging = path.with_extension("json.tmp");
        write_staged(&staging, |writer| {
            serde_json::to_writer(writer, contents)?;
            Ok(())
        })?;
        fs::rename(&staging, path).map_err(|err| CacheError::io(path, err))
    }
}

/// Fill `staging` through `fill`, removing the partial file if anything fails.
fn write_staged<F>(staging: &Path, fill: F) -> Result<(), CacheError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), CacheError>,
{
    let file = File::create(staging).map_err(|err| CacheError::io(staging, err))?;
    let mut writer = BufWriter::new(file);
    let written = fill(&mut writer)
        .and_then(|()| writer.flush().map_err(|err| CacheError::io(staging, err)));
    drop(writer);
    if let Err(err) = written {
        if let Err(cleanup) = fs::remove_file(staging) {
            warn!("Could not remove {}: {cleanup}", staging.display());
        }
        return Err(err);
    }
    Ok(())
}

impl CacheStore for FileCacheStore {
    type Error = CacheError;

    fn load(&self, params: &ProblemParams) -> Option<ValueTable> {
        let path = self.path_for(params);
        if !path.exists() {
            debug!("No cache at {}", path.display());
            return None;
        }
        let started = Instant::now();
        match Self::read(&path, params) {
            Ok(table) => {
                info!(
                    "Loaded {} cached states from {} in {:.2?}",
                    table.len(),
                    path.display(),
                    started.elapsed()
                );
                Some(table)
            }
            Err(err) => {
                warn!("Ignoring cache {}: {err}", path.display());
                None
            }
        }
    }

    fn save(&self, params: &ProblemParams, table: &ValueTable) -> Result<SaveStatus, CacheError> {
        let path = self.path_for(params);
        if path.exists() {
            debug!("Cache {} already present; not overwriting", path.display());
            return Ok(SaveStatus::AlreadyPresent);
        }
        let started = Instant::now();
        let contents = CacheFile::from_table(params, table);
        self.write(&path, &contents)?;
        info!(
            "Saved {} states to {} in {:.2?}",
            contents.entries.len(),
            path.display(),
            started.elapsed()
        );
        Ok(SaveStatus::Written {
            entries: contents.entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "faceting-cache-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn solved(params: ProblemParams) -> ValueTable {
        let mut solver = Solver::new(params);
        solver.evaluate(&StoneState::initial(&params));
        solver.into_table()
    }

    #[test]
    fn roundtrip_preserves_every_bit() {
        let params = ProblemParams::new(3, 0, 0, 4, 2);
        let table = solved(params);
        let store = FileCacheStore::new(temp_dir("roundtrip"));

        let status = store.save(&params, &table).unwrap();
        assert_eq!(status, SaveStatus::Written { entries: table.len() });

        let loaded = store.load(&params).unwrap();
        assert_eq!(loaded.len(), table.len());
        for (state, value) in &table {
            assert!(loaded[state].bit_eq(value));
        }
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn missing_file_is_a_miss() {
        let store = FileCacheStore::new(temp_dir("missing"));
        assert!(store.load(&ProblemParams::new(3, 0, 0, 4, 2)).is_none());
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let params = ProblemParams::new(2, 1, 1, 0, 2);
        let store = FileCacheStore::new(temp_dir("write-once"));
        let full = solved(params);
        store.save(&params, &full).unwrap();
        let before = fs::read(store.path_for(&params)).unwrap();

        let status = store.save(&params, &ValueTable::new()).unwrap();
        assert_eq!(status, SaveStatus::AlreadyPresent);
        assert_eq!(fs::read(store.path_for(&params)).unwrap(), before);
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn corrupt_or_mismatched_files_are_misses() {
        let params = ProblemParams::new(2, 1, 1, 0, 2);
        let store = FileCacheStore::new(temp_dir("corrupt"));
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(&params), b"{\"version\": 1, \"par").unwrap();
        assert!(store.load(&params).is_none());

        let mut tampered = CacheFile::from_table(&params, &solved(params));
        tampered.entries[0].1.success += 0.5;
        fs::write(
            store.path_for(&params),
            serde_json::to_vec(&tampered).unwrap(),
        )
        .unwrap();
        assert!(store.load(&params).is_none());

        let other = ProblemParams::new(2, 1, 2, 0, 2);
        let foreign = CacheFile::from_table(&params, &solved(params));
        fs::write(store.path_for(&other), serde_json::to_vec(&foreign).unwrap()).unwrap();
        assert!(store.load(&other).is_none());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn failed_writes_leave_no_staging_file() {
        let dir = temp_dir("staging");
        fs::create_dir_all(&dir).unwrap();
        let staging = dir.join("dp_3_0_0_4_2.json.tmp");

        let result = write_staged(&staging, |writer| {
            writer.write_all(b"{\"version\": 1").unwrap();
            writer.flush().unwrap();
            Err(CacheError::Checksum)
        });
        assert!(matches!(result, Err(CacheError::Checksum)));
        assert!(!staging.exists());

        write_staged(&staging, |writer| {
            writer.write_all(b"{}").unwrap();
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read(&staging).unwrap(), b"{}");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_names_follow_parameters() {
        let store = FileCacheStore::new("tmp");
        let path = store.path_for(&ProblemParams::new(10, 9, 7, 0, 4));
        assert_eq!(path, Path::new("tmp").join("dp_10_9_7_0_4.json"));
    }
}
