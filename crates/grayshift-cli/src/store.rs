//! Temp output store: one directory of randomly named conversion results.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Default store directory, relative to the working directory.
pub const DEFAULT_STORE: &str = "temp_output";

/// Entry that survives a sweep.
const RESERVED: &str = ".gitkeep";

#[derive(Debug, Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh 128-bit hex name with the given extension.
    pub fn write(&self, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory: {:?}", self.dir))?;
        let path = self
            .dir
            .join(format!("{:032x}.{}", rand::random::<u128>(), extension));
        fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Remove every entry except `.gitkeep`, returning how many were removed.
    ///
    /// A missing store is treated as empty. Entries that cannot be removed
    /// are skipped.
    pub fn sweep(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            if entry.file_name() == RESERVED {
                continue;
            }
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => log::debug!("Could not remove {:?}: {}", path, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grayshift-store-{}-{}", std::process::id(), name));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_write_uses_hex_name() {
        let store = TempStore::new(scratch("write"));
        let path = store.write("png", b"payload").unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "png");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fs::read(&path).unwrap(), b"payload");

        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_names_do_not_collide() {
        let store = TempStore::new(scratch("unique"));
        let a = store.write("jpeg", b"a").unwrap();
        let b = store.write("jpeg", b"b").unwrap();
        assert_ne!(a, b);
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_sweep_keeps_gitkeep() {
        let store = TempStore::new(scratch("sweep"));
        store.write("png", b"1").unwrap();
        store.write("tiff", b"2").unwrap();
        fs::create_dir_all(store.dir().join("nested")).unwrap();
        fs::write(store.dir().join(RESERVED), b"").unwrap();

        assert_eq!(store.sweep(), 3);
        let left: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec![RESERVED]);

        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_sweep_missing_dir() {
        assert_eq!(TempStore::new(scratch("missing")).sweep(), 0);
    }
}
