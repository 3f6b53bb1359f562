//! Stored capture access: discovery of per-antenna `.npy` groups and
//! load/save of complex sample arrays.
//!
//! A capture named `base` is stored as `base_rx0.npy`, `base_rx1.npy`,
//! `base_rx2.npy` — one 2-D complex array per antenna, rows being
//! time-steps. A capture missing any antenna file is incomplete and is
//! excluded from replay entirely, never partially used.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use num_complex::Complex32;
use regex::Regex;
use thiserror::Error;

use cir_protocol::NUM_ANTENNAS;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("unable to open folder: {0}")]
    FolderNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("npy error at {path}: {reason}")]
    Npy { path: PathBuf, reason: String },
}

/// A named capture with one stored sample array per antenna.
#[derive(Debug, Clone)]
pub struct LogGroup {
    pub base: String,
    pub paths: [PathBuf; NUM_ANTENNAS],
}

fn capture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*)_rx([0-2])\.npy$").expect("capture name pattern"))
}

/// Scan `folder` for complete capture groups, sorted by base name.
/// Incomplete groups are logged and excluded.
pub fn discover_groups(folder: &Path) -> Result<Vec<LogGroup>, StorageError> {
    if !folder.is_dir() {
        return Err(StorageError::FolderNotFound(folder.to_path_buf()));
    }

    let mut found: BTreeMap<String, [Option<PathBuf>; NUM_ANTENNAS]> = BTreeMap::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(caps) = capture_re().captures(&name) {
            let base = caps[1].to_string();
            let rx: usize = caps[2].parse().expect("single-digit antenna index");
            found.entry(base).or_default()[rx] = Some(entry.path());
        }
    }

    let mut groups = Vec::with_capacity(found.len());
    for (base, paths) in found {
        match paths {
            [Some(rx0), Some(rx1), Some(rx2)] => groups.push(LogGroup {
                base,
                paths: [rx0, rx1, rx2],
            }),
            _ => log::warn!(
                "capture {} is missing antenna files, excluded from replay",
                base
            ),
        }
    }
    Ok(groups)
}

impl LogGroup {
    /// Load the three per-antenna arrays. Rows are time-steps; column
    /// counts may differ between captures (ranging-prefixed captures carry
    /// a leading distance column) and are replayed verbatim.
    pub fn load(&self) -> Result<[Array2<Complex32>; NUM_ANTENNAS], StorageError> {
        Ok([
            read_complex2(&self.paths[0])?,
            read_complex2(&self.paths[1])?,
            read_complex2(&self.paths[2])?,
        ])
    }
}

fn read_complex2(path: &Path) -> Result<Array2<Complex32>, StorageError> {
    let file = File::open(path)?;
    Array2::<Complex32>::read_npy(file).map_err(|e| StorageError::Npy {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Persist one acquisition session: one 2-D complex array per antenna,
/// named `{base}_rx{i}.npy`. When `ranging` is given, each row is prefixed
/// with the calibrated distance (real part) ahead of the range-bin columns.
/// Returns the written paths.
pub fn save_capture(
    folder: &Path,
    base: &str,
    frames: &Array3<Complex32>,
    ranging: Option<&Array1<u16>>,
) -> Result<Vec<PathBuf>, StorageError> {
    std::fs::create_dir_all(folder)?;
    let (steps, antennas, bins) = frames.dim();

    let mut written = Vec::with_capacity(antennas);
    for ant in 0..antennas {
        let data: Array2<Complex32> = match ranging {
            Some(twr) => Array2::from_shape_fn((steps, bins + 1), |(t, j)| {
                if j == 0 {
                    Complex32::new(twr[t] as f32, 0.0)
                } else {
                    frames[(t, ant, j - 1)]
                }
            }),
            None => frames.index_axis(Axis(1), ant).to_owned(),
        };

        let path = folder.join(format!("{}_rx{}.npy", base, ant));
        let file = File::create(&path)?;
        data.write_npy(file).map_err(|e| StorageError::Npy {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_group_completeness() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A_rx0.npy");
        touch(dir.path(), "A_rx1.npy");
        touch(dir.path(), "A_rx2.npy");
        touch(dir.path(), "B_rx0.npy");
        touch(dir.path(), "notes.txt");

        let groups = discover_groups(dir.path()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].base, "A");
    }

    #[test]
    fn test_groups_sorted_by_base() {
        let dir = tempfile::tempdir().unwrap();
        for base in ["zeta", "alpha", "mid"] {
            for rx in 0..3 {
                touch(dir.path(), &format!("{}_rx{}.npy", base, rx));
            }
        }
        let groups = discover_groups(dir.path()).unwrap();
        let bases: Vec<&str> = groups.iter().map(|g| g.base.as_str()).collect();
        assert_eq!(bases, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_missing_folder() {
        let err = discover_groups(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, StorageError::FolderNotFound(_)));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let frames = Array3::from_shape_fn((4, 3, 120), |(t, a, b)| {
            Complex32::new((t * 100 + a * 10) as f32, b as f32)
        });

        let written = save_capture(dir.path(), "user_walk", &frames, None).unwrap();
        assert_eq!(written.len(), 3);

        let groups = discover_groups(dir.path()).unwrap();
        assert_eq!(groups.len(), 1);
        let arrays = groups[0].load().unwrap();
        assert_eq!(arrays[0].dim(), (4, 120));
        assert_eq!(arrays[2][(3, 119)], Complex32::new(320.0, 119.0));
    }

    #[test]
    fn test_save_with_ranging_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let frames = Array3::from_elem((2, 3, 120), Complex32::new(1.0, -1.0));
        let twr = Array1::from(vec![370u16, 410]);

        save_capture(dir.path(), "cap", &frames, Some(&twr)).unwrap();
        let groups = discover_groups(dir.path()).unwrap();
        let arrays = groups[0].load().unwrap();
        assert_eq!(arrays[0].dim(), (2, 121));
        assert_eq!(arrays[0][(0, 0)], Complex32::new(370.0, 0.0));
        assert_eq!(arrays[0][(1, 0)], Complex32::new(410.0, 0.0));
        assert_eq!(arrays[0][(0, 1)], Complex32::new(1.0, -1.0));
    }
}
