//! Log file discovery and line iteration.
//!
//! Walks a directory for files whose name contains the configured fragment
//! and yields their lines in order. Rotated `.gz` archives are decompressed
//! transparently. A file that cannot be read is reported and skipped; the
//! remaining files continue.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::warn;
use walkdir::WalkDir;

/// Finds every log file for one monitored family.
pub struct LogScanner {
    files: Vec<PathBuf>,
}

impl LogScanner {
    /// Collect files under `dir` whose filename contains `name_fragment`.
    pub fn new(dir: &Path, name_fragment: &str) -> Self {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_string_lossy().contains(name_fragment))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All lines from all discovered files, file by file, newlines stripped.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.files.iter().flat_map(|path| read_lines(path))
    }
}

/// Lines of one file; an unreadable file yields nothing.
fn read_lines(path: &Path) -> Vec<String> {
    let reader = match open_decompressed(path) {
        Ok(reader) => reader,
        Err(err) => {
            warn!("can't read {}: {err}", path.display());
            return Vec::new();
        }
    };
    reader
        .lines()
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(err) => {
                warn!("can't read {}: {err}", path.display());
                None
            }
        })
        .collect()
}

fn open_decompressed(path: &Path) -> std::io::Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::new(reader))
}
