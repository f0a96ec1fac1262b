//! Zip packaging of the CSV exports.

use crate::core::ReportError;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Returns the archive file name for a run: `<date>_<scope>.zip`.
pub fn archive_name(date: &str, scope: &str) -> String {
    format!("{}_{}.zip", date, scope.replace('/', "-"))
}

/// Zips every file in `dir` whose extension is `extension` into `output`.
///
/// Entries are stored flat, under their file names, in sorted order.
/// Returns the number of entries written.
pub async fn create_zip(
    dir: impl Into<PathBuf>,
    output: impl Into<PathBuf>,
    extension: &str,
) -> Result<usize, ReportError> {
    let dir = dir.into();
    let output = output.into();
    let extension = extension.to_string();

    tokio::task::spawn_blocking(move || create_zip_blocking(&dir, &output, &extension))
        .await
        .map_err(|e| ReportError::Task(e.to_string()))?
}

fn create_zip_blocking(dir: &Path, output: &Path, extension: &str) -> Result<usize, ReportError> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ReportError::io(dir, e))? {
        let path = entry.map_err(|e| ReportError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            inputs.push(path);
        }
    }
    inputs.sort();

    let archive_error = |reason: String| ReportError::Archive {
        path: output.to_path_buf(),
        reason,
    };

    let file = File::create(output).map_err(|e| ReportError::io(output, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        zip.start_file(name, options)
            .map_err(|e| archive_error(e.to_string()))?;
        let mut reader = BufReader::new(File::open(path).map_err(|e| ReportError::io(path, e))?);
        io::copy(&mut reader, &mut zip).map_err(|e| ReportError::io(path, e))?;
    }

    zip.finish().map_err(|e| archive_error(e.to_string()))?;

    tracing::debug!(
        archive = %output.display(),
        entries = inputs.len(),
        "Archive created"
    );

    Ok(inputs.len())
}
