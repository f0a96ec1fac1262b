//! Per-type CSV exports.

use crate::core::{ReportError, ViolationBucket, ViolationSet};

use futures::future::try_join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Header row of every export.
pub const CSV_HEADER: [&str; 2] = ["Type", "Name"];

/// Makes a resource type safe to use in a file name.
///
/// `AWS::EC2::Instance` becomes `AWS-EC2-Instance`, and
/// `compute.googleapis.com/Disk` becomes `compute.googleapis.com-Disk`.
pub fn sanitize_type(resource_type: &str) -> String {
    resource_type.replace("::", "-").replace('/', "-")
}

/// Returns the file name used for one (bucket, type) export.
pub fn file_name(bucket: ViolationBucket, resource_type: &str) -> String {
    format!("{}_{}.csv", bucket.slug(), sanitize_type(resource_type))
}

/// Returns `file_name(bucket, resource_type)`, suffixed with `-2`, `-3`, ...
/// if that name is already in `taken`. The chosen name is added to `taken`.
fn unique_file_name(
    taken: &mut HashSet<String>,
    bucket: ViolationBucket,
    resource_type: &str,
) -> String {
    let first = file_name(bucket, resource_type);
    let stem = first.trim_end_matches(".csv").to_string();
    let mut name = first;
    let mut n = 1;
    while taken.contains(&name) {
        n += 1;
        name = format!("{}-{}.csv", stem, n);
    }
    taken.insert(name.clone());
    name
}

/// Writes one CSV file per (bucket, resource type) into an output directory.
///
/// Files are written concurrently on the blocking pool; each task owns
/// exactly one file.
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    output_dir: PathBuf,
}

impl CsvReportWriter {
    /// Creates a writer for `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory and removes files left by earlier runs.
    pub async fn prepare(&self) -> Result<(), ReportError> {
        let dir = &self.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ReportError::io(dir, e))?;

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ReportError::io(dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReportError::io(dir, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ReportError::io(&path, e))?;
            if file_type.is_file() {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| ReportError::io(&path, e))?;
                tracing::debug!(path = %path.display(), "Removed stale report file");
            }
        }

        Ok(())
    }

    /// Clears the directory and writes every violation group.
    ///
    /// Returns the written paths, buckets first then types in sorted order.
    pub async fn write(&self, violations: &ViolationSet) -> Result<Vec<PathBuf>, ReportError> {
        self.prepare().await?;

        // Distinct types can sanitize to the same name (`a::b`, `a/b`).
        let mut taken = HashSet::new();
        let groups: Vec<_> = violations
            .groups()
            .map(|(bucket, resource_type, ids)| {
                let name = unique_file_name(&mut taken, bucket, resource_type);
                (self.output_dir.join(name), resource_type, ids)
            })
            .collect();

        let tasks = groups.into_iter().map(|(path, resource_type, ids)| {
            let resource_type = resource_type.to_string();
            let ids = ids.to_vec();

            async move {
                let task = tokio::task::spawn_blocking(move || {
                    write_csv(&path, &resource_type, &ids).map(|()| path)
                });
                match task.await {
                    Ok(result) => result,
                    Err(e) => Err(ReportError::Task(e.to_string())),
                }
            }
        });

        let paths = try_join_all(tasks).await?;

        tracing::info!(
            output_dir = %self.output_dir.display(),
            files = paths.len(),
            "CSV reports written"
        );

        Ok(paths)
    }
}

fn write_csv(path: &Path, resource_type: &str, ids: &[String]) -> Result<(), ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for id in ids {
        writer
            .write_record([resource_type, id.as_str()])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_type() {
        assert_eq!(sanitize_type("AWS::EC2::Instance"), "AWS-EC2-Instance");
        assert_eq!(
            sanitize_type("compute.googleapis.com/Disk"),
            "compute.googleapis.com-Disk"
        );
        assert_eq!(
            file_name(ViolationBucket::BannedLabelPresent, "AWS::S3::Bucket"),
            "banned-label_AWS-S3-Bucket.csv"
        );
    }

    #[tokio::test]
    async fn test_write_one_file_per_group() {
        let dir = TempDir::new().unwrap();
        let mut violations = ViolationSet::new();
        violations.record(ViolationBucket::NoRequiredLabel, "AWS::S3::Bucket", "arn:b1");
        violations.record(ViolationBucket::NoRequiredLabel, "AWS::S3::Bucket", "arn:b2");
        violations.record(ViolationBucket::NoRequiredLabel, "AWS::EC2::Instance", "arn:i1");
        violations.record(ViolationBucket::BannedLabelPresent, "AWS::S3::Bucket", "arn:b3");

        let writer = CsvReportWriter::new(dir.path());
        let paths = writer.write(&violations).await.unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "no-required-label_AWS-EC2-Instance.csv",
                "no-required-label_AWS-S3-Bucket.csv",
                "banned-label_AWS-S3-Bucket.csv",
            ]
        );

        let content =
            std::fs::read_to_string(dir.path().join("no-required-label_AWS-S3-Bucket.csv")).unwrap();
        assert_eq!(
            content,
            "Type,Name\nAWS::S3::Bucket,arn:b1\nAWS::S3::Bucket,arn:b2\n"
        );
    }

    #[tokio::test]
    async fn test_colliding_types_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let mut violations = ViolationSet::new();
        violations.record(ViolationBucket::NoRequiredLabel, "a::b", "r1");
        violations.record(ViolationBucket::NoRequiredLabel, "a/b", "r2");

        let paths = CsvReportWriter::new(dir.path()).write(&violations).await.unwrap();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);

        let mut rows: Vec<_> = paths
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        rows.sort();
        assert_eq!(rows, vec!["Type,Name\na/b,r2\n", "Type,Name\na::b,r1\n"]);
    }

    #[tokio::test]
    async fn test_write_removes_stale_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old.csv"), "stale").unwrap();
        std::fs::write(dir.path().join("2024-01-01_prod.zip"), "stale").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        let writer = CsvReportWriter::new(dir.path());
        let paths = writer.write(&ViolationSet::new()).await.unwrap();

        assert!(paths.is_empty());
        assert!(!dir.path().join("old.csv").exists());
        assert!(!dir.path().join("2024-01-01_prod.zip").exists());
        assert!(dir.path().join("keep").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("reports").join("tagwarden");

        CsvReportWriter::new(&nested).prepare().await.unwrap();
        assert!(nested.is_dir());
    }
}
