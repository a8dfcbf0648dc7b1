use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{DemError, Result};

// 入れ子ZIPの展開を繰り返す上限
const MAX_NESTING_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    // 展開したZIPの数（オーダーZIP自身を含む）
    pub archives: usize,
    // 書き出したファイルの数（入れ子のZIPを含む）
    pub files: usize,
}

pub struct ZipHandler {
    path: PathBuf,
}

impl ZipHandler {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    // オーダーZIPを展開した後、入れ子のZIPがなくなるまで展開を繰り返す
    pub fn extract_all(&self, dest: &Path) -> Result<ExtractSummary> {
        fs::create_dir_all(dest).map_err(|e| DemError::write(dest, e))?;

        let mut summary = ExtractSummary {
            archives: 1,
            files: extract_archive(&self.path, dest)?,
        };
        info!("Extracted {} entries from {:?}", summary.files, self.path);

        for depth in 0.. {
            let nested = find_nested_archives(dest)?;
            if nested.is_empty() {
                break;
            }
            if depth >= MAX_NESTING_DEPTH {
                return Err(archive_error(
                    &nested[0],
                    io::Error::other(format!(
                        "archives nested deeper than {} levels",
                        MAX_NESTING_DEPTH
                    ))
                    .into(),
                ));
            }

            for archive in nested {
                // ZIPと同じ名前のディレクトリへ展開してからZIPは削除する
                let target = archive.with_extension("");
                let files = extract_archive(&archive, &target)?;
                fs::remove_file(&archive).map_err(|e| archive_error(&archive, e.into()))?;
                debug!("Extracted {} entries from nested {:?}", files, archive);

                summary.archives += 1;
                summary.files += files;
            }
        }

        info!(
            "Extracted {} archives ({} files) into {:?}",
            summary.archives, summary.files, dest
        );
        Ok(summary)
    }
}

fn archive_error(path: &Path, source: ZipError) -> DemError {
    DemError::Archive {
        path: path.to_path_buf(),
        source,
    }
}

fn find_nested_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_error(root, io::Error::from(e).into()))?;
        let is_zip = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if entry.file_type().is_file() && is_zip {
            archives.push(entry.into_path());
        }
    }

    Ok(archives)
}

fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path).map_err(|e| archive_error(archive_path, e.into()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(archive_path, e))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(archive_path, e))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(
                "Skipping unsafe entry {:?} in {:?}",
                entry.name(),
                archive_path
            );
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| archive_error(archive_path, e.into()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| archive_error(archive_path, e.into()))?;
        }

        let mut out = File::create(&out_path).map_err(|e| archive_error(archive_path, e.into()))?;
        io::copy(&mut entry, &mut out).map_err(|e| archive_error(archive_path, e.into()))?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_nested_archives() {
        let temp_dir = TempDir::new().unwrap();
        let inner = zip_bytes(&[
            ("72e01ne.gnp", b"1,100.0,200.0,1050.5\n".as_slice()),
            ("72e01ne.ghl", b"5\r1 2 3\r4 5 6\rEND\r".as_slice()),
        ]);
        let order = zip_bytes(&[
            ("order/72e01ne.zip", inner.as_slice()),
            ("order/readme.txt", b"hi".as_slice()),
        ]);
        let order_path = temp_dir.path().join("order.zip");
        fs::write(&order_path, order).unwrap();

        let work = temp_dir.path().join("work");
        let summary = ZipHandler::new(&order_path).extract_all(&work).unwrap();

        assert_eq!(summary.archives, 2);
        assert_eq!(summary.files, 4);
        assert!(work.join("order/72e01ne/72e01ne.gnp").is_file());
        assert!(work.join("order/72e01ne/72e01ne.ghl").is_file());
        assert!(work.join("order/readme.txt").is_file());
        assert!(!work.join("order/72e01ne.zip").exists());
    }

    #[test]
    fn test_doubly_nested_archive() {
        let temp_dir = TempDir::new().unwrap();
        let tile = zip_bytes(&[("72e01ne.gsl", b"".as_slice())]);
        let block = zip_bytes(&[("72e01ne.zip", tile.as_slice())]);
        let order = zip_bytes(&[("72e.zip", block.as_slice())]);
        let order_path = temp_dir.path().join("order.zip");
        fs::write(&order_path, order).unwrap();

        let work = temp_dir.path().join("work");
        let summary = ZipHandler::new(&order_path).extract_all(&work).unwrap();

        assert_eq!(summary.archives, 3);
        assert!(work.join("72e/72e01ne/72e01ne.gsl").is_file());
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let temp_dir = TempDir::new().unwrap();
        let order_path = temp_dir.path().join("order.zip");
        fs::write(&order_path, b"not a zip file").unwrap();

        let result = ZipHandler::new(&order_path).extract_all(&temp_dir.path().join("work"));
        match result {
            Err(DemError::Archive { path, .. }) => assert_eq!(path, order_path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_nested_archive_names_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        let order = zip_bytes(&[("72e01ne.zip", b"garbage".as_slice())]);
        let order_path = temp_dir.path().join("order.zip");
        fs::write(&order_path, order).unwrap();

        let work = temp_dir.path().join("work");
        let result = ZipHandler::new(&order_path).extract_all(&work);
        match result {
            Err(DemError::Archive { path, .. }) => {
                assert_eq!(path.file_name().unwrap(), "72e01ne.zip")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
