use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// 変換処理全体で発生するエラー
#[derive(Debug, Error)]
pub enum DemError {
    #[error("Invalid path {path:?}: {reason}")]
    Argument { path: PathBuf, reason: String },

    #[error("Failed to extract archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Cannot scan input directory {path:?}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    #[error("Failed to read tile {path:?}: {source}")]
    TileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path:?}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{count} duplicate point_id values in {file} (first: {first})")]
    DuplicateKey {
        file: String,
        count: usize,
        first: String,
    },
}

impl DemError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DemError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DemError>;

// タイル内の不正なレコード（ファイルパスはDemError::MalformedRecordで付与する）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RecordError {
    // 1始まりの行番号
    pub line: usize,
    // 1始まりのブロック番号（ブレークラインのみ）
    pub block: Option<usize>,
    pub message: String,
}

impl RecordError {
    pub(crate) fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            block: None,
            message: message.into(),
        }
    }

    pub(crate) fn in_block(block: usize, line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            block: Some(block),
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(block) => write!(f, "block {} (line {}): {}", block, self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_display() {
        let err = RecordError::at_line(3, "expected 4 fields, found 2");
        assert_eq!(err.to_string(), "line 3: expected 4 fields, found 2");

        let err = RecordError::in_block(2, 8, "expected END, found \"6\"");
        assert_eq!(err.to_string(), "block 2 (line 8): expected END, found \"6\"");
    }

    #[test]
    fn test_malformed_record_names_file() {
        let err = DemError::MalformedRecord {
            path: PathBuf::from("/work/72e01ne.ghl"),
            source: RecordError::in_block(1, 4, "unexpected end of file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("72e01ne.ghl"), "{}", msg);
        assert!(msg.contains("block 1 (line 4)"), "{}", msg);
    }
}
