use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "./output";

// 変換1回分の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub archive: PathBuf,
    // 3つのCSVの出力先（なければ作成）
    pub output_dir: PathBuf,
    // 展開先。Noneなら一時ディレクトリを使い処理後に削除する
    // 指定した場合は空のディレクトリである必要があり、処理後も残す
    pub work_dir: Option<PathBuf>,
    // point_idの重複を警告ではなくエラーにする
    pub fail_on_duplicate_keys: bool,
}

impl ConvertConfig {
    pub fn new<P: Into<PathBuf>>(archive: P) -> Self {
        Self {
            archive: archive.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            work_dir: None,
            fail_on_duplicate_keys: false,
        }
    }

    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn fail_on_duplicate_keys(mut self, fail: bool) -> Self {
        self.fail_on_duplicate_keys = fail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConvertConfig::new("order.zip");
        assert_eq!(config.archive, PathBuf::from("order.zip"));
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.work_dir, None);
        assert!(!config.fail_on_duplicate_keys);
    }

    #[test]
    fn test_builder() {
        let config = ConvertConfig::new("order.zip")
            .output_dir("/tmp/out")
            .work_dir("/tmp/work")
            .fail_on_duplicate_keys(true);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.work_dir, Some(PathBuf::from("/tmp/work")));
        assert!(config.fail_on_duplicate_keys);
    }
}
