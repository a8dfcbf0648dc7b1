use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::classifier::{discover_tiles, TileFiles};
use crate::config::ConvertConfig;
use crate::error::{DemError, Result};
use crate::model::{BreaklineRecord, CsvRecord, LineType, MasspointRecord, Tile, TileKind};
use crate::parser::{parse_breakline_tile, parse_masspoint_tile};
use crate::writer::{CsvMergeWriter, MergeStats, StagedOutput};
use crate::zip_handler::{ExtractSummary, ZipHandler};

// 種別ごと・タイルごとのレコード（並びは分類結果の順）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTiles {
    pub masspoint: Vec<Vec<MasspointRecord>>,
    pub hard_breakline: Vec<Vec<BreaklineRecord>>,
    pub soft_breakline: Vec<Vec<BreaklineRecord>>,
}

impl ParsedTiles {
    pub fn parse(files: &TileFiles) -> Result<Self> {
        Ok(Self {
            masspoint: parse_all(files.get(TileKind::Masspoint), parse_masspoint_tile)?,
            hard_breakline: parse_all(files.get(TileKind::HardBreakline), |tile| {
                parse_breakline_tile(tile, LineType::Hard)
            })?,
            soft_breakline: parse_all(files.get(TileKind::SoftBreakline), |tile| {
                parse_breakline_tile(tile, LineType::Soft)
            })?,
        })
    }
}

fn parse_all<R, F>(tiles: &[Tile], parse: F) -> Result<Vec<Vec<R>>>
where
    R: Send,
    F: Fn(&Tile) -> Result<Vec<R>> + Sync,
{
    // 並列で解析し、結果はタイル順のまま集める（エラーもタイル順で最初のものを返す）
    let results: Vec<Result<Vec<R>>> = tiles.par_iter().map(&parse).collect();
    results.into_iter().collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub extract: ExtractSummary,
    pub masspoint: MergeStats,
    pub hard_breakline: MergeStats,
    pub soft_breakline: MergeStats,
}

impl ConversionReport {
    pub fn get(&self, kind: TileKind) -> &MergeStats {
        match kind {
            TileKind::Masspoint => &self.masspoint,
            TileKind::HardBreakline => &self.hard_breakline,
            TileKind::SoftBreakline => &self.soft_breakline,
        }
    }
}

// 展開先ディレクトリ（指定がなければ一時ディレクトリ）
enum WorkDir {
    Kept(PathBuf),
    Temp(TempDir),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Kept(path) => path.as_path(),
            WorkDir::Temp(dir) => dir.path(),
        }
    }
}

pub struct Converter {
    config: ConvertConfig,
    writer: CsvMergeWriter,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            writer: CsvMergeWriter::new(),
        }
    }

    pub fn run(&self) -> Result<ConversionReport> {
        self.validate_archive()?;

        let work = self.work_dir()?;
        info!("Extracting {:?} into {:?}", self.config.archive, work.path());
        let extract = ZipHandler::new(&self.config.archive).extract_all(work.path())?;

        let files = discover_tiles(work.path())?;
        if files.is_empty() {
            warn!("No masspoint or breakline tiles found in {:?}", self.config.archive);
        }

        info!("Parsing {} tiles", files.len());
        let parsed = ParsedTiles::parse(&files)?;

        // 出力ディレクトリを新規作成した場合は失敗時に片付ける
        let output_dir = &self.config.output_dir;
        let created_output_dir = !output_dir.exists();
        fs::create_dir_all(output_dir).map_err(|e| DemError::write(output_dir, e))?;

        match self.publish(&parsed, extract) {
            Ok(report) => Ok(report),
            Err(e) => {
                if created_output_dir {
                    if let Err(cleanup) = fs::remove_dir_all(output_dir) {
                        warn!("Failed to remove {:?}: {}", output_dir, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    fn validate_archive(&self) -> Result<()> {
        let archive = &self.config.archive;
        let reason = if !archive.exists() {
            "file does not exist"
        } else if !archive.is_file() {
            "not a regular file"
        } else {
            return Ok(());
        };

        Err(DemError::Argument {
            path: archive.clone(),
            reason: reason.to_string(),
        })
    }

    fn work_dir(&self) -> Result<WorkDir> {
        match &self.config.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| DemError::write(dir, e))?;
                // 前回の展開結果が残っていると別のアーカイブのタイルが混ざる
                let mut entries = fs::read_dir(dir).map_err(|e| DemError::write(dir, e))?;
                if entries.next().is_some() {
                    return Err(DemError::Argument {
                        path: dir.clone(),
                        reason: "work directory is not empty".to_string(),
                    });
                }
                Ok(WorkDir::Kept(dir.clone()))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("dem-csv-")
                    .tempdir()
                    .map_err(|e| DemError::write(std::env::temp_dir(), e))?;
                Ok(WorkDir::Temp(dir))
            }
        }
    }

    // 3ファイルとも一時ファイルに書き終えてから置き換える
    // 置き換えはファイルごとのrenameなので、途中のrenameが失敗すると
    // それ以前に置き換えたファイルは元に戻らない
    fn publish(&self, parsed: &ParsedTiles, extract: ExtractSummary) -> Result<ConversionReport> {
        let masspoint = self.stage(TileKind::Masspoint, &parsed.masspoint)?;
        let hard_breakline = self.stage(TileKind::HardBreakline, &parsed.hard_breakline)?;
        let soft_breakline = self.stage(TileKind::SoftBreakline, &parsed.soft_breakline)?;

        let report = ConversionReport {
            extract,
            masspoint: masspoint.persist()?,
            hard_breakline: hard_breakline.persist()?,
            soft_breakline: soft_breakline.persist()?,
        };

        for kind in TileKind::ALL {
            let stats = report.get(kind);
            info!(
                "Wrote {:?}: {} rows from {} tiles, {} distinct keys",
                self.config.output_dir.join(kind.output_file_name()),
                stats.rows,
                stats.tiles,
                stats.distinct_keys
            );
            if let Some((min, max)) = stats.elevation_range {
                info!("{} elevation range: {} .. {}", kind, min, max);
            }
        }

        Ok(report)
    }

    fn stage<R>(&self, kind: TileKind, tiles: &[Vec<R>]) -> Result<StagedOutput>
    where
        R: CsvRecord,
    {
        let dest = self.config.output_dir.join(kind.output_file_name());
        let staged = self.writer.stage(&dest, tiles)?;
        self.check_duplicates(kind, staged.stats())?;
        Ok(staged)
    }

    fn check_duplicates(&self, kind: TileKind, stats: &MergeStats) -> Result<()> {
        let count = stats.duplicate_keys;
        if count == 0 {
            return Ok(());
        }
        let first = stats.first_duplicate.clone().unwrap_or_default();

        if self.config.fail_on_duplicate_keys {
            return Err(DemError::DuplicateKey {
                file: kind.output_file_name().to_string(),
                count,
                first,
            });
        }
        warn!(
            "DuplicateKeyWarning: {} duplicate point_id values in {} (first: {})",
            count,
            kind.output_file_name(),
            first
        );
        Ok(())
    }
}
