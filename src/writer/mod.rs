use std::collections::HashSet;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{DemError, Result};
use crate::model::CsvRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStats {
    pub tiles: usize,
    pub rows: usize,
    // (area_id, line_id)または(area_id, point_id)の異なる組の数
    // エリア名はIDに含まれるので、ブレークラインは本数、マスポイントは点数になる
    pub distinct_keys: usize,
    // 既出のpoint_idを持つ行の数と最初の重複
    pub duplicate_keys: usize,
    pub first_duplicate: Option<String>,
    // z列の(最小, 最大)、行がなければNone
    pub elevation_range: Option<(f64, f64)>,
}

// 出力先と同じディレクトリに書き出した一時ファイル
// persistせずにdropすると一時ファイルは削除され、出力先は変わらない
#[derive(Debug)]
pub struct StagedOutput {
    temp: NamedTempFile,
    dest: PathBuf,
    stats: MergeStats,
}

impl StagedOutput {
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    // renameで出力先を置き換える
    pub fn persist(self) -> Result<MergeStats> {
        let StagedOutput { temp, dest, stats } = self;
        temp.persist(&dest)
            .map_err(|e| DemError::write(&dest, e.error))?;
        Ok(stats)
    }
}

#[derive(Default)]
pub struct CsvMergeWriter {}

impl CsvMergeWriter {
    pub fn new() -> Self {
        Self {}
    }

    // ヘッダーの後にタイル順でレコードを書き出す（並べ替えや重複除去はしない）
    pub fn render<W: Write, R: CsvRecord>(
        &self,
        out: &mut W,
        tiles: &[Vec<R>],
    ) -> io::Result<MergeStats> {
        writeln!(out, "{}", R::HEADER)?;

        let mut point_ids: HashSet<&str> = HashSet::new();
        let mut distinct: HashSet<&str> = HashSet::new();
        let mut stats = MergeStats {
            tiles: tiles.len(),
            ..MergeStats::default()
        };

        for record in tiles.iter().flatten() {
            record.write_row(out)?;
            stats.rows += 1;

            if !point_ids.insert(record.key()) {
                stats.duplicate_keys += 1;
                if stats.first_duplicate.is_none() {
                    stats.first_duplicate = Some(record.key().to_string());
                }
            }
            distinct.insert(record.distinct_key());

            let z = record.elevation().value();
            stats.elevation_range = Some(match stats.elevation_range {
                Some((min, max)) => (min.min(z), max.max(z)),
                None => (z, z),
            });
        }
        stats.distinct_keys = distinct.len();

        Ok(stats)
    }

    // 出力先のディレクトリに一時ファイルとして書き出す（公開はpersistで行う）
    pub fn stage<R: CsvRecord>(&self, dest: &Path, tiles: &[Vec<R>]) -> Result<StagedOutput> {
        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| DemError::write(dest, e))?;

        let stats = {
            let mut out = BufWriter::new(temp.as_file_mut());
            let stats = self
                .render(&mut out, tiles)
                .map_err(|e| DemError::write(dest, e))?;
            out.flush().map_err(|e| DemError::write(dest, e))?;
            stats
        };
        temp.as_file()
            .sync_all()
            .map_err(|e| DemError::write(dest, e))?;

        Ok(StagedOutput {
            temp,
            dest: dest.to_path_buf(),
            stats,
        })
    }

    // 全行を書き終えた場合のみ出力先を置き換える
    pub fn write<R: CsvRecord>(&self, dest: &Path, tiles: &[Vec<R>]) -> Result<MergeStats> {
        self.stage(dest, tiles)?.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BreaklineRecord, Decimal, LineType, MasspointRecord};
    use std::fs;
    use tempfile::TempDir;

    fn dec(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    fn masspoint(area: &str, id: &str, z: &str) -> MasspointRecord {
        MasspointRecord::new(area, id, dec("1.0"), dec("2.0"), dec(z))
    }

    #[test]
    fn test_render_concatenates_in_tile_order() {
        let tiles = vec![
            vec![masspoint("b", "2", "10.0"), masspoint("b", "1", "11.0")],
            vec![],
            vec![masspoint("a", "1", "-3.5")],
        ];

        let mut buf = Vec::new();
        let stats = CsvMergeWriter::new().render(&mut buf, &tiles).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "point_id,area_id,original_point_id,x,y,z\n\
             b_2,b,2,1.0,2.0,10.0\n\
             b_1,b,1,1.0,2.0,11.0\n\
             a_1,a,1,1.0,2.0,-3.5\n"
        );
        assert_eq!(stats.tiles, 3);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.distinct_keys, 3);
        assert_eq!(stats.duplicate_keys, 0);
        assert_eq!(stats.first_duplicate, None);
        assert_eq!(stats.elevation_range, Some((-3.5, 11.0)));
    }

    #[test]
    fn test_render_empty_has_only_header() {
        let tiles: Vec<Vec<BreaklineRecord>> = Vec::new();
        let mut buf = Vec::new();
        let stats = CsvMergeWriter::new().render(&mut buf, &tiles).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "point_id,area_id,line_id,original_line_id,line_type,point_type,x,y,z\n"
        );
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.elevation_range, None);
    }

    #[test]
    fn test_duplicates_are_counted_not_removed() {
        let pair = |id| {
            BreaklineRecord::pair(
                "a",
                LineType::Hard,
                id,
                [dec("0"), dec("0"), dec("0")],
                [dec("1"), dec("1"), dec("1")],
            )
            .to_vec()
        };
        let tiles = vec![pair("1"), pair("2"), pair("1")];

        let mut buf = Vec::new();
        let stats = CsvMergeWriter::new().render(&mut buf, &tiles).unwrap();

        assert_eq!(stats.rows, 6);
        // 異なるラインは2本
        assert_eq!(stats.distinct_keys, 2);
        assert_eq!(stats.duplicate_keys, 2);
        assert_eq!(stats.first_duplicate.as_deref(), Some("a_hard_1_start"));
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 7);
    }

    #[test]
    fn test_distinct_keys_count_lines_for_breaklines() {
        let line = |area, id| {
            BreaklineRecord::pair(
                area,
                LineType::Soft,
                id,
                [dec("0"), dec("0"), dec("0")],
                [dec("1"), dec("1"), dec("1")],
            )
            .to_vec()
        };
        // 同じ元IDでもエリアが違えば別のライン
        let tiles = vec![line("a", "1"), line("a", "2"), line("b", "1")];

        let stats = CsvMergeWriter::new().render(&mut Vec::<u8>::new(), &tiles).unwrap();
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.distinct_keys, 3);
        assert_eq!(stats.duplicate_keys, 0);
        assert_eq!(stats.first_duplicate, None);
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("masspoint.csv");
        fs::write(&dest, "stale\n").unwrap();

        let stats = CsvMergeWriter::new()
            .write(&dest, &[vec![masspoint("a", "1", "5.0")]])
            .unwrap();

        assert_eq!(stats.rows, 1);
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "point_id,area_id,original_point_id,x,y,z\na_1,a,1,1.0,2.0,5.0\n"
        );
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_stage_leaves_destination_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("masspoint.csv");
        fs::write(&dest, "previous\n").unwrap();

        let staged = CsvMergeWriter::new()
            .stage(&dest, &[vec![masspoint("a", "1", "5.0")]])
            .unwrap();
        assert_eq!(staged.stats().rows, 1);
        assert_eq!(staged.dest(), dest.as_path());
        drop(staged);

        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous\n");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_stage_into_missing_directory_is_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("missing").join("masspoint.csv");

        let result = CsvMergeWriter::new().stage(&dest, &[vec![masspoint("a", "1", "5.0")]]);
        match result {
            Err(DemError::Write { path, .. }) => assert_eq!(path, dest),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
