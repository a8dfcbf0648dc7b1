use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::id;

// タイルファイルの種別（拡張子で決まる）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileKind {
    Masspoint,
    HardBreakline,
    SoftBreakline,
}

impl TileKind {
    pub const ALL: [TileKind; 3] = [
        TileKind::Masspoint,
        TileKind::HardBreakline,
        TileKind::SoftBreakline,
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "gnp" => Some(TileKind::Masspoint),
            "ghl" => Some(TileKind::HardBreakline),
            "gsl" => Some(TileKind::SoftBreakline),
            _ => None,
        }
    }

    pub fn output_file_name(&self) -> &'static str {
        match self {
            TileKind::Masspoint => "masspoint.csv",
            TileKind::HardBreakline => "hard_breakline.csv",
            TileKind::SoftBreakline => "soft_breakline.csv",
        }
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileKind::Masspoint => "masspoint",
            TileKind::HardBreakline => "hard_breakline",
            TileKind::SoftBreakline => "soft_breakline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    Hard,
    Soft,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Hard => "hard",
            LineType::Soft => "soft",
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointType {
    Start,
    End,
}

impl PointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::Start => "start",
            PointType::End => "end",
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 展開済みのタイルファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub path: PathBuf,
    pub area_name: String,
    pub kind: TileKind,
}

impl Tile {
    // 拡張子で分類し、対象外のファイルはNoneを返す
    pub fn from_path(path: &Path) -> Option<Self> {
        let kind = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(TileKind::from_extension)?;
        let area_name = path.file_stem().and_then(|s| s.to_str())?;
        if area_name.is_empty() {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            area_name: area_name.to_string(),
            kind,
        })
    }
}

// 元の表記を保持した数値（出力時はそのまま書き戻す）
#[derive(Debug, Clone, PartialEq)]
pub struct Decimal {
    text: String,
    value: f64,
}

impl Decimal {
    // [+-]?digits[.digits] の形式のみ受け付ける（指数表記やNaNは不可）
    pub fn parse(token: &str) -> Option<Self> {
        let unsigned = token
            .strip_prefix('-')
            .or_else(|| token.strip_prefix('+'))
            .unwrap_or(token);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }

        let value = token.parse::<f64>().ok()?;
        Some(Self {
            text: token.to_string(),
            value,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MasspointRecord {
    pub point_id: String,
    pub area_id: String,
    pub original_point_id: String,
    pub x: Decimal,
    pub y: Decimal,
    pub z: Decimal,
}

impl MasspointRecord {
    pub fn new(
        area_name: &str,
        original_point_id: &str,
        x: Decimal,
        y: Decimal,
        z: Decimal,
    ) -> Self {
        Self {
            point_id: id::masspoint_point_id(area_name, original_point_id),
            area_id: area_name.to_string(),
            original_point_id: original_point_id.to_string(),
            x,
            y,
            z,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreaklineRecord {
    pub point_id: String,
    pub area_id: String,
    pub line_id: String,
    pub original_line_id: String,
    pub line_type: LineType,
    pub point_type: PointType,
    pub x: Decimal,
    pub y: Decimal,
    pub z: Decimal,
}

impl BreaklineRecord {
    // 1本のブレークラインから始点・終点の2レコードを作る
    pub fn pair(
        area_name: &str,
        line_type: LineType,
        original_line_id: &str,
        start: [Decimal; 3],
        end: [Decimal; 3],
    ) -> [BreaklineRecord; 2] {
        let line_id = id::breakline_line_id(area_name, line_type, original_line_id);
        let make = |point_type: PointType, [x, y, z]: [Decimal; 3]| BreaklineRecord {
            point_id: id::breakline_point_id(&line_id, point_type),
            area_id: area_name.to_string(),
            line_id: line_id.clone(),
            original_line_id: original_line_id.to_string(),
            line_type,
            point_type,
            x,
            y,
            z,
        };

        [make(PointType::Start, start), make(PointType::End, end)]
    }
}

// 出力CSVの1行として書き出せるレコード
pub trait CsvRecord {
    const HEADER: &'static str;

    // 行の主キー（point_id）
    fn key(&self) -> &str;

    // 統計用のキー（マスポイントはpoint_id、ブレークラインはline_id）
    fn distinct_key(&self) -> &str;

    fn elevation(&self) -> &Decimal;

    fn write_row<W: Write>(&self, out: &mut W) -> io::Result<()>;
}

impl CsvRecord for MasspointRecord {
    const HEADER: &'static str = "point_id,area_id,original_point_id,x,y,z";

    fn key(&self) -> &str {
        &self.point_id
    }

    fn distinct_key(&self) -> &str {
        &self.point_id
    }

    fn elevation(&self) -> &Decimal {
        &self.z
    }

    fn write_row<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            self.point_id, self.area_id, self.original_point_id, self.x, self.y, self.z
        )
    }
}

impl CsvRecord for BreaklineRecord {
    const HEADER: &'static str =
        "point_id,area_id,line_id,original_line_id,line_type,point_type,x,y,z";

    fn key(&self) -> &str {
        &self.point_id
    }

    fn distinct_key(&self) -> &str {
        &self.line_id
    }

    fn elevation(&self) -> &Decimal {
        &self.z
    }

    fn write_row<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            self.point_id,
            self.area_id,
            self.line_id,
            self.original_line_id,
            self.line_type,
            self.point_type,
            self.x,
            self.y,
            self.z
        )
    }
}
