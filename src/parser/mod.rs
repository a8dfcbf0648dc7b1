pub mod breakline;
pub mod masspoint;

use std::fs;

use tracing::debug;

use crate::error::{DemError, Result};
use crate::model::{BreaklineRecord, LineType, MasspointRecord, Tile};

pub use breakline::parse_breaklines;
pub use masspoint::parse_masspoints;

// 改行（\r、\r\n、\n）で分割して1始まりの行番号を付ける
// ブレークラインファイルは\rのみで改行されている。末尾の改行で空行は増えない
pub(crate) fn numbered_lines(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(n, line)| (n + 1, line))
        .collect()
}

fn read_tile(tile: &Tile) -> Result<String> {
    let bytes = fs::read(&tile.path).map_err(|source| DemError::TileRead {
        path: tile.path.clone(),
        source,
    })?;
    // 数値以外は含まれない想定なので不正なバイトは置換してパース側で検出する
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn parse_masspoint_tile(tile: &Tile) -> Result<Vec<MasspointRecord>> {
    let text = read_tile(tile)?;
    let records = parse_masspoints(&text, &tile.area_name).map_err(|source| {
        DemError::MalformedRecord {
            path: tile.path.clone(),
            source,
        }
    })?;
    debug!("Parsed {} masspoints from {:?}", records.len(), tile.path);
    Ok(records)
}

pub fn parse_breakline_tile(tile: &Tile, line_type: LineType) -> Result<Vec<BreaklineRecord>> {
    let text = read_tile(tile)?;
    let records = parse_breaklines(&text, &tile.area_name, line_type).map_err(|source| {
        DemError::MalformedRecord {
            path: tile.path.clone(),
            source,
        }
    })?;
    debug!(
        "Parsed {} {} breakline points from {:?}",
        records.len(),
        line_type,
        tile.path
    );
    Ok(records)
}
