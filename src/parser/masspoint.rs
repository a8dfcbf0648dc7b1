use crate::error::RecordError;
use crate::model::{Decimal, MasspointRecord};

use super::numbered_lines;

// マスポイントファイル末尾の終端行
const SENTINEL_PREFIX: &str = "ENV";

// 1行1点（id,x,y,z）。空行と終端行は読み飛ばし、それ以外の不正な行はエラー
pub fn parse_masspoints(
    text: &str,
    area_name: &str,
) -> Result<Vec<MasspointRecord>, RecordError> {
    let mut records = Vec::new();

    for (line_no, line) in numbered_lines(text) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(SENTINEL_PREFIX) {
            continue;
        }
        records.push(parse_line(line_no, line, area_name)?);
    }

    Ok(records)
}

fn parse_line(
    line_no: usize,
    line: &str,
    area_name: &str,
) -> Result<MasspointRecord, RecordError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [id, x, y, z] = fields[..] else {
        return Err(RecordError::at_line(
            line_no,
            format!("expected 4 comma separated fields, found {}", fields.len()),
        ));
    };

    let original_point_id = parse_id(id).ok_or_else(|| {
        RecordError::at_line(line_no, format!("invalid point id {:?}", id))
    })?;
    let coord = |name: &str, token: &str| {
        Decimal::parse(token).ok_or_else(|| {
            RecordError::at_line(line_no, format!("invalid {} coordinate {:?}", name, token))
        })
    };

    Ok(MasspointRecord::new(
        area_name,
        original_point_id,
        coord("x", x)?,
        coord("y", y)?,
        coord("z", z)?,
    ))
}

// 非負整数のIDのみ受け付け、表記（先頭の0や桁数）はそのまま保持する
pub(crate) fn parse_id(token: &str) -> Option<&str> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(token)
}
