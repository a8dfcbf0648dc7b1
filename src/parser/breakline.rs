use crate::error::RecordError;
use crate::model::{BreaklineRecord, Decimal, LineType};

use super::masspoint::parse_id;
use super::numbered_lines;

const BLOCK_TERMINATOR: &str = "END";
const BLOCK_LINES: usize = 4;

// 4行1ブロック（ID / 始点xyz / 終点xyz / END）の繰り返し
// 空行はブロックの間でのみ許し、ブロック内の空行や欠けた行はエラー
pub fn parse_breaklines(
    text: &str,
    area_name: &str,
    line_type: LineType,
) -> Result<Vec<BreaklineRecord>, RecordError> {
    let lines: Vec<(usize, &str)> = numbered_lines(text)
        .into_iter()
        .map(|(n, line)| (n, line.trim()))
        .collect();

    let mut records = Vec::new();
    let mut rest = lines.as_slice();
    let mut block_no = 0;

    // ブロックの先頭まで空行を読み飛ばす
    while let Some(first) = rest.iter().position(|(_, line)| !line.is_empty()) {
        rest = &rest[first..];
        block_no += 1;

        let (block, tail) = rest.split_at(rest.len().min(BLOCK_LINES));
        rest = tail;
        records.extend(parse_block(block_no, block, area_name, line_type)?);
    }

    Ok(records)
}

fn parse_block(
    block_no: usize,
    block: &[(usize, &str)],
    area_name: &str,
    line_type: LineType,
) -> Result<[BreaklineRecord; 2], RecordError> {
    if let Some((blank_line, _)) = block.iter().find(|(_, line)| line.is_empty()) {
        return Err(RecordError::in_block(
            block_no,
            *blank_line,
            "blank line inside block",
        ));
    }

    let [(id_line, id), (start_line, start), (end_line, end), (term_line, term)] = *block else {
        let last_line = block.last().map(|(n, _)| *n).unwrap_or(0);
        return Err(RecordError::in_block(
            block_no,
            last_line,
            format!(
                "unexpected end of file after {} of {} block lines",
                block.len(),
                BLOCK_LINES
            ),
        ));
    };

    let original_line_id = parse_id(id).ok_or_else(|| {
        RecordError::in_block(block_no, id_line, format!("invalid line id {:?}", id))
    })?;
    let start = parse_vertex(block_no, start_line, start, "start")?;
    let end = parse_vertex(block_no, end_line, end, "end")?;
    if term != BLOCK_TERMINATOR {
        return Err(RecordError::in_block(
            block_no,
            term_line,
            format!("expected {}, found {:?}", BLOCK_TERMINATOR, term),
        ));
    }

    Ok(BreaklineRecord::pair(
        area_name,
        line_type,
        original_line_id,
        start,
        end,
    ))
}

fn parse_vertex(
    block_no: usize,
    line_no: usize,
    line: &str,
    which: &str,
) -> Result<[Decimal; 3], RecordError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [x, y, z] = tokens[..] else {
        return Err(RecordError::in_block(
            block_no,
            line_no,
            format!("expected 3 {} coordinates, found {:?}", which, line),
        ));
    };

    let coord = |token: &str| {
        Decimal::parse(token).ok_or_else(|| {
            RecordError::in_block(
                block_no,
                line_no,
                format!("invalid {} coordinate {:?}", which, token),
            )
        })
    };
    Ok([coord(x)?, coord(y)?, coord(z)?])
}
