use crate::model::{LineType, PointType};

// 元のIDはタイル内でのみ一意なので、エリア名を前置して全体で一意にする
// エリア名（72e01neなど）には区切り文字が含まれない前提でそのまま使う
pub fn masspoint_point_id(area_name: &str, original_point_id: &str) -> String {
    format!("{}_{}", area_name, original_point_id)
}

pub fn breakline_line_id(
    area_name: &str,
    line_type: LineType,
    original_line_id: &str,
) -> String {
    format!("{}_{}_{}", area_name, line_type.as_str(), original_line_id)
}

pub fn breakline_point_id(line_id: &str, point_type: PointType) -> String {
    format!("{}_{}", line_id, point_type.as_str())
}
