use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{DemError, Result};
use crate::model::{Tile, TileKind};

// 展開ディレクトリから見つかったタイルファイル（種別ごと、パス順）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileFiles {
    pub masspoint: Vec<Tile>,
    pub hard_breakline: Vec<Tile>,
    pub soft_breakline: Vec<Tile>,
}

impl TileFiles {
    pub fn get(&self, kind: TileKind) -> &[Tile] {
        match kind {
            TileKind::Masspoint => &self.masspoint,
            TileKind::HardBreakline => &self.hard_breakline,
            TileKind::SoftBreakline => &self.soft_breakline,
        }
    }

    fn get_mut(&mut self, kind: TileKind) -> &mut Vec<Tile> {
        match kind {
            TileKind::Masspoint => &mut self.masspoint,
            TileKind::HardBreakline => &mut self.hard_breakline,
            TileKind::SoftBreakline => &mut self.soft_breakline,
        }
    }

    pub fn len(&self) -> usize {
        self.masspoint.len() + self.hard_breakline.len() + self.soft_breakline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// .gnp/.ghl/.gsl を再帰的に収集する（絶対パス、種別ごとにパス順）
pub fn discover_tiles(root: &Path) -> Result<TileFiles> {
    if !root.is_dir() {
        return Err(DemError::Discovery {
            path: root.to_path_buf(),
            reason: "directory does not exist".to_string(),
        });
    }
    let root = root.canonicalize().map_err(|e| DemError::Discovery {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut files = TileFiles::default();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|e| DemError::Discovery {
            path: root.clone(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        match Tile::from_path(entry.path()) {
            Some(tile) => {
                debug!("Found {} tile: {:?}", tile.kind, tile.path);
                files.get_mut(tile.kind).push(tile);
            }
            None => debug!("Ignoring {:?}", entry.path()),
        }
    }

    for kind in TileKind::ALL {
        files.get_mut(kind).sort_by(|a, b| a.path.cmp(&b.path));
    }

    info!(
        "Found {} tiles ({} masspoint, {} hard breakline, {} soft breakline)",
        files.len(),
        files.masspoint.len(),
        files.hard_breakline.len(),
        files.soft_breakline.len()
    );

    Ok(files)
}
