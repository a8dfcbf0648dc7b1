pub mod classifier;
pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod writer;
pub mod zip_handler;

pub use classifier::{discover_tiles, TileFiles};
pub use config::ConvertConfig;
pub use error::{DemError, RecordError, Result};
pub use model::{BreaklineRecord, MasspointRecord, Tile, TileKind};
pub use pipeline::{ConversionReport, Converter};
pub use writer::{CsvMergeWriter, MergeStats};
pub use zip_handler::{ExtractSummary, ZipHandler};
