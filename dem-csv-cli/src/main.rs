use anyhow::{Context, Result};
use clap::Parser;
use dem_csv::config::DEFAULT_OUTPUT_DIR;
use dem_csv::{ConvertConfig, Converter, TileKind};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 入力のオーダーZIPファイル（タイルごとのZIPを含む）
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// 出力ディレクトリ
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// 並列処理スレッド数（デフォルト: CPUコア数）
    #[arg(short, long)]
    threads: Option<usize>,

    /// 展開用の作業ディレクトリ（指定時は処理後も残す）
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// point_idの重複があればエラーにする
    #[arg(long)]
    strict_keys: bool,
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    // CLI引数の解析
    let args = Args::parse();

    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    // スレッドプールの設定
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    let mut config = ConvertConfig::new(&args.archive)
        .output_dir(&args.output)
        .fail_on_duplicate_keys(args.strict_keys);
    if let Some(work_dir) = &args.work_dir {
        config = config.work_dir(work_dir);
    }

    info!("Processing order archive: {:?}", args.archive);
    let report = match Converter::new(config).run() {
        Ok(report) => report,
        Err(e) => {
            error!("Conversion failed: {}", e);
            return Err(e).with_context(|| format!("Failed to convert {:?}", args.archive));
        }
    };

    info!(
        "Extracted {} archives ({} files)",
        report.extract.archives, report.extract.files
    );
    for kind in TileKind::ALL {
        let stats = report.get(kind);
        info!(
            "{}: {} rows ({} duplicate keys)",
            args.output.join(kind.output_file_name()).display(),
            stats.rows,
            stats.duplicate_keys
        );
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}
