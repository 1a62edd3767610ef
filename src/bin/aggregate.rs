//! 一次性聚合任务：先合并外壳快照，再合并统计序列。没有命令行参数。

use std::time::Instant;

use tracing::{error, info};

use shell_sweep_backend::aggregate::aggregate_all;
use shell_sweep_backend::config::Config;
use shell_sweep_backend::raw::NpzSource;

fn main() {
    shell_sweep_backend::init_tracing();

    if let Err(err) = run() {
        error!("聚合失败，需要整体重跑: {}", err);
        std::process::exit(1);
    }
}

fn run() -> shell_sweep_backend::Result<()> {
    let config = Config::load()?;
    let data = &config.data;
    let source = NpzSource::new(&data.raw_dir);
    info!(
        "原始数据目录 {}，输出 {} 与 {}",
        data.raw_dir.display(),
        data.stats_file.display(),
        data.points_file.display()
    );

    let started = Instant::now();
    aggregate_all(
        &source,
        &data.stats_file,
        &data.points_file,
        config.aggregate.compression_level,
    )?;
    info!("聚合完成，总耗时 {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}
