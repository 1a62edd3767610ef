//! 把大量原始小文件重新打包为两个分块压缩的合并数组
//!
//! 两个任务都是固定的嵌套循环，按模拟编号逐行写出；一个模拟正好是首维上的一个分块行，
//! 因此内存中只保留当前模拟的数据。任务不可续跑，中途失败需要整体重跑。

use std::path::Path;
use std::time::Instant;

use ndarray::{Array3, ArrayView1, s};
use tracing::{debug, info};

use crate::chunked::{ArrayHeader, ChunkedArrayWriter};
use crate::error::{Error, Result};
use crate::extract::extract_run_stats;
use crate::layout::{
    COORDS_PER_SHELL, NUM_RUNS, NUM_SIMULATIONS, NUM_TIMESTEPS, NUM_VARIABLES, NUM_VERTICES,
    POINTS_CHUNK, POINTS_DATASET, STATS_CHUNK, STATS_DATASET, snapshot_key,
};
use crate::raw::{RawSource, RunArchive};

/// 合并统计数组 `Stats[sim, var, run, t]`
///
/// `simulations` 为首维长度，完整扫描为 [`NUM_SIMULATIONS`]。
pub fn aggregate_stats<S: RawSource>(
    source: &S,
    output: &Path,
    simulations: usize,
    level: u32,
) -> Result<ArrayHeader> {
    let started = Instant::now();
    let shape = [simulations, NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS];
    let mut writer = ChunkedArrayWriter::create(output, STATS_DATASET, shape, STATS_CHUNK, level)?;
    let mut slab = Array3::<f32>::zeros((NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS));

    for sim in 0..simulations {
        for run in 0..NUM_RUNS {
            // 文件名中的模拟编号从 1 开始
            let stats = extract_run_stats(source, run, sim + 1)?;
            slab.slice_mut(s![.., run, ..]).assign(&stats);
        }
        writer.write_row(slab.view())?;
        debug!("[统计聚合] 模拟 {}/{} 完成", sim + 1, simulations);
        if (sim + 1) % 50 == 0 {
            info!(
                "[统计聚合] 已完成 {}/{} 个模拟，耗时 {:.1}s",
                sim + 1,
                simulations,
                started.elapsed().as_secs_f64()
            );
        }
    }

    let header = writer.finish()?;
    info!(
        "[统计聚合] 写出 {}，shape {:?}，耗时 {:.1}s",
        output.display(),
        header.shape,
        started.elapsed().as_secs_f64()
    );
    Ok(header)
}

/// 合并外壳数组 `Points[sim, t, run, 0..216]`
pub fn aggregate_shells<S: RawSource>(
    source: &S,
    output: &Path,
    simulations: usize,
    level: u32,
) -> Result<ArrayHeader> {
    let started = Instant::now();
    let shape = [simulations, NUM_TIMESTEPS, NUM_RUNS, COORDS_PER_SHELL];
    let mut writer =
        ChunkedArrayWriter::create(output, POINTS_DATASET, shape, POINTS_CHUNK, level)?;
    let mut slab = Array3::<f32>::zeros((NUM_TIMESTEPS, NUM_RUNS, COORDS_PER_SHELL));

    for sim in 0..simulations {
        for run in 0..NUM_RUNS {
            let mut archive = source.open_shells(run, sim + 1)?;
            for t in 0..NUM_TIMESTEPS {
                let key = snapshot_key(t);
                let points = archive.points(&key)?;
                if points.len() != NUM_VERTICES {
                    return Err(Error::BadShape {
                        key,
                        expected: vec![NUM_VERTICES, 3],
                        actual: vec![points.len(), 3],
                    });
                }
                let flat = points.as_flattened();
                slab.slice_mut(s![t, run, ..])
                    .assign(&ArrayView1::from(flat));
            }
        }
        writer.write_row(slab.view())?;
        debug!("[外壳聚合] 模拟 {}/{} 完成", sim + 1, simulations);
        if (sim + 1) % 50 == 0 {
            info!(
                "[外壳聚合] 已完成 {}/{} 个模拟，耗时 {:.1}s",
                sim + 1,
                simulations,
                started.elapsed().as_secs_f64()
            );
        }
    }

    let header = writer.finish()?;
    info!(
        "[外壳聚合] 写出 {}，shape {:?}，耗时 {:.1}s",
        output.display(),
        header.shape,
        started.elapsed().as_secs_f64()
    );
    Ok(header)
}

/// 依次执行外壳聚合与统计聚合，覆盖完整的 600 个模拟
pub fn aggregate_all<S: RawSource>(
    source: &S,
    stats_output: &Path,
    points_output: &Path,
    level: u32,
) -> Result<(ArrayHeader, ArrayHeader)> {
    let points = aggregate_shells(source, points_output, NUM_SIMULATIONS, level)?;
    let stats = aggregate_stats(source, stats_output, NUM_SIMULATIONS, level)?;
    Ok((stats, points))
}
