//! 从内存原始数据聚合到合并数组，再经查询层读回

mod common;

use std::sync::Arc;

use shell_sweep_backend::aggregate::{aggregate_shells, aggregate_stats};
use shell_sweep_backend::chunked::ChunkedArrayReader;
use shell_sweep_backend::error::Error;
use shell_sweep_backend::layout::{
    NUM_CONTROLS, NUM_RUNS, NUM_SECONDARIES, NUM_SIMULATIONS, NUM_TIMESTEPS, NUM_VERTICES,
    POINTS_DATASET, SAMPLE_STRIDE, STATS_DATASET, snapshot_key, simulation_index,
};
use shell_sweep_backend::query::SweepArchive;
use shell_sweep_backend::raw::{MemoryArchive, MemorySource};

use common::{shell_radius, sphere_points, stat_value, write_points, write_stats};

const SIMULATIONS: usize = 2;

/// 原始序列：只有每隔 4000 个的样本有意义，其余位置填充无关值
fn raw_series(sim: usize, var: usize, run: usize) -> Arc<Vec<f32>> {
    let len = (NUM_TIMESTEPS - 1) * SAMPLE_STRIDE + 1;
    Arc::new(
        (0..len)
            .map(|i| {
                if i % SAMPLE_STRIDE == 0 {
                    stat_value(sim, var, run, i / SAMPLE_STRIDE)
                } else {
                    -1.0
                }
            })
            .collect(),
    )
}

fn memory_source() -> MemorySource {
    let mut source = MemorySource::new();
    for sim in 0..SIMULATIONS {
        for run in 0..NUM_RUNS {
            let sim_id = sim + 1;
            let stats = MemoryArchive::new(format!("Run{}/DetailedOutput-{}", run, sim_id))
                .with_series("MSD", raw_series(sim, 0, run))
                .with_series("Volume", raw_series(sim, 1, run))
                .with_series("RMSAngleDeficit", raw_series(sim, 2, run));
            source.insert_stats(run, sim_id, stats);

            // 原始文件中保存 1000 个快照，聚合只取偶数编号
            let mut shells = MemoryArchive::new(format!("Run{}/VTKFile-{}", run, sim_id));
            for t in 0..NUM_TIMESTEPS {
                shells = shells
                    .with_points(&snapshot_key(t), sphere_points(shell_radius(sim, run, t)))
                    .with_points(&format!("T{}/Points", 2 * t + 1), sphere_points(100.0));
            }
            source.insert_shells(run, sim_id, shells);
        }
    }
    source
}

#[test]
fn aggregated_files_answer_queries() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("StatsFile.arr");
    let points_path = dir.path().join("VTKFile.arr");
    let source = memory_source();

    let points_header = aggregate_shells(&source, &points_path, SIMULATIONS, 9).unwrap();
    assert_eq!(points_header.chunk, [1, 50, 3, 216]);
    let stats_header = aggregate_stats(&source, &stats_path, SIMULATIONS, 9).unwrap();
    assert_eq!(stats_header.shape, [SIMULATIONS, 4, 3, 500]);
    assert_eq!(stats_header.chunk, [1, 4, 3, 500]);

    let archive = SweepArchive::open(&stats_path, &points_path).unwrap();

    let slice = archive.stats_query(0, 1, "rmsAngleDeficit").unwrap();
    assert_eq!(slice.msd.shape(), &[3, 500]);
    assert_eq!(slice.variable.shape(), &[3, 500]);
    for run in 0..NUM_RUNS {
        for t in [0, 1, 250, 499] {
            assert_eq!(slice.msd[[run, t]], stat_value(1, 0, run, t));
            assert_eq!(slice.variable[[run, t]], stat_value(1, 2, run, t));
        }
    }

    // 均匀半径的外壳（坐标经 f32 舍入），非球度只剩舍入误差
    let asphericity = archive.stats_query(0, 0, "Asphericity").unwrap();
    assert!(asphericity.variable.iter().all(|&v| v.abs() < 1e-9));

    let mesh = archive.shell_query(0, 1, 2, 1_996_000).unwrap();
    assert_eq!(mesh.points.shape(), &[NUM_VERTICES, 3]);
    let expected = sphere_points(shell_radius(1, 2, 499));
    assert_eq!(mesh.points[[0, 0]], expected[0][0]);
    assert_eq!(mesh.points[[71, 2]], expected[71][2]);
    assert!(!mesh.triangles.is_empty());
    assert!(mesh.triangles.iter().flatten().all(|&v| v < NUM_VERTICES));

    // 非 4000 整数倍的时间向下截断
    let truncated = archive.shell_query(0, 0, 0, 7999).unwrap();
    let expected = sphere_points(shell_radius(0, 0, 1));
    assert_eq!(truncated.points[[3, 1]], expected[3][1]);
    let first = archive.shell_query(0, 0, 0, 0).unwrap();
    assert_eq!(first.points[[3, 1]], sphere_points(shell_radius(0, 0, 0))[3][1]);
}

#[test]
fn missing_raw_file_aborts_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::new();
    let err = aggregate_stats(&source, &dir.path().join("stats.arr"), 1, 1).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn missing_snapshot_key_aborts_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemorySource::new();
    for run in 0..NUM_RUNS {
        source.insert_shells(run, 1, MemoryArchive::new("empty"));
    }
    let err = aggregate_shells(&source, &dir.path().join("points.arr"), 1, 1).unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref key, .. } if key == "T0/Points"));
}

#[test]
fn synthetic_stats_round_trip_for_every_index() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("StatsFile.arr");
    let points_path = dir.path().join("VTKFile.arr");
    write_stats(&stats_path, NUM_SIMULATIONS);
    write_points(&points_path, 1);

    let archive = SweepArchive::open(&stats_path, &points_path).unwrap();
    for control in 0..NUM_CONTROLS {
        for secondary in 0..NUM_SECONDARIES {
            let sim = simulation_index(control, secondary).unwrap();
            let slice = archive.stats_query(control, secondary, "Volume").unwrap();
            assert_eq!(slice.msd.shape(), &[NUM_RUNS, NUM_TIMESTEPS]);
            assert_eq!(slice.msd[[2, 499]], stat_value(sim, 0, 2, 499));
            assert_eq!(slice.variable[[0, 17]], stat_value(sim, 1, 0, 17));
        }
    }

    let reader = ChunkedArrayReader::open(&stats_path, STATS_DATASET).unwrap();
    let all = reader.read_all().unwrap();
    let slice = archive.stats_query(13, 7, "Volume").unwrap();
    let sim = simulation_index(13, 7).unwrap();
    assert_eq!(
        slice.msd,
        all.slice(ndarray::s![sim, 0, .., ..]).to_owned()
    );
}

#[test]
fn query_errors() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("StatsFile.arr");
    let points_path = dir.path().join("VTKFile.arr");
    write_stats(&stats_path, 1);
    write_points(&points_path, 1);
    let archive = SweepArchive::open(&stats_path, &points_path).unwrap();

    assert!(matches!(
        archive.stats_query(0, 0, "Temperature"),
        Err(Error::UnknownVariable(_))
    ));
    assert!(matches!(
        archive.stats_query(30, 0, "Volume"),
        Err(Error::IndexOutOfRange { .. })
    ));
    // 文件中只有 1 个模拟
    assert!(archive.stats_query(0, 1, "Volume").is_err());
    assert!(archive.shell_query(0, 0, 3, 0).is_err());
    assert!(archive.shell_query(0, 0, 0, 2_000_000).is_err());

    // 两个文件交换后数据集名称不匹配
    assert!(matches!(
        SweepArchive::open(&points_path, &stats_path),
        Err(Error::MissingKey { .. })
    ));
    assert!(ChunkedArrayReader::open(&points_path, POINTS_DATASET).is_ok());
}
