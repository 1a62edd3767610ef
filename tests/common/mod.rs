#![allow(dead_code)]

use std::path::Path;

use ndarray::{Array3, s};

use shell_sweep_backend::chunked::ChunkedArrayWriter;
use shell_sweep_backend::layout::{
    COORDS_PER_SHELL, NUM_CONTROLS, NUM_RUNS, NUM_SECONDARIES, NUM_TIMESTEPS, NUM_VARIABLES,
    NUM_VERTICES, POINTS_CHUNK, POINTS_DATASET, STATS_CHUNK, STATS_DATASET,
};
use shell_sweep_backend::schedule::Schedule;

/// 均匀分布在球面上的 72 个点，半径为 `radius`
pub fn sphere_points(radius: f32) -> Vec<[f32; 3]> {
    let golden = std::f32::consts::PI * (3.0 - 5f32.sqrt());
    (0..NUM_VERTICES)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / NUM_VERTICES as f32;
            let ring = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            [
                radius * ring * theta.cos(),
                radius * y,
                radius * ring * theta.sin(),
            ]
        })
        .collect()
}

/// 每个 (sim, run, t) 不同的外壳半径
pub fn shell_radius(sim: usize, run: usize, t: usize) -> f32 {
    1.0 + sim as f32 + 0.25 * run as f32 + 0.001 * t as f32
}

/// 合成的统计值，编码了全部四个索引
pub fn stat_value(sim: usize, var: usize, run: usize, t: usize) -> f32 {
    (sim * 10_000 + var * 1000 + run * 500 + t) as f32 * 0.5
}

/// 30 x 20 的参数表，γ = 10 + c，1/β = 0.001 * (s + 1)
pub fn full_schedule_text() -> String {
    let mut text = String::from("gamma,temperature\n");
    for c in 0..NUM_CONTROLS {
        for s in 0..NUM_SECONDARIES {
            text.push_str(&format!("{},{}\n", 10.0 + c as f64, 0.001 * (s + 1) as f64));
        }
    }
    text
}

pub fn full_schedule() -> Schedule {
    Schedule::parse(&full_schedule_text()).unwrap()
}

/// 直接写出前 `simulations` 个模拟的合成 Stats 文件
pub fn write_stats(path: &Path, simulations: usize) {
    let shape = [simulations, NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS];
    let mut writer = ChunkedArrayWriter::create(path, STATS_DATASET, shape, STATS_CHUNK, 1).unwrap();
    for sim in 0..simulations {
        let slab = Array3::from_shape_fn((NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS), |(v, r, t)| {
            stat_value(sim, v, r, t)
        });
        writer.write_row(slab.view()).unwrap();
    }
    writer.finish().unwrap();
}

/// 直接写出前 `simulations` 个模拟的合成 Points 文件
pub fn write_points(path: &Path, simulations: usize) {
    let shape = [simulations, NUM_TIMESTEPS, NUM_RUNS, COORDS_PER_SHELL];
    let mut writer =
        ChunkedArrayWriter::create(path, POINTS_DATASET, shape, POINTS_CHUNK, 1).unwrap();
    for sim in 0..simulations {
        let mut slab = Array3::<f32>::zeros((NUM_TIMESTEPS, NUM_RUNS, COORDS_PER_SHELL));
        for t in 0..NUM_TIMESTEPS {
            for run in 0..NUM_RUNS {
                let flat: Vec<f32> = sphere_points(shell_radius(sim, run, t))
                    .into_iter()
                    .flatten()
                    .collect();
                slab.slice_mut(s![t, run, ..])
                    .assign(&ndarray::ArrayView1::from(&flat[..]));
            }
        }
        writer.write_row(slab.view()).unwrap();
    }
    writer.finish().unwrap();
}
