use ndarray::Array2;

use crate::error::{Error, Result};
use crate::layout::{NUM_TIMESTEPS, NUM_VARIABLES, SAMPLE_STRIDE, Variable, snapshot_key};
use crate::raw::{RawSource, RunArchive};

/// 每隔 4000 步取一个样本，共 500 个
pub fn sample_series(key: &str, raw: &[f32]) -> Result<Vec<f32>> {
    let required = (NUM_TIMESTEPS - 1) * SAMPLE_STRIDE + 1;
    if raw.len() < required {
        return Err(Error::ShortSeries {
            key: key.to_string(),
            len: raw.len(),
            required,
        });
    }
    Ok(raw
        .iter()
        .step_by(SAMPLE_STRIDE)
        .take(NUM_TIMESTEPS)
        .copied()
        .collect())
}

/// 点云半径相对其均值的归一化方差：`mean((R - R0)^2) / R0^2`
///
/// 均值按递推方式累加，所有半径相同时 R0 与之完全相等，结果严格为 0。
pub fn asphericity(points: &[[f32; 3]]) -> f64 {
    let radii: Vec<f64> = points
        .iter()
        .map(|p| {
            let [x, y, z] = p.map(f64::from);
            (x * x + y * y + z * z).sqrt()
        })
        .collect();
    if radii.is_empty() {
        return 0.0;
    }

    let mut r0 = 0.0;
    for (k, r) in radii.iter().enumerate() {
        r0 += (r - r0) / (k + 1) as f64;
    }
    let variance = radii.iter().map(|r| (r - r0).powi(2)).sum::<f64>() / radii.len() as f64;
    variance / (r0 * r0)
}

/// 读取一次运行的四个时间序列，返回形状 (4, 500) 的数组，行序与 [`Variable`] 一致
///
/// `sim_id` 为文件名使用的 1 起始编号。两个原始文件依次打开，读完即关闭。
pub fn extract_run_stats<S: RawSource>(
    source: &S,
    run: usize,
    sim_id: usize,
) -> Result<Array2<f32>> {
    let mut stats = Array2::<f32>::zeros((NUM_VARIABLES, NUM_TIMESTEPS));

    {
        let mut archive = source.open_stats(run, sim_id)?;
        for variable in [Variable::Msd, Variable::Volume, Variable::RmsAngleDeficit] {
            let Some(key) = variable.raw_key() else {
                continue;
            };
            let sampled = sample_series(key, &archive.series(key)?)?;
            stats
                .row_mut(variable.index())
                .assign(&ndarray::ArrayView1::from(&sampled[..]));
        }
    }

    let mut archive = source.open_shells(run, sim_id)?;
    let mut row = stats.row_mut(Variable::Asphericity.index());
    for t in 0..NUM_TIMESTEPS {
        let points = archive.points(&snapshot_key(t))?;
        row[t] = asphericity(&points) as f32;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sphere_has_zero_asphericity() {
        let r = 1.7f32;
        let points: Vec<[f32; 3]> = (0..72)
            .map(|i| match i % 6 {
                0 => [r, 0.0, 0.0],
                1 => [-r, 0.0, 0.0],
                2 => [0.0, r, 0.0],
                3 => [0.0, -r, 0.0],
                4 => [0.0, 0.0, r],
                _ => [0.0, 0.0, -r],
            })
            .collect();
        assert_eq!(asphericity(&points), 0.0);
    }

    #[test]
    fn asphericity_of_two_radii() {
        // R = {1, 3}: R0 = 2, mean((R-R0)^2) = 1, / 4
        let points = [[1.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
        assert!((asphericity(&points) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn sampling_takes_every_4000th() {
        let raw: Vec<f32> = (0..2_000_000).map(|v| v as f32).collect();
        let sampled = sample_series("MSD", &raw).unwrap();
        assert_eq!(sampled.len(), NUM_TIMESTEPS);
        assert_eq!(sampled[0], 0.0);
        assert_eq!(sampled[1], 4000.0);
        assert_eq!(sampled[499], 1_996_000.0);
    }

    #[test]
    fn short_series_is_rejected() {
        let raw = vec![0.0; 1_996_000];
        assert!(matches!(
            sample_series("Volume", &raw),
            Err(Error::ShortSeries { required: 1_996_001, .. })
        ));
    }
}
