//! 合并数组的查询层：索引换算、切片与外壳网格构造

use std::path::Path;

use ndarray::{Array2, Axis};
use parry3d::math::{Point, Real};
use parry3d::transformation::try_convex_hull;
use serde::Serialize;

use crate::chunked::ChunkedArrayReader;
use crate::error::{Error, Result};
use crate::layout::{
    COORDS_PER_SHELL, NUM_RUNS, NUM_TIMESTEPS, NUM_VARIABLES, NUM_VERTICES, POINTS_DATASET,
    STATS_DATASET, Variable, simulation_index, time_index,
};

/// 一个模拟的 MSD 与所选变量，均为 (3 次运行, 500 个时间步)
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSlice {
    pub msd: Array2<f32>,
    pub variable: Array2<f32>,
}

/// 外壳快照：原始坐标 (72, 3) 与三角面片连接关系
#[derive(Debug, Clone, PartialEq)]
pub struct ShellMesh {
    pub points: Array2<f32>,
    pub triangles: Vec<[usize; 3]>,
}

/// JSON 响应使用的嵌套数组形式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellMeshJson {
    pub points: Vec<[f32; 3]>,
    pub triangles: Vec<[usize; 3]>,
}

impl From<&ShellMesh> for ShellMeshJson {
    fn from(mesh: &ShellMesh) -> Self {
        Self {
            points: mesh
                .points
                .outer_iter()
                .map(|p| [p[0], p[1], p[2]])
                .collect(),
            triangles: mesh.triangles.clone(),
        }
    }
}

/// 查看器依赖的查询接口
pub trait SweepQuery: Send + Sync {
    fn stats(
        &self,
        control_index: usize,
        secondary_index: usize,
        variable: Variable,
    ) -> Result<StatsSlice>;

    fn shell(
        &self,
        control_index: usize,
        secondary_index: usize,
        run: usize,
        raw_time: usize,
    ) -> Result<ShellMesh>;
}

/// 打开的两个合并数组文件（只读）
#[derive(Debug, Clone)]
pub struct SweepArchive {
    stats: ChunkedArrayReader,
    points: ChunkedArrayReader,
}

impl SweepArchive {
    pub fn open(stats_path: impl AsRef<Path>, points_path: impl AsRef<Path>) -> Result<Self> {
        let stats = ChunkedArrayReader::open(stats_path, STATS_DATASET)?;
        let points = ChunkedArrayReader::open(points_path, POINTS_DATASET)?;
        Ok(Self { stats, points })
    }

    pub fn stats_reader(&self) -> &ChunkedArrayReader {
        &self.stats
    }

    pub fn points_reader(&self) -> &ChunkedArrayReader {
        &self.points
    }

    /// 按变量名查询，名称须为 Volume / rmsAngleDeficit / Asphericity
    pub fn stats_query(
        &self,
        control_index: usize,
        secondary_index: usize,
        variable_name: &str,
    ) -> Result<StatsSlice> {
        let variable = Variable::from_plot_name(variable_name)?;
        self.stats(control_index, secondary_index, variable)
    }

    pub fn shell_query(
        &self,
        control_index: usize,
        secondary_index: usize,
        run: usize,
        raw_time: usize,
    ) -> Result<ShellMesh> {
        self.shell(control_index, secondary_index, run, raw_time)
    }
}

impl SweepQuery for SweepArchive {
    fn stats(
        &self,
        control_index: usize,
        secondary_index: usize,
        variable: Variable,
    ) -> Result<StatsSlice> {
        let sim = simulation_index(control_index, secondary_index)?;
        // 一个模拟的全部变量正好是一个分块
        let block = self
            .stats
            .read_block([sim, 0, 0, 0], [1, NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS])?;
        let block = block.index_axis(Axis(0), 0);
        Ok(StatsSlice {
            msd: block.index_axis(Axis(0), Variable::Msd.index()).to_owned(),
            variable: block.index_axis(Axis(0), variable.index()).to_owned(),
        })
    }

    fn shell(
        &self,
        control_index: usize,
        secondary_index: usize,
        run: usize,
        raw_time: usize,
    ) -> Result<ShellMesh> {
        let sim = simulation_index(control_index, secondary_index)?;
        let run = Error::check_index("run", run, NUM_RUNS)?;
        let t = time_index(raw_time)?;
        debug_assert!(t < NUM_TIMESTEPS);

        let block = self
            .points
            .read_block([sim, t, run, 0], [1, 1, 1, COORDS_PER_SHELL])?;
        let flat: Vec<f32> = block.iter().copied().collect();
        let points = Array2::from_shape_vec((NUM_VERTICES, 3), flat)
            .map_err(|e| Error::container(self.points.path(), e.to_string()))?;
        let triangles = triangulate(&points)?;
        Ok(ShellMesh { points, triangles })
    }
}

/// 把每个点投影到单位球面后求凸包，返回指向原始点的三角面片
///
/// 假设外壳关于原点是星形的，此时球面投影的凸包也是原外壳的有效三角剖分。
/// 这是近似，没有对结果网格做几何校验。
pub fn triangulate(points: &Array2<f32>) -> Result<Vec<[usize; 3]>> {
    let mut sphere: Vec<Point<Real>> = Vec::with_capacity(points.nrows());
    for (i, p) in points.outer_iter().enumerate() {
        let v = Point::new(p[0], p[1], p[2]).coords;
        let r = v.norm();
        if !(r > 0.0 && r.is_finite()) {
            return Err(Error::Hull(format!("第 {} 个顶点半径无效: {}", i, r)));
        }
        sphere.push(Point::from(v / r));
    }

    let (hull_vertices, hull_faces) =
        try_convex_hull(&sphere).map_err(|e| Error::Hull(format!("{:?}", e)))?;

    // 凸包顶点是输入点的副本，映射回输入索引
    let input_index: Vec<usize> = hull_vertices
        .iter()
        .map(|hv| {
            sphere
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let da = (*a - hv).norm_squared();
                    let db = (*b - hv).norm_squared();
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
        .collect();

    Ok(hull_faces
        .iter()
        .map(|face| face.map(|v| input_index[v as usize]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 球面上的 72 个点，半径随方向变化
    fn bumpy_shell() -> Array2<f32> {
        let mut flat = Vec::with_capacity(NUM_VERTICES * 3);
        let golden = std::f32::consts::PI * (3.0 - 5f32.sqrt());
        for i in 0..NUM_VERTICES {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / NUM_VERTICES as f32;
            let ring = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            let r = 2.0 + 0.1 * (3.0 * theta).sin();
            flat.extend([r * ring * theta.cos(), r * y, r * ring * theta.sin()]);
        }
        Array2::from_shape_vec((NUM_VERTICES, 3), flat).unwrap()
    }

    #[test]
    fn triangles_reference_input_points() {
        let points = bumpy_shell();
        let triangles = triangulate(&points).unwrap();
        // 闭合三角网格: F = 2V - 4
        assert_eq!(triangles.len(), 2 * NUM_VERTICES - 4);
        assert!(triangles.iter().flatten().all(|&v| v < NUM_VERTICES));
        let mut used: Vec<usize> = triangles.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used.len(), NUM_VERTICES);
    }

    #[test]
    fn zero_radius_point_is_rejected() {
        let mut points = bumpy_shell();
        points.row_mut(5).fill(0.0);
        assert!(matches!(triangulate(&points), Err(Error::Hull(_))));
    }
}
