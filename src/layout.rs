//! 参数扫描的固定四维布局与索引换算
//!
//! 模拟编号按 control 值为主序、secondary 值为次序升序排列：
//! `sim = 20 * control_index + secondary_index`。

use serde::Serialize;

use crate::error::{Error, Result};

/// 不同 control 参数值（γ）的个数
pub const NUM_CONTROLS: usize = 30;
/// 每个 control 值对应的 secondary 参数值（温度）个数
pub const NUM_SECONDARIES: usize = 20;
/// 模拟总数 = 30 * 20
pub const NUM_SIMULATIONS: usize = NUM_CONTROLS * NUM_SECONDARIES;
/// 每组参数重复运行次数
pub const NUM_RUNS: usize = 3;
/// 每次运行保留的时间步数
pub const NUM_TIMESTEPS: usize = 500;
/// 标量变量个数：MSD、Volume、RMSAngleDeficit、Asphericity
pub const NUM_VARIABLES: usize = 4;
/// 外壳网格顶点数
pub const NUM_VERTICES: usize = 72;
/// 每个快照展平后的坐标个数 (72 * 3)
pub const COORDS_PER_SHELL: usize = NUM_VERTICES * 3;

/// 原始模拟步数中每隔多少步取一个统计样本
pub const SAMPLE_STRIDE: usize = 4000;
/// 原始总步数
pub const RAW_STEPS: usize = 2_000_000;
/// 时间滑块最大值 = 499 * 4000
pub const MAX_RAW_TIME: usize = (NUM_TIMESTEPS - 1) * SAMPLE_STRIDE;
/// 外壳快照以统计步的两倍间隔存储（键 `T{2t}`）
pub const SNAPSHOT_STRIDE: usize = 2;

/// 合并数组 `Stats` 的形状与分块
pub const STATS_SHAPE: [usize; 4] = [NUM_SIMULATIONS, NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS];
pub const STATS_CHUNK: [usize; 4] = [1, NUM_VARIABLES, NUM_RUNS, NUM_TIMESTEPS];
/// 合并数组 `Points` 的形状与分块
pub const POINTS_SHAPE: [usize; 4] = [NUM_SIMULATIONS, NUM_TIMESTEPS, NUM_RUNS, COORDS_PER_SHELL];
pub const POINTS_CHUNK: [usize; 4] = [1, 50, NUM_RUNS, COORDS_PER_SHELL];

pub const STATS_DATASET: &str = "Stats";
pub const POINTS_DATASET: &str = "Points";

/// 合并数组中第二维的物理变量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variable {
    #[serde(rename = "MSD")]
    Msd = 0,
    Volume = 1,
    #[serde(rename = "rmsAngleDeficit")]
    RmsAngleDeficit = 2,
    Asphericity = 3,
}

impl Variable {
    /// 第二个时间序列图可选的变量
    pub const PLOTTABLE: [Variable; 3] = [
        Variable::Volume,
        Variable::RmsAngleDeficit,
        Variable::Asphericity,
    ];

    /// 在 `Stats` 数组第二维中的位置
    pub fn index(self) -> usize {
        self as usize
    }

    /// 原始 npz 文件中的序列键名，Asphericity 由点云计算而来，没有键名
    pub fn raw_key(self) -> Option<&'static str> {
        match self {
            Variable::Msd => Some("MSD"),
            Variable::Volume => Some("Volume"),
            Variable::RmsAngleDeficit => Some("RMSAngleDeficit"),
            Variable::Asphericity => None,
        }
    }

    /// 查看器与查询接口使用的名称
    pub fn plot_name(self) -> &'static str {
        match self {
            Variable::Msd => "MSD",
            Variable::Volume => "Volume",
            Variable::RmsAngleDeficit => "rmsAngleDeficit",
            Variable::Asphericity => "Asphericity",
        }
    }

    /// 按名称查找第二个图的变量，只接受固定的三个名称
    pub fn from_plot_name(name: &str) -> Result<Self> {
        Self::PLOTTABLE
            .into_iter()
            .find(|v| v.plot_name() == name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }
}

/// 由 (control, secondary) 索引计算模拟编号
pub fn simulation_index(control_index: usize, secondary_index: usize) -> Result<usize> {
    Error::check_index("control", control_index, NUM_CONTROLS)?;
    Error::check_index("secondary", secondary_index, NUM_SECONDARIES)?;
    Ok(NUM_SECONDARIES * control_index + secondary_index)
}

/// 原始时间步换算为时间索引（整数除法截断）
pub fn time_index(raw_time: usize) -> Result<usize> {
    Error::check_index("time", raw_time / SAMPLE_STRIDE, NUM_TIMESTEPS)
}

/// 第 `t` 个外壳时间步对应的原始快照键
pub fn snapshot_key(t: usize) -> String {
    format!("T{}/Points", SNAPSHOT_STRIDE * t)
}

/// x 轴：0, 4000, ..., 1996000
pub fn time_axis() -> Vec<usize> {
    (0..NUM_TIMESTEPS).map(|t| t * SAMPLE_STRIDE).collect()
}
