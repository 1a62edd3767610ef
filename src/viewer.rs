//! 交互式查看器的状态机
//!
//! 五个控件：control 滑块、secondary 滑块、运行选择、时间滑块、第二个图的变量选择。
//! 每次控件变化同步地重新查询数据，只返回受影响的图的重绘内容。
//! 前端绘图库不在本 crate 内，这里只产出可直接绘制的数据。

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{
    MAX_RAW_TIME, NUM_CONTROLS, NUM_RUNS, NUM_SECONDARIES, RAW_STEPS, SAMPLE_STRIDE, Variable,
    time_axis,
};
use crate::query::{ShellMeshJson, SweepQuery};
use crate::schedule::Schedule;

/// 坐标轴的标签与固定 y 范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisSpec {
    pub label: &'static str,
    pub y_min: f32,
    pub y_max: f32,
}

/// MSD 图的坐标轴
pub const MSD_AXIS: AxisSpec = AxisSpec {
    label: "MSD",
    y_min: 0.0,
    y_max: 5.0,
};

/// 第二个图随所选变量切换的坐标轴
pub fn axis_for(variable: Variable) -> AxisSpec {
    match variable {
        Variable::Asphericity => AxisSpec {
            label: "Asphericity",
            y_min: 0.0,
            y_max: 0.05,
        },
        Variable::RmsAngleDeficit => AxisSpec {
            label: "rms Angle Deficit",
            y_min: 0.0,
            y_max: 1.2,
        },
        Variable::Volume => AxisSpec {
            label: "Volume",
            y_min: 20.0,
            y_max: 47.0,
        },
        Variable::Msd => MSD_AXIS,
    }
}

/// 图标题，显示当前 γ 与 1/β
pub fn title(control_value: f64, secondary_value: f64) -> String {
    format!("γ = {:8.3}, 1/β = {:6.4}", control_value, secondary_value)
}

/// 当前控件取值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Controls {
    pub control: usize,
    pub secondary: usize,
    pub run: usize,
    /// 原始时间步，0..=1996000，步长 4000
    pub time: usize,
    pub variable: Variable,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            control: 0,
            secondary: 0,
            run: 0,
            time: MAX_RAW_TIME,
            variable: Variable::Volume,
        }
    }
}

/// 单个控件的变化
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum ControlChange {
    Control(usize),
    Secondary(usize),
    Run(usize),
    Time(usize),
    /// 变量名：Volume / rmsAngleDeficit / Asphericity
    Variable(String),
}

/// 两个时间序列图的曲线数据与标题
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curves {
    pub title: String,
    /// 每次运行一条 MSD 曲线
    pub msd: Vec<Vec<f32>>,
    /// 每次运行一条所选变量的曲线
    pub second: Vec<Vec<f32>>,
}

/// 一次控件变化后需要重绘的部分，`None` 表示该图不变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redraw {
    pub controls: Controls,
    pub curves: Option<Curves>,
    pub second_axis: Option<AxisSpec>,
    pub mesh: Option<ShellMeshJson>,
}

/// 完整的初始图
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub controls: Controls,
    /// 两个时间序列图共享的 x 轴
    pub time_axis: Vec<usize>,
    pub x_range: (usize, usize),
    pub msd_axis: AxisSpec,
    pub second_axis: AxisSpec,
    pub curves: Curves,
    pub mesh: ShellMeshJson,
}

/// 查看器状态
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    controls: Controls,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    /// 按当前控件生成完整的图
    pub fn figure(&self, query: &dyn SweepQuery, schedule: &Schedule) -> Result<Figure> {
        let controls = self.controls;
        Ok(Figure {
            controls,
            time_axis: time_axis(),
            x_range: (0, RAW_STEPS),
            msd_axis: MSD_AXIS,
            second_axis: axis_for(controls.variable),
            curves: curves(&controls, query, schedule)?,
            mesh: mesh(&controls, query)?,
        })
    }

    /// 应用一次控件变化
    ///
    /// 新值越界或查询失败时状态保持不变。
    pub fn apply(
        &mut self,
        change: ControlChange,
        query: &dyn SweepQuery,
        schedule: &Schedule,
    ) -> Result<Redraw> {
        let mut next = self.controls;
        let redraw = match change {
            ControlChange::Control(value) => {
                next.control = Error::check_index("control", value, NUM_CONTROLS)?;
                Redraw {
                    controls: next,
                    curves: Some(curves(&next, query, schedule)?),
                    second_axis: None,
                    mesh: Some(mesh(&next, query)?),
                }
            }
            ControlChange::Secondary(value) => {
                next.secondary = Error::check_index("secondary", value, NUM_SECONDARIES)?;
                Redraw {
                    controls: next,
                    curves: Some(curves(&next, query, schedule)?),
                    second_axis: None,
                    mesh: Some(mesh(&next, query)?),
                }
            }
            ControlChange::Run(value) => {
                next.run = Error::check_index("run", value, NUM_RUNS)?;
                Redraw {
                    controls: next,
                    curves: None,
                    second_axis: None,
                    mesh: Some(mesh(&next, query)?),
                }
            }
            ControlChange::Time(value) => {
                next.time = check_time(value)?;
                Redraw {
                    controls: next,
                    curves: None,
                    second_axis: None,
                    mesh: Some(mesh(&next, query)?),
                }
            }
            ControlChange::Variable(name) => {
                next.variable = Variable::from_plot_name(&name)?;
                Redraw {
                    controls: next,
                    curves: Some(curves(&next, query, schedule)?),
                    second_axis: Some(axis_for(next.variable)),
                    mesh: None,
                }
            }
        };
        self.controls = next;
        Ok(redraw)
    }
}

/// 时间滑块只取 4000 的整数倍
fn check_time(value: usize) -> Result<usize> {
    if value > MAX_RAW_TIME || value % SAMPLE_STRIDE != 0 {
        return Err(Error::IndexOutOfRange {
            axis: "time",
            index: value,
            len: MAX_RAW_TIME + 1,
        });
    }
    Ok(value)
}

fn curves(controls: &Controls, query: &dyn SweepQuery, schedule: &Schedule) -> Result<Curves> {
    let (control_value, secondary_value) = schedule.pair(controls.control, controls.secondary)?;
    let slice = query.stats(controls.control, controls.secondary, controls.variable)?;
    let rows = |a: &ndarray::Array2<f32>| a.outer_iter().map(|r| r.to_vec()).collect();
    Ok(Curves {
        title: title(control_value, secondary_value),
        msd: rows(&slice.msd),
        second: rows(&slice.variable),
    })
}

fn mesh(controls: &Controls, query: &dyn SweepQuery) -> Result<ShellMeshJson> {
    let mesh = query.shell(
        controls.control,
        controls.secondary,
        controls.run,
        controls.time,
    )?;
    Ok(ShellMeshJson::from(&mesh))
}
