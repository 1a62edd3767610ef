use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::{blocking, error_response};
use crate::layout::{Variable, simulation_index};

#[derive(Deserialize)]
pub struct StatsQuery {
    pub control: usize,
    pub secondary: usize,
    /// 第二个图的变量名，默认 Volume
    pub variable: Option<String>,
}

/// 一个模拟三次运行的 MSD 与所选变量时间序列
/// 例如: /stats?control=3&secondary=7&variable=Asphericity
#[get("/stats")]
pub async fn get_stats(data: web::Data<AppState>, query: web::Query<StatsQuery>) -> impl Responder {
    let name = query.variable.clone().unwrap_or_else(|| "Volume".to_string());
    let (control, secondary) = (query.control, query.secondary);
    let sweep = data.query.clone();
    let variable_name = name.clone();
    let result = blocking(move || {
        let variable = Variable::from_plot_name(&variable_name)?;
        let sim = simulation_index(control, secondary)?;
        let slice = sweep.stats(control, secondary, variable)?;
        Ok((sim, slice))
    })
    .await;

    match result {
        Ok((sim, slice)) => {
            let rows = |a: &ndarray::Array2<f32>| -> Vec<Vec<f32>> {
                a.outer_iter().map(|r| r.to_vec()).collect()
            };
            HttpResponse::Ok().json(serde_json::json!({
                "control": query.control,
                "secondary": query.secondary,
                "simulation": sim,
                "variable": name,
                "msd": rows(&slice.msd),
                "values": rows(&slice.variable),
            }))
        }
        Err(err) => error_response("查询统计数据失败", &err),
    }
}
