use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;
use crate::layout::{POINTS_CHUNK, POINTS_SHAPE, STATS_CHUNK, STATS_SHAPE};

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "外壳参数扫描数据服务",
        "endpoints": [
            "GET /schedule",
            "GET /stats?control=<i>&secondary=<j>&variable=<name>",
            "GET /shell?control=<i>&secondary=<j>&run=<r>&time=<t>",
            "GET /shell/points?control=<i>&secondary=<j>&run=<r>&time=<t>",
            "POST /viewer/sessions",
            "GET /viewer/sessions/{id}",
            "POST /viewer/sessions/{id}/control",
            "DELETE /viewer/sessions/{id}",
        ],
        "stats": { "shape": STATS_SHAPE, "chunk": STATS_CHUNK },
        "points": { "shape": POINTS_SHAPE, "chunk": POINTS_CHUNK },
        "parameter_pairs": data.schedule.len(),
        "sessions": data.sessions.len(),
    }))
}
