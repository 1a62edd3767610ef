use actix_web::{HttpResponse, Responder, delete, get, post, web};
use tracing::info;

use crate::app_state::AppState;
use crate::handlers::{blocking, error_response};
use crate::session::ViewerSession;
use crate::viewer::{ControlChange, Viewer};

/// 创建查看器会话，返回会话 id 和按初始控件生成的完整图
#[post("/viewer/sessions")]
pub async fn create_session(data: web::Data<AppState>) -> impl Responder {
    let viewer = Viewer::new();
    let initial = viewer.clone();
    let (sweep, schedule) = (data.query.clone(), data.schedule.clone());
    let figure = match blocking(move || initial.figure(sweep.as_ref(), &schedule)).await {
        Ok(figure) => figure,
        Err(err) => return error_response("生成初始图失败", &err),
    };
    let (session_id, _) = data.sessions.insert(ViewerSession::new(viewer));
    info!(
        "[查看器] 创建会话 {}，当前共 {} 个会话",
        session_id,
        data.sessions.len()
    );
    HttpResponse::Ok().json(serde_json::json!({
        "session_id": session_id,
        "figure": figure,
    }))
}

fn unknown_session(session_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "无效的会话 id",
        "session_id": session_id,
    }))
}

/// 当前控件取值
#[get("/viewer/sessions/{id}")]
pub async fn get_session(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();
    let Some(session) = data.sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };
    let controls = session.viewer.lock().controls();
    HttpResponse::Ok().json(serde_json::json!({
        "session_id": session_id,
        "controls": controls,
    }))
}

/// 应用一次控件变化，只返回受影响的图
/// 请求体例如: {"control": "time", "value": 996000}
#[post("/viewer/sessions/{id}/control")]
pub async fn apply_control(
    data: web::Data<AppState>,
    path: web::Path<String>,
    change: web::Json<ControlChange>,
) -> impl Responder {
    let session_id = path.into_inner();
    let Some(session) = data.sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };

    // 锁内完成整个重绘，同一会话的变化不会交错
    let (sweep, schedule) = (data.query.clone(), data.schedule.clone());
    let change = change.into_inner();
    let result = blocking(move || {
        session
            .viewer
            .lock()
            .apply(change, sweep.as_ref(), &schedule)
    })
    .await;
    match result {
        Ok(redraw) => HttpResponse::Ok().json(redraw),
        Err(err) => error_response("控件变化无效", &err),
    }
}

#[delete("/viewer/sessions/{id}")]
pub async fn delete_session(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();
    if data.sessions.remove(&session_id) {
        HttpResponse::NoContent().finish()
    } else {
        unknown_session(&session_id)
    }
}
