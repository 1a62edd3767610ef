use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 参数扫描表：升序的 control 值及其对应的 secondary 值列表
#[get("/schedule")]
pub async fn get_schedule(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.schedule.as_ref())
}
