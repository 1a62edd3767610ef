use actix_web::web;

use crate::handlers;

/// 统一注册 HTTP 路由，方便集中管理
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::hello)
        .service(handlers::get_schedule)
        .service(handlers::get_stats)
        .service(handlers::get_shell)
        .service(handlers::get_shell_points)
        .service(handlers::create_session)
        .service(handlers::get_session)
        .service(handlers::apply_control)
        .service(handlers::delete_session);
}
