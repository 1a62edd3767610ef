use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing::info;

use shell_sweep_backend::app_state::AppState;
use shell_sweep_backend::config::Config;
use shell_sweep_backend::query::SweepArchive;
use shell_sweep_backend::routes;
use shell_sweep_backend::schedule::Schedule;
use shell_sweep_backend::session::SessionStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    shell_sweep_backend::init_tracing();

    let config = Config::load().map_err(std::io::Error::other)?;
    let schedule = Schedule::from_path(&config.data.schedule).map_err(std::io::Error::other)?;
    let archive = SweepArchive::open(&config.data.stats_file, &config.data.points_file)
        .map_err(std::io::Error::other)?;

    info!(
        "参数表: {} 个 control 值，共 {} 组参数",
        schedule.controls().len(),
        schedule.len()
    );
    info!(
        "Stats: {} shape {:?}",
        archive.stats_reader().path().display(),
        archive.stats_reader().header().shape
    );
    info!(
        "Points: {} shape {:?}",
        archive.points_reader().path().display(),
        archive.points_reader().header().shape
    );

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.server.session_ttl_minutes * 60,
    )));
    let app_state = web::Data::new(AppState {
        query: Arc::new(archive),
        schedule: Arc::new(schedule),
        sessions: sessions.clone(),
    });

    // 后台定期清理过期的查看器会话
    let cleanup_store = sessions.clone();
    let cleanup_interval = Duration::from_secs(config.server.cleanup_interval_minutes.max(1) * 60);
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let cleaned = cleanup_store.cleanup_expired();
            if cleaned > 0 {
                info!(
                    "[清理任务] 清理了 {} 个过期会话，当前剩余: {} 个会话",
                    cleaned,
                    cleanup_store.len()
                );
            }
        }
    });

    let bind = (config.server.host.clone(), config.server.port);
    info!("服务器启动在 http://{}:{}", bind.0, bind.1);
    info!("会话 TTL: {} 分钟", sessions.ttl().as_secs() / 60);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
