pub mod health;
pub mod schedule;
pub mod shell;
pub mod stats;
pub mod viewer;

pub use health::hello;
pub use schedule::get_schedule;
pub use shell::{get_shell, get_shell_points};
pub use stats::get_stats;
pub use viewer::{apply_control, create_session, delete_session, get_session};

use actix_web::{HttpResponse, web};
use tracing::warn;

use crate::error::{Error, Result};

/// 在阻塞线程池中执行查询，分块的读取和解压不占用 worker 线程
pub(crate) async fn blocking<F, T>(query: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(query)
        .await
        .map_err(|e| Error::Blocking(e.to_string()))?
}

/// 把查询错误转换为带 JSON 说明的 HTTP 响应
pub(crate) fn error_response(error: &str, err: &Error) -> HttpResponse {
    warn!("{}: {}", error, err);
    let body = serde_json::json!({
        "error": error,
        "details": err.to_string(),
    });
    match err {
        Error::IndexOutOfRange { .. } | Error::UnknownVariable(_) => {
            HttpResponse::BadRequest().json(body)
        }
        Error::MissingKey { .. } => HttpResponse::NotFound().json(body),
        Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            HttpResponse::NotFound().json(body)
        }
        _ => HttpResponse::InternalServerError().json(body),
    }
}
