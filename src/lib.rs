//! 外壳参数扫描数据的聚合、查询与查看器后端
//!
//! 数据单向流动：原始 npz 文件 → 聚合任务 → 两个分块压缩的合并数组
//! → 查询层 → 查看器。

pub mod aggregate;
pub mod app_state;
pub mod chunked;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod layout;
pub mod query;
pub mod raw;
pub mod routes;
pub mod schedule;
pub mod session;
pub mod viewer;

pub use error::{Error, Result};

/// 初始化 tracing 日志，`RUST_LOG` 可覆盖默认过滤规则
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shell_sweep_backend=info,actix_web=info"));
    // 测试中可能重复初始化，忽略错误
    let _ = fmt().with_env_filter(filter).try_init();
}
