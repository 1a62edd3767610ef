use std::sync::Arc;

use crate::query::SweepQuery;
use crate::schedule::Schedule;
use crate::session::SessionStore;

/// 全局应用状态，在各个 handler 之间共享合并数组、参数表与查看器会话
pub struct AppState {
    pub query: Arc<dyn SweepQuery>,
    pub schedule: Arc<Schedule>,
    pub sessions: Arc<SessionStore>,
}
