use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::viewer::Viewer;

/// 一个浏览器端查看器会话
///
/// 同一会话的控件变化在锁内逐个执行完毕，不会交错重绘。
pub struct ViewerSession {
    pub viewer: Mutex<Viewer>,
    /// 最近一次访问时间，用于 TTL 过期检查
    last_used: Mutex<Instant>,
}

impl ViewerSession {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer: Mutex::new(viewer),
            last_used: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(*self.last_used.lock())
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<ViewerSession>>>,
    /// 会话空闲超过此时间即过期
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, session: ViewerSession) -> (String, Arc<ViewerSession>) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(session);
        self.sessions.write().insert(id.clone(), session.clone());
        (id, session)
    }

    /// 查找会话并刷新其访问时间
    pub fn get(&self, id: &str) -> Option<Arc<ViewerSession>> {
        let session = self.sessions.read().get(id).cloned()?;
        session.touch();
        Some(session)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    /// 清理过期会话，返回清理数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) < self.ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
