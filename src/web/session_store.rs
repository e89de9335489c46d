//! アップロードされたデータセットをセッションごとに保持する

use crate::analytics::dataset::Dataset;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// 1ユーザー分のアップロード
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    /// アップロード時のファイル名
    pub source_name: String,
    pub dataset: Arc<Dataset>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<Uuid, Session>,
    /// 古い順
    order: VecDeque<Uuid>,
}

/// 上限付きのインメモリセッションストア
///
/// 上限に達した状態で追加すると最も古いセッションを破棄する。
pub struct SessionStore {
    inner: RwLock<StoreInner>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// データセットを登録してセッションIDを返す
    pub fn insert(&self, source_name: impl Into<String>, dataset: Dataset) -> Uuid {
        let session = Session {
            id: Uuid::new_v4(),
            source_name: source_name.into(),
            dataset: Arc::new(dataset),
            created_at: Utc::now(),
        };
        let id = session.id;

        let mut inner = self.inner.write();
        while inner.sessions.len() >= self.max_sessions {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.sessions.remove(&oldest);
            tracing::debug!(session = %oldest, "🗑️ Evicted oldest session");
        }
        inner.order.push_back(id);
        inner.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.inner.read().sessions.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
