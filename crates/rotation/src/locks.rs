use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use shared::domain::WidgetId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per widget id. Every read-modify-write of a widget's
/// persisted state runs while holding its guard.
#[derive(Clone, Default)]
pub struct WidgetLocks {
    inner: Arc<Mutex<HashMap<WidgetId, Arc<AsyncMutex<()>>>>>,
}

impl WidgetLocks {
    pub async fn acquire(&self, widget_id: &WidgetId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(widget_id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
