//! 按线程划分的异步锁
//!
//! 同一线程的 submit / resume 串行执行，不同线程互不阻塞。外层表只在首次见到某线程时加写锁。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Default)]
pub struct ThreadLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, thread_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(thread_id) {
            return Arc::clone(lock);
        }
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(thread_id.to_string()).or_default())
    }

    /// 持有期间同一线程的其他调用等待
    pub async fn acquire(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(thread_id).await.lock_owned().await
    }

    /// 线程删除后回收锁
    pub async fn forget(&self, thread_id: &str) {
        self.locks.write().await.remove(thread_id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_thread_is_serialized() {
        let locks = Arc::new(ThreadLocks::new());
        let guard = locks.acquire("t1").await;

        let l2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = l2.acquire("t1").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_threads_not_blocked() {
        let locks = ThreadLocks::new();
        let _g1 = locks.acquire("t1").await;
        let acquired = tokio::time::timeout(Duration::from_millis(50), locks.acquire("t2")).await;
        assert!(acquired.is_ok());
    }
}
