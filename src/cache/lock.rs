//! 按餐厅 ID 加锁
//!
//! 查询→删除→添加 在存储端不是原子的，同一餐厅的同步必须串行执行。
//! 持有者释放或等待者被取消时，若没有其他引用则清理该条目。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<i64, Arc<Mutex<()>>>;

#[derive(Clone, Default)]
pub struct KeyedLock {
    table: Arc<LockTable>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定 ID 的锁，guard 释放前其他同 ID 调用会等待
    pub async fn lock(&self, id: i64) -> KeyedLockGuard {
        let mutex = self.table.entry(id).or_default().clone();

        // 等待期间 guard 已存在，future 被丢弃时也会走清理逻辑
        let mut guard = KeyedLockGuard {
            id,
            held: None,
            table: self.table.clone(),
        };
        guard.held = Some(mutex.lock_owned().await);
        guard
    }

    /// 当前锁表中的条目数
    pub fn active_keys(&self) -> usize {
        self.table.len()
    }
}

pub struct KeyedLockGuard {
    id: i64,
    held: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        // 先释放互斥锁，只剩锁表自身引用时删除条目
        self.held.take();
        self.table
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = KeyedLock::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock(42).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn different_ids_do_not_block_each_other() {
        let locks = KeyedLock::new();
        let _first = locks.lock(1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(2)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = KeyedLock::new();
        {
            let _a = locks.lock(1).await;
            let _b = locks.lock(2).await;
            assert_eq!(locks.active_keys(), 2);
        }
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_is_pruned_after_holder_releases() {
        let locks = KeyedLock::new();
        let holder = locks.lock(7).await;
        let mut waiter = Box::pin(locks.lock(7));
        assert!(futures_util::poll!(waiter.as_mut()).is_pending());

        drop(holder);
        assert_eq!(locks.active_keys(), 1);
        drop(waiter);

        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn waiter_cancelled_by_timeout_leaves_no_entry() {
        let locks = KeyedLock::new();
        {
            let _holder = locks.lock(9).await;
            let waited = tokio::time::timeout(Duration::from_millis(10), locks.lock(9)).await;
            assert!(waited.is_err());
        }
        assert_eq!(locks.active_keys(), 0);
    }
}
