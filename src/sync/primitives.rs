//! 同步原语封装
//!
//! 基于 embassy-sync 提供的同步原语，统一使用 CriticalSectionRawMutex
//! 以确保在单核/双核以及中断上下文中的正确性

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::Channel,
    mutex::{Mutex, MutexGuard},
    signal::Signal,
};

use crate::error::LogError;

// ===== 类型别名: 简化使用 =====

/// 临界区信号量 - 用于任务间单值通知
///
/// 多次发送只保留最后一个值，日志管道用它作为消费者的协作停止标志。
///
/// # Example
/// ```ignore
/// static STOP: CriticalSignal<()> = CriticalSignal::new();
///
/// STOP.signal(());
/// STOP.wait().await;
/// ```
pub type CriticalSignal<T> = Signal<CriticalSectionRawMutex, T>;

/// 临界区通道 - MPMC 消息队列
///
/// 支持多发送者多接收者，固定容量
///
/// # Type Parameters
/// * `T` - 消息类型
/// * `N` - 队列容量
pub type CriticalChannel<T, const N: usize> = Channel<CriticalSectionRawMutex, T, N>;

/// 临界区互斥锁 - 异步互斥访问
pub type CriticalMutex<T> = Mutex<CriticalSectionRawMutex, T>;

// ===== 串口互斥锁 =====

/// 共享输出通道的互斥锁
///
/// shell 的直接输出与日志管道共用同一个串口时，每条消息的发送
/// 都包在 `lock()` / 解锁之间。获取是无超时的阻塞等待 (异步挂起)。
///
/// 运行时不提供优先级继承；持锁区间只覆盖一次 `write` 调用，
/// 而 `write` 本身从不挂起，因此反转时间有上界。
pub struct SerialLock {
    inner: CriticalMutex<()>,
}

impl SerialLock {
    /// 创建新的互斥锁
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// 获取锁，锁被占用时挂起直到可用
    pub async fn lock(&self) -> SerialGuard<'_> {
        SerialGuard {
            _guard: self.inner.lock().await,
        }
    }

    /// 零超时获取
    ///
    /// 锁被占用时立即返回 [`LogError::LockTimeout`]
    pub fn try_lock(&self) -> Result<SerialGuard<'_>, LogError> {
        self.inner
            .try_lock()
            .map(|guard| SerialGuard { _guard: guard })
            .map_err(|_| LogError::LockTimeout)
    }
}

impl Default for SerialLock {
    fn default() -> Self {
        Self::new()
    }
}

/// 串口锁守卫，drop 时解锁
pub struct SerialGuard<'a> {
    _guard: MutexGuard<'a, CriticalSectionRawMutex, ()>,
}

impl SerialGuard<'_> {
    /// 显式解锁 (等价于 drop)
    #[inline]
    pub fn unlock(self) {}
}

// ===== 优化的原子操作封装 =====

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

/// 原子标志 - 最快的任务间通知
///
/// 比 Signal 更轻量，适用于简单的布尔状态通知
pub struct AtomicFlag {
    flag: AtomicBool,
}

impl AtomicFlag {
    /// 创建新的原子标志
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// 设置标志
    #[inline(always)]
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// 清除标志
    #[inline(always)]
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// 检查标志 (不清除)
    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 原子计数器 - 用于统计
pub struct AtomicCounter {
    count: AtomicU64,
}

impl AtomicCounter {
    /// 创建新的计数器
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// 增加并返回新值
    #[inline(always)]
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 获取当前值
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 重置为 0
    #[inline(always)]
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_serial_lock_exclusive() {
        let lock = SerialLock::new();

        let guard = lock.try_lock().unwrap();
        assert_eq!(lock.try_lock().err(), Some(LogError::LockTimeout));

        guard.unlock();
        assert!(lock.try_lock().is_ok());
    }

    #[test]
    fn test_serial_lock_blocking_acquire() {
        let lock = SerialLock::new();

        let guard = block_on(lock.lock());
        assert!(lock.try_lock().is_err());
        drop(guard);

        let _again = block_on(lock.lock());
    }

    #[test]
    fn test_serial_lock_serializes_threads() {
        use std::sync::Arc;
        use std::thread;

        let lock = Arc::new(SerialLock::new());
        let inside = Arc::new(AtomicFlag::new());
        let mut handles = std::vec::Vec::new();

        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            let inside = Arc::clone(&inside);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _guard = block_on(lock.lock());
                    assert!(!inside.is_set());
                    inside.set();
                    thread::yield_now();
                    inside.clear();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }
}
