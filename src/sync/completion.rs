//! 传输完成信号
//!
//! 计数信号量: 硬件完成中断每次 `raise()` 加一，消费者每次 `wait()` 减一。
//!
//! ```text
//! DMA TC ISR                 CompletionSignal            TX 任务
//! ──────────                 ────────────────            ───────
//! raise() ──────────────▶   count += 1, wake   ──────▶  wait().await
//! 非阻塞, 无分配              原子计数 + AtomicWaker      count -= 1
//! ```
//!
//! 中断侧只接触这个信号，从不直接访问内存池或传输队列。

use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;
use portable_atomic::{AtomicU32, Ordering};

/// 传输完成计数信号
pub struct CompletionSignal {
    count: AtomicU32,
    raised: AtomicU32,
    consumed: AtomicU32,
    waker: AtomicWaker,
}

impl CompletionSignal {
    /// 创建计数为 0 的信号
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            raised: AtomicU32::new(0),
            consumed: AtomicU32::new(0),
            waker: AtomicWaker::new(),
        }
    }

    /// 记录一次传输完成 (中断安全)
    ///
    /// 非阻塞，不分配，不记日志。
    #[inline]
    pub fn raise(&self) {
        self.count.fetch_add(1, Ordering::Release);
        self.raised.fetch_add(1, Ordering::Relaxed);
        self.waker.wake();
    }

    /// 尝试消费一次完成事件 (不挂起)
    ///
    /// 计数为 0 时返回 false，计数永远不会变为负数。
    pub fn try_take(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.consumed.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// 等待并消费一次完成事件
    ///
    /// 只允许单个等待者 (传输消费者)。
    pub async fn wait(&self) {
        poll_fn(|cx| {
            if self.try_take() {
                return Poll::Ready(());
            }
            self.waker.register(cx.waker());
            // 注册之后再检查一次，防止错过注册前到达的 raise
            if self.try_take() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// 尚未被消费的完成事件数
    #[inline]
    pub fn pending(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// 累计 raise 次数
    #[inline]
    pub fn raised(&self) -> u32 {
        self.raised.load(Ordering::Relaxed)
    }

    /// 累计被消费的次数
    #[inline]
    pub fn consumed(&self) -> u32 {
        self.consumed.load(Ordering::Relaxed)
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_count_never_negative() {
        let signal = CompletionSignal::new();

        assert!(!signal.try_take());
        assert_eq!(signal.pending(), 0);

        signal.raise();
        signal.raise();
        assert_eq!(signal.pending(), 2);

        assert!(signal.try_take());
        assert!(signal.try_take());
        assert!(!signal.try_take());
        assert_eq!(signal.pending(), 0);
        assert_eq!(signal.raised(), 2);
        assert_eq!(signal.consumed(), 2);
    }

    #[test]
    fn test_wait_consumes_one() {
        let signal = CompletionSignal::new();

        signal.raise();
        signal.raise();
        block_on(signal.wait());
        assert_eq!(signal.pending(), 1);
    }

    #[test]
    fn test_wait_woken_from_other_context() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let signal = Arc::new(CompletionSignal::new());
        let isr = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.raise();
            })
        };

        block_on(signal.wait());
        isr.join().unwrap();
        assert_eq!(signal.pending(), 0);
        assert_eq!(signal.raised(), 1);
    }

    #[test]
    fn test_concurrent_raises_all_counted() {
        use std::sync::Arc;
        use std::thread;

        let signal = Arc::new(CompletionSignal::new());
        let mut handles = std::vec::Vec::new();

        for _ in 0..4 {
            let signal = Arc::clone(&signal);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    signal.raise();
                }
            }));
        }

        for _ in 0..1000 {
            block_on(signal.wait());
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(signal.pending(), 0);
        assert_eq!(signal.raised(), 1000);
        assert_eq!(signal.consumed(), 1000);
    }
}
