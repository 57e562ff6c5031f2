//! 传输队列
//!
//! 有界 FIFO，元素是内存池分配块的所有权句柄。生产者 `push` 不阻塞，
//! 单个消费者 `pop` 异步等待。队列满时把帧原样交还给调用者，
//! 由调用者决定释放 (通常就是直接 drop)。

use embassy_sync::channel::TrySendError;
use portable_atomic::{AtomicU32, Ordering};

use crate::mem::pool::PoolBuf;
use crate::sync::primitives::CriticalChannel;

/// 一条待发送的日志帧
///
/// 持有一个内存池分配块和其中的有效长度；分配块比有效长度多出的
/// 一个字节存放终止符 `0`。帧只能由 [`LogWriter`](crate::pipeline::LogWriter)
/// 构造，外部代码无法绕过终止符约定:
///
/// ```rust,compile_fail
/// use rtlog::{BytePool, LogFrame};
///
/// static POOL: BytePool<16> = BytePool::new();
///
/// let buf = POOL.allocate(4).unwrap();
/// let _frame = LogFrame::new(buf, 4);
/// ```
#[derive(Debug)]
pub struct LogFrame<'a> {
    buf: PoolBuf<'a>,
    len: usize,
}

impl<'a> LogFrame<'a> {
    /// 用分配块的前 `len` 字节构造帧，`buf[len]` 必须是终止符
    pub(crate) fn new(buf: PoolBuf<'a>, len: usize) -> Self {
        debug_assert!(len < buf.len() && buf[len] == 0);
        let len = len.min(buf.len());
        Self { buf, len }
    }

    /// 有效载荷
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// 有效长度
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空帧
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 取回底层分配块
    pub fn into_buf(self) -> PoolBuf<'a> {
        self.buf
    }
}

/// 队列计数快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// 成功入队的帧数
    pub pushed: u32,
    /// 因队列满被拒绝的帧数
    pub rejected: u32,
    /// 因内存池耗尽未能成帧的消息数
    pub oom_dropped: u32,
    /// 被消费者取走的帧数
    pub popped: u32,
}

/// 有界传输队列
///
/// # Type Parameters
/// * `N` - 队列深度
pub struct TransferQueue<'a, const N: usize> {
    channel: CriticalChannel<LogFrame<'a>, N>,
    pushed: AtomicU32,
    rejected: AtomicU32,
    oom_dropped: AtomicU32,
    popped: AtomicU32,
}

impl<'a, const N: usize> TransferQueue<'a, N> {
    /// 创建空队列
    pub const fn new() -> Self {
        Self {
            channel: CriticalChannel::new(),
            pushed: AtomicU32::new(0),
            rejected: AtomicU32::new(0),
            oom_dropped: AtomicU32::new(0),
            popped: AtomicU32::new(0),
        }
    }

    /// 非阻塞入队
    ///
    /// 队列满时返回 `Err(frame)`，帧的所有权回到调用者。
    pub fn push(&self, frame: LogFrame<'a>) -> Result<(), LogFrame<'a>> {
        match self.channel.try_send(frame) {
            Ok(()) => {
                self.pushed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(frame)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(frame)
            }
        }
    }

    /// 记录一条因内存池耗尽而丢弃的消息
    #[inline]
    pub fn note_oom_drop(&self) {
        self.oom_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// 出队，队列为空时挂起直到有帧可用 (无超时)
    pub async fn pop(&self) -> LogFrame<'a> {
        let frame = self.channel.receive().await;
        self.popped.fetch_add(1, Ordering::Relaxed);
        frame
    }

    /// 非阻塞出队
    pub fn try_pop(&self) -> Option<LogFrame<'a>> {
        let frame = self.channel.try_receive().ok()?;
        self.popped.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }

    /// 当前排队的帧数
    #[inline]
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// 是否已满
    #[inline]
    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    /// 队列深度
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// 计数快照
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            oom_dropped: self.oom_dropped.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
        }
    }
}

impl<const N: usize> Default for TransferQueue<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
