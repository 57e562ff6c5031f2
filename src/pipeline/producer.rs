//! 日志生产者接口
//!
//! 任意数量的并发调用者通过 [`LogWriter`] 写入日志:
//! 分配 → 复制 → 入队，任何一步失败都立即返回，从不阻塞也从不重试。

use core::fmt;

use crate::error::LogError;
use crate::config::DEFAULT_POOL_BLOCKS;
use crate::mem::pool::BytePool;
use crate::pipeline::line::LineBuf;
use crate::pipeline::queue::{LogFrame, TransferQueue};
use crate::util::log::*;

/// shell 行尾
pub const LINE_ENDING: &[u8] = b"\r\n";

/// 日志生产者句柄
///
/// 只包含两个引用，可以随意复制给各个任务/线程。
/// `'p` 是内存池的借用，队列中的帧都从这个池分配；`'a` 是队列的借用。
///
/// 内存池的存活块上限 `BLOCKS` 必须大于队列深度 `N`: 队列装满时
/// 还有一个帧在消费者手中发送，字节数够用的写入不能因为账本满而失败。
pub struct LogWriter<'a, 'p, const CAP: usize, const N: usize, const BLOCKS: usize = DEFAULT_POOL_BLOCKS> {
    pool: &'p BytePool<CAP, BLOCKS>,
    queue: &'a TransferQueue<'p, N>,
}

impl<const CAP: usize, const N: usize, const BLOCKS: usize> Clone for LogWriter<'_, '_, CAP, N, BLOCKS> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const CAP: usize, const N: usize, const BLOCKS: usize> Copy for LogWriter<'_, '_, CAP, N, BLOCKS> {}

impl<'a, 'p, const CAP: usize, const N: usize, const BLOCKS: usize> LogWriter<'a, 'p, CAP, N, BLOCKS> {
    const BLOCKS_COVER_QUEUE: () = assert!(
        BLOCKS > N,
        "pool block limit must exceed the transfer queue depth"
    );

    /// 绑定内存池与传输队列
    ///
    /// `BLOCKS <= N` 时编译失败。
    pub const fn new(pool: &'p BytePool<CAP, BLOCKS>, queue: &'a TransferQueue<'p, N>) -> Self {
        let () = Self::BLOCKS_COVER_QUEUE;
        Self { pool, queue }
    }

    /// 写入一条消息
    ///
    /// 成功返回 `payload.len()`；内存不足或队列满时消息被丢弃并返回 0。
    #[inline]
    pub fn write(&self, payload: &[u8]) -> usize {
        self.try_write(payload).unwrap_or(0)
    }

    /// 写入一条消息并给出失败原因
    pub fn try_write(&self, payload: &[u8]) -> Result<usize, LogError> {
        self.enqueue(&[payload])
    }

    /// 写入一行 (追加 `\r\n`)
    ///
    /// 成功返回包含行尾在内的字节数，失败返回 0。
    #[inline]
    pub fn write_line(&self, payload: &[u8]) -> usize {
        self.try_write_line(payload).unwrap_or(0)
    }

    /// 写入一行并给出失败原因
    pub fn try_write_line(&self, payload: &[u8]) -> Result<usize, LogError> {
        self.enqueue(&[payload, LINE_ENDING])
    }

    /// 格式化写入，超出 `MAX_LINE_LEN` 的部分被截断
    ///
    /// 返回值语义同 [`write`](Self::write)。
    pub fn write_args(&self, args: fmt::Arguments<'_>) -> usize {
        let line = LineBuf::format(args);
        self.write(line.as_bytes())
    }

    /// 绑定的内存池
    pub fn pool(&self) -> &'p BytePool<CAP, BLOCKS> {
        self.pool
    }

    /// 绑定的传输队列
    pub fn queue(&self) -> &'a TransferQueue<'p, N> {
        self.queue
    }

    fn enqueue(&self, parts: &[&[u8]]) -> Result<usize, LogError> {
        let len: usize = parts.iter().map(|part| part.len()).sum();

        // 载荷 + 终止符
        let mut buf = self.pool.allocate(len + 1).map_err(|err| {
            log_debug!("log message dropped: {} bytes, pool exhausted", len);
            self.queue.note_oom_drop();
            err
        })?;

        let mut at = 0;
        for part in parts {
            buf[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }
        buf[len] = 0;

        // 队列满时帧被交还，drop 即归还内存池
        self.queue.push(LogFrame::new(buf, len)).map_err(|_frame| {
            log_debug!("log message dropped: {} bytes, queue full", len);
            LogError::QueueFull
        })?;

        Ok(len)
    }
}

impl<const CAP: usize, const N: usize, const BLOCKS: usize> fmt::Debug for LogWriter<'_, '_, CAP, N, BLOCKS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter")
            .field("pool_capacity", &CAP)
            .field("queue_depth", &N)
            .field("pool_blocks", &BLOCKS)
            .finish()
    }
}
