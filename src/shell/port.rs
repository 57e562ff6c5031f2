//! shell 的字节流端口
//!
//! 交互式 shell 本身 (行编辑、历史、命令表) 不在本 crate 内，
//! 它只需要这里提供的读/写/加锁契约:
//!
//! - 接收中断每收到一个字节调用 [`ShellPort::on_byte_received`]
//! - shell 任务用 [`ShellPort::read`] 逐字节阻塞读取
//! - shell 的输出经由日志管道异步发送 ([`ShellPort::write`])
//! - 多段输出用 [`ShellPort::lock`] 串行化

use crate::config::DEFAULT_POOL_BLOCKS;
use crate::error::LogError;
use crate::pipeline::producer::LogWriter;
use crate::sync::primitives::{AtomicCounter, CriticalChannel, SerialGuard, SerialLock};

/// shell 端口
///
/// # Type Parameters
/// * `CAP` - 日志内存池容量
/// * `N` - 日志传输队列深度
/// * `IN` - 输入字节队列深度
/// * `BLOCKS` - 日志内存池存活块上限
pub struct ShellPort<
    'a,
    'p,
    const CAP: usize,
    const N: usize,
    const IN: usize,
    const BLOCKS: usize = DEFAULT_POOL_BLOCKS,
> {
    writer: LogWriter<'a, 'p, CAP, N, BLOCKS>,
    input: CriticalChannel<u8, IN>,
    lock: SerialLock,
    rx_dropped: AtomicCounter,
}

impl<'a, 'p, const CAP: usize, const N: usize, const IN: usize, const BLOCKS: usize>
    ShellPort<'a, 'p, CAP, N, IN, BLOCKS>
{
    /// 创建端口，输出走 `writer`
    pub const fn new(writer: LogWriter<'a, 'p, CAP, N, BLOCKS>) -> Self {
        Self {
            writer,
            input: CriticalChannel::new(),
            lock: SerialLock::new(),
            rx_dropped: AtomicCounter::new(),
        }
    }

    // ===== 输入 =====

    /// 接收中断入口: 压入一个字节
    ///
    /// 非阻塞；输入队列满时丢弃该字节并返回 false。
    #[inline]
    pub fn on_byte_received(&self, byte: u8) -> bool {
        if self.input.try_send(byte).is_ok() {
            true
        } else {
            self.rx_dropped.increment();
            false
        }
    }

    /// 阻塞读取，直到填满 `buf`
    ///
    /// 逐字节从输入队列取出，无超时。返回 `buf.len()`。
    pub async fn read(&self, buf: &mut [u8]) -> usize {
        for slot in buf.iter_mut() {
            *slot = self.input.receive().await;
        }
        buf.len()
    }

    /// 非阻塞读取当前已到达的字节
    pub fn try_read(&self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.input.try_receive() {
                Ok(byte) => {
                    *slot = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        count
    }

    /// 因输入队列满而丢弃的字节数
    pub fn rx_dropped(&self) -> u64 {
        self.rx_dropped.get()
    }

    // ===== 输出 =====

    /// 写出原始字节 (经由日志管道，不阻塞)
    ///
    /// 返回写入的字节数，消息被丢弃时返回 0。
    #[inline]
    pub fn write(&self, data: &[u8]) -> usize {
        self.writer.write(data)
    }

    /// 写出一行 (追加 `\r\n`)，不加锁
    #[inline]
    pub fn write_line(&self, data: &[u8]) -> usize {
        self.writer.write_line(data)
    }

    /// 持锁写出一行，锁被占用时挂起等待
    pub async fn write_line_locked(&self, data: &[u8]) -> usize {
        let _guard = self.lock().await;
        self.writer.write_line(data)
    }

    /// 零超时持锁写出一行
    pub fn try_write_line_locked(&self, data: &[u8]) -> Result<usize, LogError> {
        let _guard = self.try_lock()?;
        self.writer.try_write_line(data)
    }

    // ===== 锁 =====

    /// 获取输出锁
    pub async fn lock(&self) -> SerialGuard<'_> {
        self.lock.lock().await
    }

    /// 零超时获取输出锁
    pub fn try_lock(&self) -> Result<SerialGuard<'_>, LogError> {
        self.lock.try_lock()
    }

    /// 输出使用的生产者句柄
    pub fn writer(&self) -> LogWriter<'a, 'p, CAP, N, BLOCKS> {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::pool::BytePool;
    use crate::pipeline::queue::TransferQueue;
    use embassy_futures::block_on;

    #[test]
    fn test_isr_bytes_are_read_in_order() {
        let pool = BytePool::<64>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let port = ShellPort::<'_, '_, 64, 4, 4>::new(LogWriter::new(&pool, &queue));

        assert!(port.on_byte_received(b'l'));
        assert!(port.on_byte_received(b's'));

        let mut buf = [0u8; 2];
        assert_eq!(block_on(port.read(&mut buf)), 2);
        assert_eq!(&buf, b"ls");
    }

    #[test]
    fn test_input_overflow_drops_bytes() {
        let pool = BytePool::<64>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let port = ShellPort::<'_, '_, 64, 4, 2>::new(LogWriter::new(&pool, &queue));

        assert!(port.on_byte_received(1));
        assert!(port.on_byte_received(2));
        assert!(!port.on_byte_received(3));
        assert_eq!(port.rx_dropped(), 1);

        let mut buf = [0u8; 8];
        assert_eq!(port.try_read(&mut buf), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(port.try_read(&mut buf), 0);
    }

    #[test]
    fn test_read_blocks_until_bytes_arrive() {
        use std::thread;
        use std::time::Duration;

        static POOL: BytePool<64> = BytePool::new();
        static QUEUE: TransferQueue<'static, 4> = TransferQueue::new();
        static PORT: ShellPort<'static, 'static, 64, 4, 8> =
            ShellPort::new(LogWriter::new(&POOL, &QUEUE));

        let isr = thread::spawn(|| {
            for &byte in b"help" {
                thread::sleep(Duration::from_millis(5));
                PORT.on_byte_received(byte);
            }
        });

        let mut buf = [0u8; 4];
        assert_eq!(block_on(PORT.read(&mut buf)), 4);
        assert_eq!(&buf, b"help");
        isr.join().unwrap();
    }

    #[test]
    fn test_output_goes_through_pipeline() {
        let pool = BytePool::<64>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let port = ShellPort::<'_, '_, 64, 4, 4>::new(LogWriter::new(&pool, &queue));

        assert_eq!(port.write(b"> "), 2);
        assert_eq!(block_on(port.write_line_locked(b"done")), 6);

        assert_eq!(block_on(queue.pop()).payload(), b"> ");
        assert_eq!(block_on(queue.pop()).payload(), b"done\r\n");
    }

    #[test]
    fn test_locked_write_reports_contention() {
        let pool = BytePool::<64>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let port = ShellPort::<'_, '_, 64, 4, 4>::new(LogWriter::new(&pool, &queue));

        let guard = port.try_lock().unwrap();
        assert_eq!(port.try_write_line_locked(b"x"), Err(LogError::LockTimeout));
        assert!(queue.is_empty());

        guard.unlock();
        assert_eq!(port.try_write_line_locked(b"x"), Ok(3));
    }
}
