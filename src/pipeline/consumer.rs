//! 发送消费者
//!
//! 单个专用任务: 取出一帧 → 交给物理传输 → 等待硬件完成 → 归还内存池。
//!
//! ```text
//!        ┌──────────────┐   pop    ┌──────────┐  transmit_async
//!   ┌───▶│ TransferQueue│────────▶ │ Transmit │ ─────────────────▶ UART/DMA
//!   │    └──────────────┘          └────┬─────┘                      │
//!   │                                   │ wait                       │ TC ISR
//!   │                                   ▼                            ▼
//!   │    ┌──────────────┐ release ┌──────────┐      raise     ┌──────────────┐
//!   └────│   BytePool   │◀────────│  Frame   │ ◀───────────── │ Completion   │
//!        └──────────────┘         └──────────┘                └──────────────┘
//! ```
//!
//! 帧在收到自己那一次完成通知后立即释放，然后才去取下一帧，
//! 因此任何时刻最多只有一个未释放的在途缓冲区，队列暂时为空时
//! 也不会有已发送完的缓冲区滞留。

use embassy_futures::select::{select, Either};

use crate::pipeline::queue::{LogFrame, TransferQueue};
use crate::pipeline::transport::Transport;
use crate::sync::completion::CompletionSignal;
use crate::sync::primitives::CriticalSignal;
use crate::util::log::*;

/// 发送消费者
///
/// # Type Parameters
/// * `T` - 物理传输
/// * `N` - 队列深度
pub struct TransmitConsumer<'a, 'p, T: Transport, const N: usize> {
    queue: &'a TransferQueue<'p, N>,
    completion: &'a CompletionSignal,
    transport: T,
    transmitted: u64,
    bytes: u64,
}

impl<'a, 'p, T: Transport, const N: usize> TransmitConsumer<'a, 'p, T, N> {
    /// 创建消费者
    pub fn new(queue: &'a TransferQueue<'p, N>, completion: &'a CompletionSignal, transport: T) -> Self {
        Self {
            queue,
            completion,
            transport,
            transmitted: 0,
            bytes: 0,
        }
    }

    /// 永久运行 (固件中的日志任务入口)，从不返回
    pub async fn run(&mut self) {
        log_info!("log transmit consumer started (queue depth {})", N);
        loop {
            self.transmit_next().await;
        }
    }

    /// 运行直到 `stop` 被触发
    ///
    /// 只在等待下一帧时响应停止: 已取出的帧总会完成发送并释放，
    /// 队列中已有的帧会先被发送完。
    pub async fn run_until(&mut self, stop: &CriticalSignal<()>) {
        loop {
            match select(self.queue.pop(), stop.wait()).await {
                Either::First(frame) => self.send(frame).await,
                Either::Second(()) => {
                    log_info!("log transmit consumer stopped after {} frames", self.transmitted);
                    return;
                }
            }
        }
    }

    /// 取出并发送一帧 (队列为空时挂起)
    pub async fn transmit_next(&mut self) {
        let frame = self.queue.pop().await;
        self.send(frame).await;
    }

    async fn send(&mut self, frame: LogFrame<'p>) {
        let payload = frame.payload();

        // 零长度的 DMA 传输不会产生完成中断
        if !payload.is_empty() {
            self.transport.clean_cache(payload);
            self.transport.transmit_async(payload);
            self.completion.wait().await;
        }

        self.transmitted += 1;
        self.bytes += frame.len() as u64;
        log_trace!("frame {} sent ({} bytes)", self.transmitted, frame.len());

        // 完成后立即归还内存池
        drop(frame);
    }

    /// 已发送的帧数
    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    /// 已发送的字节数
    pub fn bytes_transmitted(&self) -> u64 {
        self.bytes
    }

    /// 物理传输的引用
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 物理传输的可变引用
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// 取回物理传输
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::pool::BytePool;
    use crate::pipeline::producer::LogWriter;
    use embassy_futures::block_on;
    use std::vec::Vec;

    /// 同步完成的假串口: 记录数据并立即 raise
    struct InstantUart<'a> {
        sent: Vec<Vec<u8>>,
        cleaned: usize,
        done: &'a CompletionSignal,
    }

    impl<'a> InstantUart<'a> {
        fn new(done: &'a CompletionSignal) -> Self {
            Self {
                sent: Vec::new(),
                cleaned: 0,
                done,
            }
        }
    }

    impl Transport for InstantUart<'_> {
        fn transmit_async(&mut self, bytes: &[u8]) {
            self.sent.push(bytes.to_vec());
            self.done.raise();
        }

        fn clean_cache(&mut self, _bytes: &[u8]) {
            self.cleaned += 1;
        }
    }

    #[test]
    fn test_transmits_in_fifo_order_and_releases() {
        let pool = BytePool::<128>::new();
        let queue = TransferQueue::<'_, 8>::new();
        let done = CompletionSignal::new();
        let writer = LogWriter::new(&pool, &queue);

        writer.write(b"alpha");
        writer.write(b"beta");
        writer.write(b"gamma");

        let mut consumer = TransmitConsumer::new(&queue, &done, InstantUart::new(&done));
        for _ in 0..3 {
            block_on(consumer.transmit_next());
        }

        assert_eq!(consumer.transmitted(), 3);
        assert_eq!(consumer.bytes_transmitted(), 14);
        assert_eq!(pool.allocated_bytes(), 0);
        assert_eq!(done.pending(), 0);

        let uart = consumer.into_transport();
        assert_eq!(uart.sent, [b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
        assert_eq!(uart.cleaned, 3);
    }

    #[test]
    fn test_release_waits_for_completion() {
        use std::sync::Arc;
        use std::sync::Mutex;
        use std::thread;

        struct DeferredUart {
            started: Arc<Mutex<Vec<Vec<u8>>>>,
        }

        impl Transport for DeferredUart {
            fn transmit_async(&mut self, bytes: &[u8]) {
                self.started.lock().unwrap().push(bytes.to_vec());
            }
        }

        static POOL: BytePool<64> = BytePool::new();
        static QUEUE: TransferQueue<'static, 4> = TransferQueue::new();
        static DONE: CompletionSignal = CompletionSignal::new();

        let writer = LogWriter::new(&POOL, &QUEUE);
        writer.write(b"one");
        writer.write(b"two");

        let started = Arc::new(Mutex::new(Vec::new()));
        let uart = DeferredUart {
            started: Arc::clone(&started),
        };
        let started_count = || started.lock().unwrap().len();

        let consumer = thread::spawn(move || {
            let mut consumer = TransmitConsumer::new(&QUEUE, &DONE, uart);
            block_on(consumer.transmit_next());
            block_on(consumer.transmit_next());
            consumer.transmitted()
        });

        while started_count() < 1 {
            thread::yield_now();
        }
        // 第一帧在途: 没有完成通知前它的缓冲区不能被释放，第二帧也不能开始
        for _ in 0..1000 {
            thread::yield_now();
            assert_eq!(started_count(), 1);
            assert_eq!(POOL.outstanding(), 2);
        }

        DONE.raise();
        while started_count() < 2 {
            thread::yield_now();
        }
        // 第二帧开始发送前第一帧已经释放，只剩在途的第二帧
        assert_eq!(POOL.outstanding(), 1);

        DONE.raise();
        assert_eq!(consumer.join().unwrap(), 2);
        assert_eq!(POOL.outstanding(), 0);
        assert_eq!(DONE.raised(), 2);
        assert_eq!(DONE.consumed(), 2);
        assert_eq!(started.lock().unwrap().as_slice(), [b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_empty_frame_skips_transport() {
        let pool = BytePool::<16>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let done = CompletionSignal::new();
        let writer = LogWriter::new(&pool, &queue);

        writer.write(b"");
        let mut consumer = TransmitConsumer::new(&queue, &done, InstantUart::new(&done));
        block_on(consumer.transmit_next());

        assert_eq!(consumer.transmitted(), 1);
        assert!(consumer.transport().sent.is_empty());
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_run_until_drains_then_stops() {
        let pool = BytePool::<64>::new();
        let queue = TransferQueue::<'_, 4>::new();
        let done = CompletionSignal::new();
        let stop = CriticalSignal::new();
        let writer = LogWriter::new(&pool, &queue);

        writer.write(b"a");
        writer.write(b"b");
        stop.signal(());

        let mut consumer = TransmitConsumer::new(&queue, &done, InstantUart::new(&done));
        block_on(consumer.run_until(&stop));

        assert_eq!(consumer.transmitted(), 2);
        assert!(queue.is_empty());
        assert_eq!(pool.allocated_bytes(), 0);
    }
}
