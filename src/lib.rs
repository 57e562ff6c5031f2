//! rtlog - 嵌入式异步日志传输库
//!
//! 本库提供以下核心功能:
//! - 有界字节内存池 (不阻塞分配、drop 即释放)
//! - 生产者/消费者传输队列 (多生产者、单发送任务)
//! - 中断安全的传输完成计数信号
//! - shell 字节流端口与分级日志 (运行时切换级别)
//! - 条件编译诊断日志系统
//!
//! # 示例
//!
//! ```rust,ignore
//! use rtlog::{BytePool, CompletionSignal, LogWriter, TransferQueue, TransmitConsumer};
//!
//! static POOL: BytePool<{ rtlog::config::DEFAULT_POOL_BYTES }> = BytePool::new();
//! static QUEUE: TransferQueue<'static, { rtlog::config::DEFAULT_QUEUE_DEPTH }> = TransferQueue::new();
//! static TX_DONE: CompletionSignal = CompletionSignal::new();
//!
//! // 任意任务/线程
//! let log = LogWriter::new(&POOL, &QUEUE);
//! log.write_line(b"boot ok");
//!
//! // 发送任务
//! let mut consumer = TransmitConsumer::new(&QUEUE, &TX_DONE, uart_dma);
//! consumer.run().await;
//!
//! // DMA 发送完成中断
//! TX_DONE.raise();
//! ```

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod mem;
pub mod pipeline;
pub mod shell;
pub mod sync;
pub mod util;

// ===== 重导出常用类型 =====
pub use error::LogError;
pub use mem::pool::{BytePool, PoolBuf};
pub use pipeline::{LogFrame, LogWriter, TransferQueue, TransmitConsumer, Transport};
pub use shell::{LogLevel, Logger, ShellPort};
pub use sync::{CompletionSignal, SerialLock};

// ===== 版本信息 =====
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 系统配置常量
pub mod config {
    /// 默认日志内存池大小 (字节)
    pub const DEFAULT_POOL_BYTES: usize = 4096;

    /// 默认传输队列深度
    pub const DEFAULT_QUEUE_DEPTH: usize = 32;

    /// shell 输入字节队列深度
    pub const SHELL_INPUT_DEPTH: usize = 16;

    /// 格式化单行日志的最大长度 (字节)
    pub const MAX_LINE_LEN: usize = 128;

    /// 内存池默认的存活分配块上限 (须大于与之配合的队列深度)
    pub const DEFAULT_POOL_BLOCKS: usize = 64;

    /// DMA 缓冲区对齐要求 (cache line)
    pub const DMA_ALIGNMENT: usize = 32;
}
