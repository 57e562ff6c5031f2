//! 异步日志管道
//!
//! ```text
//! 生产者 (任意多个)          TransferQueue            发送任务 (单个)
//! ─────────────────          ─────────────            ──────────────
//! write() ──▶ allocate ──▶ [F0][F1][F2] ──▶ pop ──▶ transmit_async ──▶ UART
//! 从不阻塞     BytePool       有界 FIFO         await completion
//! 失败返回 0                                    release ──▶ BytePool
//! ```
//!
//! 内存不足或队列满都退化为丢弃消息，从不死锁，从不阻塞生产者。

pub mod consumer;
pub mod line;
pub mod producer;
pub mod queue;
pub mod transport;

pub use consumer::TransmitConsumer;
pub use line::LineBuf;
pub use producer::LogWriter;
pub use queue::{LogFrame, QueueStats, TransferQueue};
pub use transport::Transport;
