//! 日志管道错误类型
//!
//! 生产者侧的所有错误在 [`LogWriter::write`](crate::pipeline::LogWriter::write)
//! 中被折叠为 "写入 0 字节"，只有 `try_write` 会把具体原因交给调用者。

use core::fmt;

/// 日志管道错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum LogError {
    /// 内存池没有足够的连续空闲空间
    OutOfMemory,
    /// 传输队列已满
    QueueFull,
    /// 互斥锁未能获取
    LockTimeout,
}

impl LogError {
    /// 错误名称 (用于诊断输出)
    pub const fn as_str(self) -> &'static str {
        match self {
            LogError::OutOfMemory => "out of memory",
            LogError::QueueFull => "queue full",
            LogError::LockTimeout => "lock timeout",
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
