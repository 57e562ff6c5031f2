//! 内存管理模块
//!
//! - `pool`: 可变长字节内存池 (日志缓冲区的唯一来源)

pub mod pool;

pub use pool::{BytePool, PoolBuf, PoolStats};
