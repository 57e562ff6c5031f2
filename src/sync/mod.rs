//! 同步原语模块
//!
//! 提供线程/中断安全的同步原语:
//! - `CompletionSignal`: 中断安全的计数完成信号
//! - `SerialLock`: 共享输出通道的互斥锁
//! - `CriticalSignal` / `CriticalChannel` / `CriticalMutex`: embassy-sync 类型别名

pub mod completion;
pub mod primitives;

pub use completion::CompletionSignal;
pub use primitives::{
    AtomicCounter, AtomicFlag, CriticalChannel, CriticalMutex, CriticalSignal, SerialGuard,
    SerialLock,
};
