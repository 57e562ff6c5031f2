//! 条件编译诊断日志
//!
//! 管道自身的诊断输出，根据 feature 选择后端:
//! - `log-defmt`: 使用 defmt (高效二进制日志，走调试探针而非被诊断的串口)
//! - 默认: 完全禁用日志 (零开销)
//!
//! 诊断日志永远不会写回日志管道本身，否则丢包告警会再次触发丢包。
//!
//! # 日志级别
//! - `log_error!`: 错误信息
//! - `log_warn!`: 警告信息
//! - `log_info!`: 一般信息
//! - `log_debug!`: 调试信息
//! - `log_trace!`: 详细跟踪

// ===================================================================
// defmt 后端 (feature = "log-defmt")
// ===================================================================
#[cfg(feature = "log-defmt")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

#[cfg(feature = "log-defmt")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(feature = "log-defmt")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(feature = "log-defmt")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(feature = "log-defmt")]
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

// ===================================================================
// 空实现 (无日志 feature)
// ===================================================================
// 参数仍然被引用一次，避免调用点出现未使用变量告警
#[cfg(not(feature = "log-defmt"))]
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "log-defmt"))]
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "log-defmt"))]
#[macro_export]
macro_rules! log_warn {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "log-defmt"))]
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

#[cfg(not(feature = "log-defmt"))]
#[macro_export]
macro_rules! log_trace {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }};
}

// ===================================================================
// 便捷重导出
// ===================================================================
pub use crate::{log_debug, log_error, log_info, log_trace, log_warn};

// ===================================================================
// 断言宏
// ===================================================================

/// Debug 断言 (仅在 debug 模式下检查)
#[macro_export]
macro_rules! debug_assert_msg {
    ($cond:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        #[cfg(debug_assertions)]
        {
            if !$cond {
                $crate::log_error!($fmt $(, $arg)*);
                panic!("Assertion failed");
            }
        }
    };
}

pub use crate::debug_assert_msg;
