//! 工具模块
//!
//! - `log`: 条件编译诊断日志宏

pub mod log;
