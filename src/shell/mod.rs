//! shell 协作接口
//!
//! - `port`: 字节流读写、接收中断入口、输出锁
//! - `logger`: 分级日志与运行时级别切换命令

pub mod logger;
pub mod port;

pub use logger::{LogLevel, Logger, CYCLE_LEVEL_BINDING};
pub use port::ShellPort;

/// 导出给 shell 命令表的按键绑定
///
/// 命令分发由 shell 完成，这里只描述按键码和说明。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    /// 按键码 (高字节为首个按键值，例如 0x04 即 Ctrl-D)
    pub key: u32,
    /// 帮助文本
    pub description: &'static str,
}
