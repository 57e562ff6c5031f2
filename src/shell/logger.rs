//! 分级日志
//!
//! 在日志管道之上的一层薄封装: 按当前级别过滤、加级别前缀、
//! 以行为单位经 shell 端口写出。级别可以在运行时通过 shell 按键循环切换。

use core::fmt;

use portable_atomic::{AtomicU8, Ordering};

use crate::config::DEFAULT_POOL_BLOCKS;
use crate::error::LogError;
use crate::pipeline::line::LineBuf;
use crate::shell::port::ShellPort;
use crate::shell::KeyBinding;
use crate::sync::primitives::AtomicFlag;

/// 日志级别
///
/// 作为阈值时，`All` 放行所有消息，`Off` 屏蔽所有消息；
/// 作为消息级别时只使用 `Debug` 到 `Error`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    All = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    /// 循环顺序
    pub const CYCLE: [LogLevel; 6] = [
        LogLevel::All,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    /// 转为字符串
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::All => "ALL",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }

    /// 循环中的下一个级别，`Off` 之后回到 `All`
    pub const fn next(self) -> LogLevel {
        Self::CYCLE[(self as usize + 1) % Self::CYCLE.len()]
    }

    /// 从原始值恢复，越界返回 None
    pub const fn from_u8(raw: u8) -> Option<LogLevel> {
        if (raw as usize) < Self::CYCLE.len() {
            Some(Self::CYCLE[raw as usize])
        } else {
            None
        }
    }

    /// 以 `self` 为阈值时，`message` 级别的消息是否输出
    pub fn allows(self, message: LogLevel) -> bool {
        self != LogLevel::Off && message != LogLevel::Off && message >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 切换日志级别的按键绑定 (Ctrl-D)
pub const CYCLE_LEVEL_BINDING: KeyBinding = KeyBinding {
    key: 0x0400_0000,
    description: "switch log level",
};

/// 分级日志器
pub struct Logger<
    's,
    'p,
    const CAP: usize,
    const N: usize,
    const IN: usize,
    const BLOCKS: usize = DEFAULT_POOL_BLOCKS,
> {
    shell: &'s ShellPort<'s, 'p, CAP, N, IN, BLOCKS>,
    level: AtomicU8,
    muted: AtomicFlag,
}

impl<'s, 'p, const CAP: usize, const N: usize, const IN: usize, const BLOCKS: usize>
    Logger<'s, 'p, CAP, N, IN, BLOCKS>
{
    /// 创建日志器，初始级别为 `level`
    pub const fn new(shell: &'s ShellPort<'s, 'p, CAP, N, IN, BLOCKS>, level: LogLevel) -> Self {
        Self {
            shell,
            level: AtomicU8::new(level as u8),
            muted: AtomicFlag::new(),
        }
    }

    /// 当前级别
    pub fn level(&self) -> LogLevel {
        Self::decode(self.level.load(Ordering::Relaxed))
    }

    /// 设置级别
    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// 暂停/恢复全部输出
    pub fn set_active(&self, active: bool) {
        if active {
            self.muted.clear();
        } else {
            self.muted.set();
        }
    }

    /// 是否处于输出状态
    pub fn is_active(&self) -> bool {
        !self.muted.is_set()
    }

    /// `level` 级别的消息当前是否会输出
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.is_active() && self.level().allows(level)
    }

    /// 输出一条日志，等待 shell 输出锁
    ///
    /// 被过滤或被丢弃时返回 0。
    pub async fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) -> usize {
        if !self.enabled(level) {
            return 0;
        }
        let line = Self::render(level, args);
        self.shell.write_line_locked(line.as_bytes()).await
    }

    /// 输出一条日志，不挂起
    ///
    /// shell 输出锁被占用时返回 [`LogError::LockTimeout`]；被过滤时返回 `Ok(0)`。
    pub fn try_log(&self, level: LogLevel, args: fmt::Arguments<'_>) -> Result<usize, LogError> {
        if !self.enabled(level) {
            return Ok(0);
        }
        let line = Self::render(level, args);
        self.shell.try_write_line_locked(line.as_bytes())
    }

    /// 循环切换到下一个级别并输出确认行
    ///
    /// 确认行不受级别和暂停状态影响。返回新级别。
    /// 并发的多次切换各自前进一级，不会互相覆盖。
    pub async fn cycle_level(&self) -> LogLevel {
        let previous = match self.level.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            Some(Self::decode(raw).next() as u8)
        }) {
            Ok(raw) | Err(raw) => raw,
        };
        let next = Self::decode(previous).next();

        let line = LineBuf::format(format_args!("set log level: {}", next));
        self.shell.write_line_locked(line.as_bytes()).await;
        next
    }

    fn decode(raw: u8) -> LogLevel {
        LogLevel::from_u8(raw).unwrap_or(LogLevel::All)
    }

    fn render(level: LogLevel, args: fmt::Arguments<'_>) -> LineBuf {
        use core::fmt::Write;

        let mut line = LineBuf::new();
        let _ = write!(line, "[{}] ", level);
        let _ = line.write_fmt(args);
        line
    }
}
