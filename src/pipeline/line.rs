//! 定长行缓冲
//!
//! 在栈上格式化一行日志，超出容量的部分直接截断，不分配、不失败。

use core::fmt::{self, Write};

use crate::config::MAX_LINE_LEN;

/// 栈上行缓冲
pub struct LineBuf {
    bytes: heapless::Vec<u8, MAX_LINE_LEN>,
    truncated: bool,
}

impl LineBuf {
    /// 创建空缓冲
    pub const fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
            truncated: false,
        }
    }

    /// 格式化为一行
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut line = Self::new();
        let _ = line.write_fmt(args);
        line
    }

    /// 追加原始字节，返回实际写入的字节数
    pub fn push_bytes(&mut self, data: &[u8]) -> usize {
        let room = MAX_LINE_LEN - self.bytes.len();
        let take = data.len().min(room);
        // 长度已按剩余空间裁剪，不会失败
        let _ = self.bytes.extend_from_slice(&data[..take]);
        if take < data.len() {
            self.truncated = true;
        }
        take
    }

    /// 已格式化的字节
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 长度
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 是否发生过截断
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for LineBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}
