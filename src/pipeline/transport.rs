//! 物理传输契约
//!
//! 管道只消费这个 trait；UART/DMA 驱动本身不在本 crate 内。

/// 慢速串行输出端
///
/// # 契约
///
/// - `transmit_async` 启动一次硬件传输后立即返回
/// - 每次调用恰好产生一次完成通知
///   ([`CompletionSignal::raise`](crate::sync::CompletionSignal::raise))
/// - 在完成通知之前，`bytes` 指向的内存保持有效且不被修改，
///   DMA 可以直接读取 `bytes.as_ptr()`
pub trait Transport {
    /// 启动异步发送
    fn transmit_async(&mut self, bytes: &[u8]);

    /// 发送前的 cache 维护
    ///
    /// 开启 D-Cache 的芯片需要在 DMA 读取前把数据写回内存 (clean)。
    /// 默认无操作。
    #[inline]
    fn clean_cache(&mut self, _bytes: &[u8]) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    #[inline]
    fn transmit_async(&mut self, bytes: &[u8]) {
        (**self).transmit_async(bytes)
    }

    #[inline]
    fn clean_cache(&mut self, bytes: &[u8]) {
        (**self).clean_cache(bytes)
    }
}
