//! 字节内存池
//!
//! 固定容量的连续字节区域，按调用者请求的长度切分为可变长分配块。
//! 日志管道中只有这里理解内存的生命周期。
//!
//! # 特性
//!
//! - 不阻塞: 分配失败立即返回 [`LogError::OutOfMemory`]，内部从不重试
//! - 首次适配 (first-fit): 在已分配区间之间的空隙中寻找第一个足够大的空隙
//! - 所有权句柄: [`PoolBuf`] 独占其字节区间，drop 时归还，不可能重复释放
//! - 32 字节对齐的存储区，可直接交给 DMA
//! - 分配块本身不带头部，分配 X 字节恰好占用 X 字节；
//!   存活块的账本容量由类型参数 `BLOCKS` 决定
//!
//! # 示例
//!
//! ```rust
//! use rtlog::mem::pool::BytePool;
//!
//! static POOL: BytePool<256> = BytePool::new();
//!
//! let mut buf = POOL.allocate(6).unwrap();
//! buf[..5].copy_from_slice(b"hello");
//! assert_eq!(POOL.allocated_bytes(), 6);
//!
//! // 自动释放 (Drop)
//! drop(buf);
//! assert_eq!(POOL.allocated_bytes(), 0);
//! ```

use core::cell::{RefCell, UnsafeCell};
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;

use crate::config::DEFAULT_POOL_BLOCKS;
use crate::error::LogError;
use crate::util::log::*;

/// 已分配区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    offset: usize,
    len: usize,
}

impl Span {
    #[inline(always)]
    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// 分配账本: 按偏移排序的存活区间
struct Ledger<const BLOCKS: usize> {
    capacity: usize,
    spans: heapless::Vec<Span, BLOCKS>,
    allocated: usize,
    peak: usize,
}

impl<const BLOCKS: usize> Ledger<BLOCKS> {
    const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            spans: heapless::Vec::new(),
            allocated: 0,
            peak: 0,
        }
    }

    /// 首次适配，返回分配到的偏移
    fn reserve(&mut self, size: usize) -> Option<usize> {
        if self.spans.is_full() || size > self.capacity - self.allocated {
            return None;
        }

        let mut cursor = 0;
        let mut slot = self.spans.len();
        for (i, span) in self.spans.iter().enumerate() {
            if span.offset - cursor >= size {
                slot = i;
                break;
            }
            cursor = span.end();
        }

        if slot == self.spans.len() && self.capacity - cursor < size {
            return None;
        }

        self.spans
            .insert(slot, Span { offset: cursor, len: size })
            .ok()?;
        self.allocated += size;
        self.peak = self.peak.max(self.allocated);
        Some(cursor)
    }

    /// 归还区间，区间不存在时返回 false
    fn free(&mut self, offset: usize, len: usize) -> bool {
        let target = Span { offset, len };
        match self.spans.iter().position(|span| *span == target) {
            Some(index) => {
                self.spans.remove(index);
                self.allocated -= len;
                true
            }
            None => false,
        }
    }

    fn largest_gap(&self) -> usize {
        let mut cursor = 0;
        let mut largest = 0;
        for span in self.spans.iter() {
            largest = largest.max(span.offset - cursor);
            cursor = span.end();
        }
        largest.max(self.capacity - cursor)
    }
}

type SharedLedger<const BLOCKS: usize> = BlockingMutex<CriticalSectionRawMutex, RefCell<Ledger<BLOCKS>>>;

/// 分配块归还入口，让 [`PoolBuf`] 不依赖账本容量参数
trait SpanRelease: Sync {
    fn release_span(&self, offset: usize, len: usize) -> bool;
}

impl<const BLOCKS: usize> SpanRelease for SharedLedger<BLOCKS> {
    fn release_span(&self, offset: usize, len: usize) -> bool {
        self.lock(|ledger| ledger.borrow_mut().free(offset, len))
    }
}

/// 32 字节对齐的存储区 (DMA 和 cache line 要求)
#[repr(C, align(32))]
struct Storage<const CAP: usize>(UnsafeCell<[u8; CAP]>);

/// 字节内存池
///
/// # 类型参数
///
/// - `CAP`: 池容量 (字节)
/// - `BLOCKS`: 同时存活的分配块上限。与传输队列配合使用时必须大于队列深度
///   (队列中的帧加上一个在途帧)，[`LogWriter::new`](crate::pipeline::LogWriter::new)
///   在编译期检查这一点
///
/// 多个生产者可以并发分配；释放通过 [`PoolBuf`] 的 drop 完成，
/// 账本由临界区保护，因此分配与释放都可以在任意上下文中调用且不会挂起。
pub struct BytePool<const CAP: usize, const BLOCKS: usize = DEFAULT_POOL_BLOCKS> {
    storage: Storage<CAP>,
    ledger: SharedLedger<BLOCKS>,
}

// Safety: 每个 PoolBuf 独占账本中一个互不重叠的区间，
// 账本本身由临界区互斥锁保护
unsafe impl<const CAP: usize, const BLOCKS: usize> Send for BytePool<CAP, BLOCKS> {}
unsafe impl<const CAP: usize, const BLOCKS: usize> Sync for BytePool<CAP, BLOCKS> {}

impl<const CAP: usize, const BLOCKS: usize> BytePool<CAP, BLOCKS> {
    /// 创建新的内存池
    pub const fn new() -> Self {
        Self {
            storage: Storage(UnsafeCell::new([0u8; CAP])),
            ledger: BlockingMutex::new(RefCell::new(Ledger::new(CAP))),
        }
    }

    /// 分配 `size` 字节
    ///
    /// 从不阻塞、从不重试；没有足够的连续空闲空间或已有 `BLOCKS`
    /// 个存活块时返回 [`LogError::OutOfMemory`]，池状态保持不变。
    pub fn allocate(&self, size: usize) -> Result<PoolBuf<'_>, LogError> {
        let offset = self
            .ledger
            .lock(|ledger| ledger.borrow_mut().reserve(size))
            .ok_or(LogError::OutOfMemory)?;

        // Safety: reserve 保证 offset + size <= CAP
        let ptr = unsafe {
            let base = self.storage.0.get() as *mut u8;
            NonNull::new_unchecked(base.add(offset))
        };

        Ok(PoolBuf {
            ptr,
            offset,
            len: size,
            ledger: &self.ledger,
        })
    }

    /// 显式归还分配块 (等价于 drop)
    #[inline]
    pub fn release(&self, buf: PoolBuf<'_>) {
        debug_assert_msg!(
            core::ptr::addr_eq(buf.ledger, &self.ledger),
            "buffer released to a foreign pool"
        );
        drop(buf);
    }

    /// 总容量 (字节)
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// 存活分配块上限
    pub const fn block_limit(&self) -> usize {
        BLOCKS
    }

    /// 已分配字节数
    pub fn allocated_bytes(&self) -> usize {
        self.ledger.lock(|ledger| ledger.borrow().allocated)
    }

    /// 空闲字节数 (不一定连续)
    pub fn free_bytes(&self) -> usize {
        CAP - self.allocated_bytes()
    }

    /// 存活的分配块数量
    pub fn outstanding(&self) -> usize {
        self.ledger.lock(|ledger| ledger.borrow().spans.len())
    }

    /// 当前可满足的最大单次分配
    pub fn largest_free_block(&self) -> usize {
        self.ledger.lock(|ledger| ledger.borrow().largest_gap())
    }

    /// 获取统计信息
    pub fn stats(&self) -> PoolStats {
        self.ledger.lock(|ledger| {
            let ledger = ledger.borrow();
            PoolStats {
                capacity: CAP,
                allocated: ledger.allocated,
                free: CAP - ledger.allocated,
                outstanding: ledger.spans.len(),
                peak: ledger.peak,
            }
        })
    }
}

impl<const CAP: usize, const BLOCKS: usize> Default for BytePool<CAP, BLOCKS> {
    fn default() -> Self {
        Self::new()
    }
}

/// 内存池分配块
///
/// 类似 `Box<[u8]>`，但数据存储在内存池中。
/// 当 PoolBuf drop 时自动把区间归还给所属的池。
pub struct PoolBuf<'a> {
    ptr: NonNull<u8>,
    offset: usize,
    len: usize,
    ledger: &'a dyn SpanRelease,
}

impl<'a> PoolBuf<'a> {
    /// 分配块长度 (字节)
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为零长度分配
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 在池内的偏移
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 获取原始指针 (用于交给 DMA)
    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Deref for PoolBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // Safety: 区间 [offset, offset + len) 由本句柄独占
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for PoolBuf<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // Safety: 同上，且 &mut self 保证没有其他借用
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PoolBuf<'_> {
    fn drop(&mut self) {
        let (offset, len) = (self.offset, self.len);
        if !self.ledger.release_span(offset, len) {
            log_error!("pool release of unknown span @{} len {}", offset, len);
        }
    }
}

impl core::fmt::Debug for PoolBuf<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolBuf")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

// Safety: PoolBuf 独占其区间，账本访问经由临界区
unsafe impl Send for PoolBuf<'_> {}
unsafe impl Sync for PoolBuf<'_> {}

/// 内存池统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// 总容量
    pub capacity: usize,
    /// 已分配字节数
    pub allocated: usize,
    /// 空闲字节数
    pub free: usize,
    /// 存活分配块数量
    pub outstanding: usize,
    /// 已分配字节数的历史峰值
    pub peak: usize,
}
