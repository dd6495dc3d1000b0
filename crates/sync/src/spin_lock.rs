//! 保存中断状态的自旋锁
//!
//! [`RawSpinLock`] 实现 `lock_api::RawMutex`：加锁前关闭本地中断，
//! 并把进入前的中断状态保存在锁内部，解锁时恢复。
//! 语义上等价于 Linux 的 `spin_lock_irqsave` / `spin_unlock_irqrestore`，
//! 因此可以同时被中断处理函数和普通上下文使用。

use core::hint;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{IntrGuard, arch_ops};

/// 底层自旋锁
///
/// 不可重入：持锁期间再次获取同一把锁会死锁。
/// 多把锁嵌套时必须按获取的相反顺序释放。
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
    /// 持锁者进入前的中断状态，仅持锁者读写
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建未加锁的实例
    pub const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 通过 compare_exchange 保证同一时刻只有一个持有者，
// Acquire/Release 顺序保证临界区内存访问的可见性。
unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    // 保存的中断状态属于当前 CPU，guard 不能跨线程传递
    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        let guard = IntrGuard::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        let guard = IntrGuard::new();
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
            true
        } else {
            // guard 在此 drop，恢复中断
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        // SAFETY: flags 是 lock/try_lock 中保存的值
        unsafe { arch_ops().restore_interrupts(flags) };
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// 保护数据 `T` 的自旋锁
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock();
///     *guard += 1;
/// } // 解锁并恢复中断
/// ```
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 保护器
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
