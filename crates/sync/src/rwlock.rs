//! 读写自旋锁
//!
//! 面向“写极少、读频繁且读可能发生在中断处理函数中”的场景（例如设备注册表）：
//!
//! - 读者不关中断，也不与其它读者互斥，可在中断上下文中安全调用；
//! - 写者关闭本地中断后再获取锁，保证同一 CPU 上的中断读者不会与之死锁。

use core::hint;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{IntrGuard, arch_ops};

const WRITER: usize = 1 << (usize::BITS - 1);

/// 底层读写自旋锁
///
/// `state` 最高位表示写者持有，其余位为当前读者数量。
#[derive(Debug)]
pub struct RawSpinRwLock {
    state: AtomicUsize,
    saved_flags: AtomicUsize,
}

impl RawSpinRwLock {
    /// 创建未加锁的实例
    pub const fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
            saved_flags: AtomicUsize::new(0),
        }
    }

    fn try_acquire_shared(&self) -> bool {
        let state = self.state.load(Ordering::Relaxed);
        state & WRITER == 0
            && self
                .state
                .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    fn try_acquire_exclusive(&self) -> bool {
        self.state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawSpinRwLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 写者位与读者计数通过 CAS 互斥，Acquire/Release 保证可见性。
unsafe impl lock_api::RawRwLock for RawSpinRwLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinRwLock::new();

    type GuardMarker = lock_api::GuardNoSend;

    fn lock_shared(&self) {
        while !self.try_acquire_shared() {
            hint::spin_loop();
        }
    }

    fn try_lock_shared(&self) -> bool {
        // weak CAS 可能伪失败，只要没有写者就重试
        loop {
            if self.try_acquire_shared() {
                return true;
            }
            if self.state.load(Ordering::Relaxed) & WRITER != 0 {
                return false;
            }
        }
    }

    unsafe fn unlock_shared(&self) {
        self.state.fetch_sub(1, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        let guard = IntrGuard::new();
        while !self.try_acquire_exclusive() {
            hint::spin_loop();
        }
        self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
    }

    fn try_lock_exclusive(&self) -> bool {
        let guard = IntrGuard::new();
        if self.try_acquire_exclusive() {
            self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    unsafe fn unlock_exclusive(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.state.store(0, Ordering::Release);
        // SAFETY: flags 是 lock_exclusive/try_lock_exclusive 中保存的值
        unsafe { arch_ops().restore_interrupts(flags) };
    }

    fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != 0
    }
}

/// 保护数据 `T` 的读写自旋锁
pub type RwLock<T> = lock_api::RwLock<RawSpinRwLock, T>;

/// [`RwLock`] 的读保护器
pub type RwLockReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawSpinRwLock, T>;

/// [`RwLock`] 的写保护器
pub type RwLockWriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawSpinRwLock, T>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_arch;
    use test_support::mock::arch::MOCK_ARCH_OPS;

    #[test]
    fn test_readers_share_and_exclude_writer() {
        test_arch::init();
        let lock = RwLock::new(1u32);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(*r1 + *r2, 2);
        assert!(lock.try_write().is_none());
        drop(r1);
        assert!(lock.try_write().is_none());
        drop(r2);
        *lock.write() = 7;
        assert_eq!(*lock.read(), 7);
    }

    #[test]
    fn test_writer_excludes_readers() {
        test_arch::init();
        let lock = RwLock::new(0u32);
        let w = lock.write();
        assert!(lock.try_read().is_none());
        drop(w);
        assert!(lock.try_read().is_some());
    }

    #[test]
    fn test_only_writer_disables_interrupts() {
        test_arch::init();
        MOCK_ARCH_OPS.with_local_interrupts(true, || {
            let lock = RwLock::new(());
            {
                let _r = lock.read();
                assert!(MOCK_ARCH_OPS.local_interrupts_enabled());
            }
            {
                let _w = lock.write();
                assert!(!MOCK_ARCH_OPS.local_interrupts_enabled());
            }
            assert!(MOCK_ARCH_OPS.local_interrupts_enabled());
        });
    }
}
