//! 同步原语
//!
//! 为 gpiok 驱动提供可在中断上下文中使用的锁和等待机制：
//!
//! - [`IntrGuard`]：RAII 方式关闭/恢复本地中断
//! - [`SpinLock`]：保存中断状态的自旋锁（类似 `spin_lock_irqsave`）
//! - [`RwLock`]：读者不关中断、写者关中断的读写自旋锁
//! - [`WaitQueue`] / [`PollTable`]：等待队列与 poll 登记
//!
//! 锁类型均基于 `lock_api`，只需实现底层 raw lock。
//!
//! # 架构依赖
//!
//! 此 crate 通过 [`ArchOps`] trait 抽象架构相关操作。
//! 使用前必须调用 [`register_arch_ops`] 注册实现。

#![no_std]

extern crate alloc;

mod intr_guard;
mod rwlock;
mod spin_lock;
mod wait_queue;

pub use intr_guard::IntrGuard;
pub use rwlock::{RawSpinRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{RawSpinLock, SpinLock, SpinLockGuard};
pub use wait_queue::{PollTable, WaitQueue, Waiter};

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作的 trait
///
/// 由宿主内核（或测试）实现并注册，提供中断控制和忙等待提示。
pub trait ArchOps: Send + Sync {
    /// 读取并禁用本地中断，返回之前的状态
    ///
    /// # Safety
    /// 调用者必须确保在适当的上下文中调用
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// flags 必须是之前 read_and_disable_interrupts 返回的值
    unsafe fn restore_interrupts(&self, flags: usize);

    /// 判断 flags 中中断是否处于启用状态
    fn interrupts_enabled(&self, flags: usize) -> bool {
        flags != 0
    }

    /// 当前是否运行在中断上下文
    fn in_interrupt(&self) -> bool {
        false
    }

    /// 忙等待时的让步提示
    fn cpu_relax(&self) {
        core::hint::spin_loop();
    }

    /// 当前任务的标识
    ///
    /// 登记等待者时记录，唤醒时原样交给 [`ArchOps::wake_task`]。
    fn current_task(&self) -> usize {
        0
    }

    /// 挂起当前任务，直到被 [`ArchOps::wake_task`] 唤醒
    ///
    /// 允许提前返回，调用者会重新检查唤醒标志和中止条件。
    /// 宿主至少应在收到唤醒、信号或时钟节拍时返回；
    /// 挂起之前已经到达的唤醒不能丢失。默认实现只做一次 [`ArchOps::cpu_relax`]。
    fn wait_for_wakeup(&self) {
        self.cpu_relax();
    }

    /// 唤醒由 `task` 标识的任务
    ///
    /// 可能在中断上下文中调用，不能分配内存或睡眠。
    fn wake_task(&self, _task: usize) {}
}

static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: fat pointer 的布局是 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
    ARCH_OPS_DATA.store(data, Ordering::Release);
}

/// 获取架构操作实例
///
/// # Panics
/// 如果尚未调用 [`register_arch_ops`]，则 panic
#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: data 和 vtable 是通过 register_arch_ops 设置的有效指针
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}

/// 忙等待一次（委托给 [`ArchOps::cpu_relax`]）
#[inline]
pub fn cpu_relax() {
    arch_ops().cpu_relax();
}

/// 当前是否处于中断上下文
#[inline]
pub fn in_interrupt() -> bool {
    arch_ops().in_interrupt()
}
