//! 中断保护器
//!
//! 创建时关闭本地中断，销毁时恢复进入前的状态。
//!
//! 关闭中断只能阻止**本地 CPU** 上“任务 vs 中断处理函数”的并发，
//! 其他 CPU 的并行访问仍需要自旋锁。

use crate::arch_ops;

/// 中断保护器
///
/// # 示例
/// ```ignore
/// {
///     let _guard = IntrGuard::new(); // 关中断
///     // 不会被本地中断打断的代码
/// } // 恢复中断状态
/// ```
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 关闭本地中断并记录之前的状态
    pub fn new() -> Self {
        // SAFETY: flags 会在 drop 时原样恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        IntrGuard { flags }
    }

    /// 进入临界区前中断是否处于启用状态
    pub fn was_enabled(&self) -> bool {
        arch_ops().interrupts_enabled(self.flags)
    }

    /// 放弃恢复责任，返回保存的 flags
    ///
    /// 供需要把中断状态跨越函数边界保存的锁实现使用（见 [`crate::RawSpinLock`]）。
    pub(crate) fn into_flags(self) -> usize {
        let flags = self.flags;
        core::mem::forget(self);
        flags
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: flags 来自 IntrGuard::new
        unsafe { arch_ops().restore_interrupts(self.flags) };
    }
}
