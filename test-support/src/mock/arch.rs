//! 架构相关操作的 Mock 实现
//!
//! 中断开关状态和“是否处于中断上下文”都是线程局部的，
//! 这样并行运行的测试互不干扰；一个宿主线程即一个模拟 CPU。
//! 每个宿主线程同时也是一个任务，挂起只是让出线程，唤醒按任务记录下来供测试检查。

use std::cell::Cell;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

static NEXT_TASK: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static LOCAL_IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
    static TASK_ID: usize = NEXT_TASK.fetch_add(1, Ordering::Relaxed);
    static PARKS: Cell<usize> = const { Cell::new(0) };
}

/// Mock 架构操作
pub struct MockArchOps {
    unparked: Mutex<Vec<usize>>,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            unparked: Mutex::new(Vec::new()),
        }
    }

    /// 关闭当前线程的模拟中断，返回之前的状态（1 = 启用）
    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        LOCAL_IRQ_ENABLED.with(|s| s.replace(false)) as usize
    }

    pub unsafe fn restore_interrupts(&self, flags: usize) {
        LOCAL_IRQ_ENABLED.with(|s| s.set(flags != 0));
    }

    pub fn in_interrupt(&self) -> bool {
        IN_INTERRUPT.with(|s| s.get())
    }

    /// 忙等待时让出宿主线程
    pub fn cpu_relax(&self) {
        thread::yield_now();
    }

    /// 当前线程的任务标识（非 0，线程间唯一）
    pub fn current_task(&self) -> usize {
        TASK_ID.with(|id| *id)
    }

    /// 挂起当前任务：记一次数后让出线程，随时可能返回
    pub fn park(&self) {
        PARKS.with(|p| p.set(p.get() + 1));
        thread::yield_now();
    }

    /// 记录一次对 `task` 的唤醒
    pub fn unpark(&self, task: usize) {
        self.unparked.lock().unwrap().push(task);
    }

    /// 当前线程累计挂起的次数
    pub fn parks(&self) -> usize {
        PARKS.with(|p| p.get())
    }

    /// `task` 被唤醒的次数
    pub fn unparks_of(&self, task: usize) -> usize {
        self.unparked
            .lock()
            .unwrap()
            .iter()
            .filter(|t| **t == task)
            .count()
    }

    /// 当前线程的模拟中断是否启用
    pub fn local_interrupts_enabled(&self) -> bool {
        LOCAL_IRQ_ENABLED.with(|s| s.get())
    }

    /// 以给定的初始中断状态运行 `f`，结束后恢复
    pub fn with_local_interrupts<R>(&self, enabled: bool, f: impl FnOnce() -> R) -> R {
        let prev = LOCAL_IRQ_ENABLED.with(|s| s.replace(enabled));
        let ret = f();
        LOCAL_IRQ_ENABLED.with(|s| s.set(prev));
        ret
    }

    /// 以“中断上下文”身份运行 `f`
    pub fn as_interrupt<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = IN_INTERRUPT.with(|s| s.replace(true));
        let ret = f();
        IN_INTERRUPT.with(|s| s.set(prev));
        ret
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
