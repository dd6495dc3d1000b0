//! 等待队列
//!
//! 等待者在队列中登记一个 [`Waiter`]，唤醒方（通常是中断处理函数）
//! 将队列中所有等待者标记为已唤醒并清空队列。
//!
//! 唤醒路径不分配内存也不睡眠，只持有队列内部的自旋锁，
//! 因此可以在中断上下文中调用；登记路径可能分配内存，只能在普通上下文中调用。
//! 每个 [`Waiter`] 在唤醒时仍被登记方持有（阻塞的任务或 [`PollTable`]），
//! 唤醒路径清空队列时不会释放它。
//!
//! 等待采用“先登记、再检查条件”的顺序，保证唤醒不会丢失；
//! 醒来后条件必须重新检查（可能是伪唤醒，也可能被其他等待者抢先）。
//! 等待期间任务通过 [`ArchOps::wait_for_wakeup`](crate::ArchOps::wait_for_wakeup) 挂起，
//! 唤醒时通过 [`ArchOps::wake_task`](crate::ArchOps::wake_task) 通知宿主。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::{SpinLock, arch_ops};

/// 单个等待者
#[derive(Debug, Default)]
pub struct Waiter {
    woken: AtomicBool,
    task: usize,
}

impl Waiter {
    /// 为 `task` 创建一个尚未被唤醒的等待者
    pub const fn new(task: usize) -> Self {
        Self {
            woken: AtomicBool::new(false),
            task,
        }
    }

    /// 是否已被唤醒
    pub fn is_woken(&self) -> bool {
        self.woken.load(Ordering::Acquire)
    }

    /// 登记该等待者的任务
    pub fn task(&self) -> usize {
        self.task
    }

    fn wake(&self) {
        self.woken.store(true, Ordering::Release);
        arch_ops().wake_task(self.task);
    }
}

/// 等待队列
#[derive(Debug, Default)]
pub struct WaitQueue {
    waiters: SpinLock<Vec<Arc<Waiter>>>,
}

impl WaitQueue {
    /// 创建空队列
    pub const fn new() -> Self {
        Self {
            waiters: SpinLock::new(Vec::new()),
        }
    }

    /// 登记一个新的等待者并返回它
    ///
    /// 只能在普通上下文调用（可能分配内存）。
    pub fn register(&self) -> Arc<Waiter> {
        let waiter = Arc::new(Waiter::new(arch_ops().current_task()));
        self.waiters.lock().push(waiter.clone());
        waiter
    }

    /// 将等待者移出队列（若仍在队列中）
    pub fn remove(&self, waiter: &Arc<Waiter>) {
        self.waiters.lock().retain(|w| !Arc::ptr_eq(w, waiter));
    }

    /// 唤醒所有等待者，返回被唤醒的数量
    ///
    /// 不分配、不睡眠，可在中断上下文调用。
    pub fn wake_up_all(&self) -> usize {
        let mut waiters = self.waiters.lock();
        let count = waiters.len();
        for waiter in waiters.drain(..) {
            waiter.wake();
        }
        count
    }

    /// 当前登记的等待者数量
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 等待直到 `cond` 返回 true
    ///
    /// - `cond` 在每次醒来后重新求值；它可以是“检查并清除”的原子操作，
    ///   这样多个等待者中只有一个能通过。
    /// - `abort` 在等待期间反复检查，返回 `Some(e)` 时立即以 `Err(e)` 退出，
    ///   此时 `cond` 未被满足（因此也未产生副作用）。
    ///
    /// 只能在普通上下文调用。
    pub fn wait_event<E, C, A>(&self, mut cond: C, mut abort: A) -> Result<(), E>
    where
        C: FnMut() -> bool,
        A: FnMut() -> Option<E>,
    {
        debug_assert!(
            !arch_ops().in_interrupt(),
            "wait_event called from interrupt context"
        );
        loop {
            if cond() {
                return Ok(());
            }
            let waiter = self.register();
            // 登记之后再检查一次，避免检查与登记之间的唤醒丢失
            if cond() {
                self.remove(&waiter);
                return Ok(());
            }
            while !waiter.is_woken() {
                if let Some(err) = abort() {
                    self.remove(&waiter);
                    return Err(err);
                }
                arch_ops().wait_for_wakeup();
            }
        }
    }
}

/// poll 登记表
///
/// 对应一次 poll 调用：被查询的对象把调用者登记到自己的等待队列中，
/// 调用者随后可以检查是否有任何一个队列唤醒了它。
/// 登记表被丢弃时把尚未被唤醒的登记项从各自的队列中移除。
#[derive(Debug, Default)]
pub struct PollTable<'a> {
    entries: Vec<(&'a WaitQueue, Arc<Waiter>)>,
}

impl<'a> PollTable<'a> {
    /// 创建空登记表
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 登记到 `queue`
    pub fn register(&mut self, queue: &'a WaitQueue) {
        self.entries.push((queue, queue.register()));
    }

    /// 是否有任何登记项已被唤醒
    pub fn is_woken(&self) -> bool {
        self.entries.iter().any(|(_, w)| w.is_woken())
    }

    /// 登记项数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何登记项
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for PollTable<'_> {
    fn drop(&mut self) {
        for (queue, waiter) in self.entries.drain(..) {
            queue.remove(&waiter);
        }
    }
}
