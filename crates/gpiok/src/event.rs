//! 中断同步单元
//!
//! 中断处理函数与阻塞读者之间传递“有数据”这一位状态：
//!
//! - 中断侧调用 [`IrqEvent::signal`]：在锁内置位 `data_ready` 并递增计数，然后唤醒读者与 poll 者。
//!   该路径不分配、不睡眠。
//! - 读者侧调用 [`IrqEvent::wait_and_consume`]：在锁内“检查并清除” `data_ready`，
//!   因此同一次事件只有一个读者能消费，其余读者被唤醒后重新等待。
//! - 等待被取消（或超时、设备移除）时不清除 `data_ready`，事件留给后续的读者。

use sync::{PollTable, SpinLock, WaitQueue};

use crate::GpioError;

#[derive(Debug, Default)]
struct EventState {
    data_ready: bool,
    irq_count: u64,
}

/// 一个实例的中断事件
#[derive(Debug, Default)]
pub struct IrqEvent {
    state: SpinLock<EventState>,
    readers: WaitQueue,
    pollers: WaitQueue,
}

impl IrqEvent {
    /// 初始状态：无数据，计数为 0
    pub const fn new() -> Self {
        Self {
            state: SpinLock::new(EventState {
                data_ready: false,
                irq_count: 0,
            }),
            readers: WaitQueue::new(),
            pollers: WaitQueue::new(),
        }
    }

    /// 中断侧：记录一次事件并唤醒所有等待者
    pub fn signal(&self) {
        {
            let mut state = self.state.lock();
            state.data_ready = true;
            state.irq_count += 1;
        }
        self.wake_all();
    }

    /// 唤醒所有读者和 poll 者，不改变状态
    pub fn wake_all(&self) {
        self.readers.wake_up_all();
        self.pollers.wake_up_all();
    }

    /// 检查并清除 `data_ready`，返回是否消费到了事件
    pub fn try_consume(&self) -> bool {
        core::mem::take(&mut self.state.lock().data_ready)
    }

    /// 阻塞直到消费到一次事件
    ///
    /// `abort` 在等待期间反复调用，返回 `Some(err)` 时放弃等待且不消费事件。
    pub fn wait_and_consume<A>(&self, abort: A) -> Result<(), GpioError>
    where
        A: FnMut() -> Option<GpioError>,
    {
        self.readers.wait_event(|| self.try_consume(), abort)
    }

    /// 是否有未消费的事件
    pub fn is_ready(&self) -> bool {
        self.state.lock().data_ready
    }

    /// poll 查询：先登记（若给出登记表）再检查，避免漏掉中间的唤醒
    ///
    /// 登记项随登记表一起丢弃，不会在 `pollers` 中累积。
    pub fn poll<'a>(&'a self, table: Option<&mut PollTable<'a>>) -> bool {
        if let Some(table) = table {
            table.register(&self.pollers);
        }
        self.is_ready()
    }

    /// 累计中断次数
    pub fn irq_count(&self) -> u64 {
        self.state.lock().irq_count
    }

    /// 正在阻塞等待的读者数量
    pub fn blocked_readers(&self) -> usize {
        self.readers.len()
    }

    /// 仍登记在 poll 等待队列中的登记项数量
    pub fn pending_pollers(&self) -> usize {
        self.pollers.len()
    }
}
