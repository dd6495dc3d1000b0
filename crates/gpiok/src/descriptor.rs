//! 设备描述符
//!
//! 每个已绑定的硬件实例对应一个 [`GpioDevice`]：
//! 它持有映射后的寄存器块、中断线绑定和中断同步状态。
//!
//! # 生命周期
//!
//! 所有访问寄存器的调用都先通过 [`GpioDevice::enter`] 登记为“在用”，
//! 中断处理函数同样登记为“在中断中”。detach 时先把描述符标记为已移除，
//! 唤醒所有等待者，等这两类计数归零后才拆除映射，
//! 因此拆除期间不会有任何路径再访问寄存器。

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use sync::{PollTable, SpinLock, cpu_relax};

use crate::GpioError;
use crate::event::IrqEvent;
use crate::lifecycle::Bindings;
use crate::ops::PlatformHandle;
use crate::regs::{RegisterIo, RegisterLayout, Registers};
use crate::uaccess::REG_BYTES;

/// 描述符的静态属性
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// 平台句柄
    pub handle: PlatformHandle,
    /// minor 号
    pub minor: u32,
    /// 设备号
    pub devno: u64,
    /// 设备名（`gpiok<minor>`）
    pub name: String,
    /// 中断线
    pub irq_line: usize,
    /// 本实例关心的引脚中断掩码
    pub irq_mask: u32,
    /// 映射区间大小
    pub size: usize,
    /// 阻塞读是否去抖
    pub debounce: bool,
}

/// 一个已绑定的 GPIO 实例
pub struct GpioDevice {
    info: DeviceInfo,
    io: Arc<dyn RegisterIo>,
    layout: RegisterLayout,
    event: IrqEvent,
    dead: AtomicBool,
    users: AtomicUsize,
    in_isr: AtomicUsize,
    bindings: SpinLock<Option<Bindings>>,
}

/// “在用”登记，`Drop` 时注销
pub struct UseGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for UseGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GpioDevice {
    pub(crate) fn new(info: DeviceInfo, io: Arc<dyn RegisterIo>, layout: RegisterLayout) -> Self {
        Self {
            info,
            io,
            layout,
            event: IrqEvent::new(),
            dead: AtomicBool::new(false),
            users: AtomicUsize::new(0),
            in_isr: AtomicUsize::new(0),
            bindings: SpinLock::new(None),
        }
    }

    /// 静态属性
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// minor 号
    pub fn minor(&self) -> u32 {
        self.info.minor
    }

    /// 设备名
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// 类型化寄存器访问器
    pub fn registers(&self) -> Registers<'_> {
        Registers::new(&*self.io, self.layout)
    }

    /// 中断事件
    pub fn event(&self) -> &IrqEvent {
        &self.event
    }

    /// 累计中断次数
    pub fn irq_count(&self) -> u64 {
        self.event.irq_count()
    }

    /// 是否已被移除
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// 登记一次寄存器访问
    pub fn enter(&self) -> Result<UseGuard<'_>, GpioError> {
        self.users.fetch_add(1, Ordering::SeqCst);
        let guard = UseGuard {
            counter: &self.users,
        };
        if self.is_dead() {
            return Err(GpioError::NoDevice);
        }
        Ok(guard)
    }

    /// 检查 `offset` 处的 4 字节访问是否合法
    pub fn check_offset(&self, offset: usize) -> Result<(), GpioError> {
        match offset.checked_add(REG_BYTES) {
            Some(end) if end <= self.info.size => {}
            _ => return Err(GpioError::OutOfRange),
        }
        if offset % REG_BYTES != 0 {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    // ========== 中断侧 ==========

    /// 中断处理
    ///
    /// 关闭本实例的全局和引脚中断（挂起位保持不动，留给读者查看），
    /// 记录事件并唤醒等待者。重新打开中断由消费事件的读者完成。
    pub fn handle_irq(&self) -> bool {
        self.in_isr.fetch_add(1, Ordering::SeqCst);
        let _isr = UseGuard {
            counter: &self.in_isr,
        };
        if self.is_dead() {
            return false;
        }
        let regs = self.registers();
        regs.global_interrupt_disable();
        regs.pin_interrupt_disable(self.info.irq_mask);
        self.event.signal();
        log::trace!("{}: irq {} serviced", self.info.name, self.info.irq_line);
        true
    }

    // ========== 调用侧 ==========

    /// 非阻塞读：直接返回寄存器当前值，不触碰事件状态和中断使能
    pub fn read_now(&self, offset: usize) -> Result<u32, GpioError> {
        let _use = self.enter()?;
        self.check_offset(offset)?;
        Ok(self.registers().read_raw(offset))
    }

    /// 阻塞读
    ///
    /// 等待并消费一次中断事件，读取 `offset` 处的寄存器，
    /// 然后（可选）等待输入回到静止电平，确认挂起位并重新打开引脚和全局中断。
    ///
    /// `abort` 返回 `Some(err)` 时放弃等待，事件不被消费，中断保持关闭。
    pub fn read_event<A>(&self, offset: usize, mut abort: A) -> Result<u32, GpioError>
    where
        A: FnMut() -> Option<GpioError>,
    {
        let _use = self.enter()?;
        self.check_offset(offset)?;

        self.event.wait_and_consume(|| {
            if self.is_dead() {
                return Some(GpioError::NoDevice);
            }
            abort()
        })?;

        let regs = self.registers();
        let value = regs.read_raw(offset);

        if self.info.debounce {
            // 输入卡住时会一直等在这里，此后不会再有中断
            while regs.read_inputs() & self.info.irq_mask != 0 && !self.is_dead() {
                cpu_relax();
            }
        }

        regs.ack_pin_interrupts(self.info.irq_mask);
        regs.pin_interrupt_enable(self.info.irq_mask);
        regs.global_interrupt_enable();
        log::trace!("{}: event consumed, value {:#x}", self.info.name, value);
        Ok(value)
    }

    /// 写寄存器
    pub fn write(&self, offset: usize, value: u32) -> Result<(), GpioError> {
        let _use = self.enter()?;
        self.check_offset(offset)?;
        self.registers().write_raw(offset, value);
        Ok(())
    }

    /// poll 查询
    pub fn poll<'a>(&'a self, table: Option<&mut PollTable<'a>>) -> Result<bool, GpioError> {
        let _use = self.enter()?;
        Ok(self.event.poll(table))
    }

    // ========== 拆除 ==========

    pub(crate) fn install(&self, bindings: Bindings) {
        *self.bindings.lock() = Some(bindings);
    }

    pub(crate) fn take_bindings(&self) -> Option<Bindings> {
        self.bindings.lock().take()
    }

    /// 标记为已移除并唤醒所有等待者，然后等待在用的调用全部退出
    pub(crate) fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
        self.event.wake_all();
        while self.users.load(Ordering::SeqCst) != 0 {
            self.event.wake_all();
            cpu_relax();
        }
    }

    /// 等待正在执行的中断处理函数返回
    pub(crate) fn wait_isr_quiesce(&self) {
        while self.in_isr.load(Ordering::SeqCst) != 0 {
            cpu_relax();
        }
    }
}

impl core::fmt::Debug for GpioDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpioDevice")
            .field("info", &self.info)
            .field("dead", &self.is_dead())
            .field("irq_count", &self.irq_count())
            .finish()
    }
}

impl Drop for GpioDevice {
    fn drop(&mut self) {
        if self.bindings.get_mut().is_some() {
            log::warn!("{}: dropped while still bound", self.info.name);
        }
    }
}
