//! 寄存器访问层
//!
//! 固定布局的 7 个 32 位寄存器：
//!
//! | 偏移 | 寄存器 | 访问 | 含义 |
//! |---|---|---|---|
//! | 0x00 | mode | R/W | 1 = 输出，0 = 输入 |
//! | 0x04 | write | R/W | 输出电平 |
//! | 0x08 | read | R | 输入电平 |
//! | 0x0C | gies | R/W | bit0 = 全局中断使能，bit1 = 存在挂起中断（只读） |
//! | 0x10 | pie | R/W | 引脚中断使能掩码 |
//! | 0x14 | irq | R | 引脚中断挂起掩码 |
//! | 0x18 | iack | W | 写 1 清除对应挂起位 |
//!
//! 所有操作都不加锁、不分配、不阻塞，可以在中断上下文中调用。
//! 对 mode / write / pie 的修改都是读-改-写，不影响掩码之外的引脚。

use core::ptr::NonNull;

/// 32 位寄存器读写接口
///
/// 真实硬件通过 [`MmioRegion`] 实现；测试中由模拟寄存器块实现。
pub trait RegisterIo: Send + Sync {
    /// 读取 `offset` 处的寄存器
    fn read32(&self, offset: usize) -> u32;

    /// 写入 `offset` 处的寄存器
    fn write32(&self, offset: usize, value: u32);
}

/// ioremap 得到的一段 MMIO 区间
pub struct MmioRegion {
    base: NonNull<u32>,
    size: usize,
}

// SAFETY: MMIO 访问都是 volatile 的单次 32 位读写，寄存器本身可被多个 CPU 并发访问
unsafe impl Send for MmioRegion {}
// SAFETY: 同上
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// 由虚拟基址和大小构造
    ///
    /// # Safety
    /// `vaddr` 必须是已映射、4 字节对齐、至少 `size` 字节的设备内存，
    /// 且在本对象存活期间保持有效。
    pub unsafe fn new(vaddr: usize, size: usize) -> Option<Self> {
        if vaddr % 4 != 0 {
            return None;
        }
        NonNull::new(vaddr as *mut u32).map(|base| Self { base, size })
    }

    /// 虚拟基址
    pub fn vaddr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// 区间大小
    pub fn size(&self) -> usize {
        self.size
    }

    fn reg(&self, offset: usize) -> Option<*mut u32> {
        let in_range = offset.checked_add(4).is_some_and(|end| end <= self.size);
        (offset % 4 == 0 && in_range)
            // SAFETY: 偏移已检查在区间内
            .then(|| unsafe { self.base.as_ptr().byte_add(offset) })
    }
}

impl RegisterIo for MmioRegion {
    fn read32(&self, offset: usize) -> u32 {
        match self.reg(offset) {
            // SAFETY: 地址在映射区间内且对齐
            Some(ptr) => unsafe { ptr.read_volatile() },
            None => 0,
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        if let Some(ptr) = self.reg(offset) {
            // SAFETY: 地址在映射区间内且对齐
            unsafe { ptr.write_volatile(value) }
        }
    }
}

/// 寄存器偏移表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    /// 方向寄存器
    pub mode: usize,
    /// 输出寄存器
    pub write: usize,
    /// 输入寄存器
    pub read: usize,
    /// 全局中断使能/状态寄存器
    pub global: usize,
    /// 引脚中断使能寄存器
    pub pin_enable: usize,
    /// 引脚中断挂起寄存器
    pub pending: usize,
    /// 引脚中断确认寄存器
    pub ack: usize,
}

impl RegisterLayout {
    /// 标准布局
    pub const STANDARD: Self = Self {
        mode: 0x00,
        write: 0x04,
        read: 0x08,
        global: 0x0C,
        pin_enable: 0x10,
        pending: 0x14,
        ack: 0x18,
    };

    /// 全局寄存器：中断使能位
    pub const GLOBAL_ENABLE: u32 = 1 << 0;
    /// 全局寄存器：存在挂起中断
    pub const GLOBAL_PENDING: u32 = 1 << 1;
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// 引脚方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 输入
    Input,
    /// 输出
    Output,
}

/// 引脚电平
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// 低
    Low,
    /// 高
    High,
}

/// 一个寄存器块的类型化访问器
pub struct Registers<'a> {
    io: &'a dyn RegisterIo,
    layout: RegisterLayout,
}

impl<'a> Registers<'a> {
    /// 以给定布局包装寄存器块
    pub fn new(io: &'a dyn RegisterIo, layout: RegisterLayout) -> Self {
        Self { io, layout }
    }

    /// 布局
    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    #[inline]
    fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.io.read32(offset);
        self.io.write32(offset, f(value));
    }

    /// 设置 `mask` 选中引脚的方向
    pub fn set_mode(&self, mask: u32, direction: Direction) {
        self.modify(self.layout.mode, |v| match direction {
            Direction::Output => v | mask,
            Direction::Input => v & !mask,
        });
    }

    /// 设置 `mask` 选中引脚的输出电平
    pub fn set_value(&self, mask: u32, level: Level) {
        self.modify(self.layout.write, |v| match level {
            Level::High => v | mask,
            Level::Low => v & !mask,
        });
    }

    /// 翻转 `mask` 选中引脚的输出电平
    pub fn toggle(&self, mask: u32) {
        self.modify(self.layout.write, |v| v ^ mask);
    }

    /// 读取 `mask` 选中的输入：任意一位为 1 即为高
    pub fn get_value(&self, mask: u32) -> Level {
        if self.read_inputs() & mask == 0 {
            Level::Low
        } else {
            Level::High
        }
    }

    /// 输入寄存器原值
    pub fn read_inputs(&self) -> u32 {
        self.io.read32(self.layout.read)
    }

    /// 打开全局中断
    pub fn global_interrupt_enable(&self) {
        self.io.write32(self.layout.global, RegisterLayout::GLOBAL_ENABLE);
    }

    /// 关闭全局中断
    pub fn global_interrupt_disable(&self) {
        self.io.write32(self.layout.global, 0);
    }

    /// 全局中断是否打开
    pub fn is_global_interrupt_enabled(&self) -> bool {
        self.io.read32(self.layout.global) & RegisterLayout::GLOBAL_ENABLE != 0
    }

    /// 是否存在挂起的中断
    pub fn interrupt_pending(&self) -> bool {
        self.io.read32(self.layout.global) & RegisterLayout::GLOBAL_PENDING != 0
    }

    /// 打开 `mask` 选中引脚的中断
    pub fn pin_interrupt_enable(&self, mask: u32) {
        self.modify(self.layout.pin_enable, |v| v | mask);
    }

    /// 关闭 `mask` 选中引脚的中断
    pub fn pin_interrupt_disable(&self, mask: u32) {
        self.modify(self.layout.pin_enable, |v| v & !mask);
    }

    /// 引脚中断使能掩码
    pub fn enabled_pin_interrupts(&self) -> u32 {
        self.io.read32(self.layout.pin_enable)
    }

    /// 挂起的引脚中断
    pub fn pending_pin_interrupts(&self) -> u32 {
        self.io.read32(self.layout.pending)
    }

    /// 确认 `mask` 选中的挂起中断
    pub fn ack_pin_interrupts(&self, mask: u32) {
        self.io.write32(self.layout.ack, mask);
    }

    /// 读任意偏移
    pub fn read_raw(&self, offset: usize) -> u32 {
        self.io.read32(offset)
    }

    /// 写任意偏移
    pub fn write_raw(&self, offset: usize, value: u32) {
        self.io.write32(offset, value);
    }
}
