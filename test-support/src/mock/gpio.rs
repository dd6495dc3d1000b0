//! 模拟的 GPIO 寄存器块
//!
//! 按硬件语义模拟 7 个 32 位寄存器：
//!
//! | 偏移 | 寄存器 | 模拟行为 |
//! |---|---|---|
//! | 0x00 | mode | 读写 |
//! | 0x04 | write | 读写 |
//! | 0x08 | read | 只读，值由测试通过 [`MockGpioRegs::set_input`] / [`MockGpioRegs::press`] 驱动 |
//! | 0x0C | gies | bit0 读写；bit1 只读，有挂起中断时为 1 |
//! | 0x10 | pie | 读写 |
//! | 0x14 | irq | 只读，挂起位 |
//! | 0x18 | iack | 只写，写 1 清除对应挂起位 |

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// 寄存器偏移（硬件手册）
pub mod offsets {
    pub const MODE: usize = 0x00;
    pub const WRITE: usize = 0x04;
    pub const READ: usize = 0x08;
    pub const GIES: usize = 0x0C;
    pub const PIE: usize = 0x10;
    pub const IRQ: usize = 0x14;
    pub const IACK: usize = 0x18;
    /// 寄存器块大小
    pub const SPAN: usize = 0x1C;
}

const NEVER: usize = usize::MAX;

/// 模拟寄存器块
#[derive(Debug)]
pub struct MockGpioRegs {
    mode: AtomicU32,
    write: AtomicU32,
    input: AtomicU32,
    /// 输入在被读取多少次后自动回到 0（按钮松开）
    release_after: AtomicUsize,
    input_reads: AtomicUsize,
    global_enable: AtomicU32,
    pie: AtomicU32,
    pending: AtomicU32,
    last_ack: AtomicU32,
    ack_count: AtomicUsize,
}

impl Default for MockGpioRegs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGpioRegs {
    pub const fn new() -> Self {
        Self {
            mode: AtomicU32::new(0),
            write: AtomicU32::new(0),
            input: AtomicU32::new(0),
            release_after: AtomicUsize::new(NEVER),
            input_reads: AtomicUsize::new(0),
            global_enable: AtomicU32::new(0),
            pie: AtomicU32::new(0),
            pending: AtomicU32::new(0),
            last_ack: AtomicU32::new(0),
            ack_count: AtomicUsize::new(0),
        }
    }

    /// 驱动侧读寄存器
    pub fn read32(&self, offset: usize) -> u32 {
        match offset {
            offsets::MODE => self.mode.load(Ordering::SeqCst),
            offsets::WRITE => self.write.load(Ordering::SeqCst),
            offsets::READ => self.read_input(),
            offsets::GIES => {
                let pending_any = (self.pending.load(Ordering::SeqCst) != 0) as u32;
                (self.global_enable.load(Ordering::SeqCst) & 1) | (pending_any << 1)
            }
            offsets::PIE => self.pie.load(Ordering::SeqCst),
            offsets::IRQ => self.pending.load(Ordering::SeqCst),
            _ => 0,
        }
    }

    /// 驱动侧写寄存器
    pub fn write32(&self, offset: usize, value: u32) {
        match offset {
            offsets::MODE => self.mode.store(value, Ordering::SeqCst),
            offsets::WRITE => self.write.store(value, Ordering::SeqCst),
            offsets::GIES => self.global_enable.store(value & 1, Ordering::SeqCst),
            offsets::PIE => self.pie.store(value, Ordering::SeqCst),
            offsets::IACK => {
                self.pending.fetch_and(!value, Ordering::SeqCst);
                self.last_ack.store(value, Ordering::SeqCst);
                self.ack_count.fetch_add(1, Ordering::SeqCst);
            }
            // read / irq 只读
            _ => {}
        }
    }

    fn read_input(&self) -> u32 {
        let reads = self.input_reads.fetch_add(1, Ordering::SeqCst) + 1;
        let release_after = self.release_after.load(Ordering::SeqCst);
        if release_after != NEVER && reads > release_after {
            self.input.store(0, Ordering::SeqCst);
            self.release_after.store(NEVER, Ordering::SeqCst);
        }
        self.input.load(Ordering::SeqCst)
    }

    /// 设置输入引脚电平并一直保持
    pub fn set_input(&self, value: u32) {
        self.release_after.store(NEVER, Ordering::SeqCst);
        self.input_reads.store(0, Ordering::SeqCst);
        self.input.store(value, Ordering::SeqCst);
    }

    /// 模拟按下按钮：接下来 `reads` 次读取返回 `value`，之后回到 0
    pub fn press(&self, value: u32, reads: usize) {
        self.input_reads.store(0, Ordering::SeqCst);
        self.input.store(value, Ordering::SeqCst);
        self.release_after.store(reads, Ordering::SeqCst);
    }

    /// 硬件事件：置位挂起位，返回中断线是否会被拉起
    pub fn raise(&self, mask: u32) -> bool {
        self.pending.fetch_or(mask, Ordering::SeqCst);
        self.irq_asserted()
    }

    /// 中断线当前是否有效（全局使能且存在已使能的挂起位）
    pub fn irq_asserted(&self) -> bool {
        self.global_enabled()
            && self.pending.load(Ordering::SeqCst) & self.pie.load(Ordering::SeqCst) != 0
    }

    pub fn mode(&self) -> u32 {
        self.mode.load(Ordering::SeqCst)
    }

    pub fn output(&self) -> u32 {
        self.write.load(Ordering::SeqCst)
    }

    pub fn input(&self) -> u32 {
        self.input.load(Ordering::SeqCst)
    }

    pub fn input_reads(&self) -> usize {
        self.input_reads.load(Ordering::SeqCst)
    }

    pub fn global_enabled(&self) -> bool {
        self.global_enable.load(Ordering::SeqCst) & 1 != 0
    }

    pub fn pie(&self) -> u32 {
        self.pie.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn last_ack(&self) -> u32 {
        self.last_ack.load(Ordering::SeqCst)
    }

    pub fn ack_count(&self) -> usize {
        self.ack_count.load(Ordering::SeqCst)
    }
}
