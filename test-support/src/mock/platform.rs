//! 平台服务的 Mock 实现
//!
//! 模拟“外部协作者”：平台设备枚举（handle -> 寄存器物理区间 + 中断线）、
//! ioremap、中断线注册、设备节点创建以及单调时钟。
//! 每个操作都会追加到事件日志中，便于断言调用顺序；
//! 通过 [`MockFault`] 可以让指定步骤失败。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::gpio::MockGpioRegs;

/// 可注入的失败点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    /// 资源查询失败
    Resource,
    /// 创建设备节点失败
    CreateNode,
    /// ioremap 失败
    IoRemap,
    /// 注册中断线失败
    RequestIrq,
    /// 允许同一中断线被重复注册（共享中断）
    SharedIrq,
}

/// 一个可被枚举到的硬件实例
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockResource {
    pub handle: usize,
    pub phys_start: usize,
    pub size: usize,
    pub irq_line: usize,
}

/// Mock 平台
#[derive(Default)]
pub struct MockPlatform {
    resources: Mutex<Vec<MockResource>>,
    blocks: Mutex<Vec<(usize, Arc<MockGpioRegs>)>>,
    faults: [AtomicBool; 5],
    irqs: Mutex<Vec<usize>>,
    nodes: Mutex<Vec<(String, u64)>>,
    mapped: Mutex<Vec<usize>>,
    events: Mutex<Vec<String>>,
    clock: AtomicU64,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个硬件实例，返回它的寄存器块
    ///
    /// 同一物理地址的多个实例共享同一个寄存器块。
    pub fn add_device(
        &self,
        handle: usize,
        phys_start: usize,
        size: usize,
        irq_line: usize,
    ) -> Arc<MockGpioRegs> {
        self.resources.lock().unwrap().push(MockResource {
            handle,
            phys_start,
            size,
            irq_line,
        });
        let mut blocks = self.blocks.lock().unwrap();
        if let Some((_, regs)) = blocks.iter().find(|(p, _)| *p == phys_start) {
            return regs.clone();
        }
        let regs = Arc::new(MockGpioRegs::new());
        blocks.push((phys_start, regs.clone()));
        regs
    }

    pub fn inject(&self, fault: MockFault) {
        self.faults[fault as usize].store(true, Ordering::SeqCst);
    }

    pub fn clear(&self, fault: MockFault) {
        self.faults[fault as usize].store(false, Ordering::SeqCst);
    }

    fn failing(&self, fault: MockFault) -> bool {
        self.faults[fault as usize].load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn resource(&self, handle: usize) -> Option<MockResource> {
        if self.failing(MockFault::Resource) {
            return None;
        }
        self.resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.handle == handle)
            .copied()
    }

    pub fn create_node(&self, name: &str, devno: u64) -> bool {
        if self.failing(MockFault::CreateNode) {
            return false;
        }
        self.nodes.lock().unwrap().push((name.to_string(), devno));
        self.record(format!("create_node {name}"));
        true
    }

    pub fn remove_node(&self, devno: u64) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(pos) = nodes.iter().position(|(_, d)| *d == devno) {
            let (name, _) = nodes.remove(pos);
            self.record(format!("remove_node {name}"));
        }
    }

    /// 映射物理区间，返回对应寄存器块
    pub fn map(&self, phys_start: usize, _size: usize) -> Option<Arc<MockGpioRegs>> {
        if self.failing(MockFault::IoRemap) {
            return None;
        }
        let regs = self.regs_at(phys_start)?;
        self.mapped.lock().unwrap().push(phys_start);
        self.record(format!("ioremap {phys_start:#x}"));
        Some(regs)
    }

    pub fn unmap(&self, phys_start: usize) {
        let mut mapped = self.mapped.lock().unwrap();
        if let Some(pos) = mapped.iter().position(|p| *p == phys_start) {
            mapped.remove(pos);
            self.record(format!("iounmap {phys_start:#x}"));
        }
    }

    pub fn request_irq(&self, line: usize, name: &str) -> bool {
        if self.failing(MockFault::RequestIrq) {
            return false;
        }
        let mut irqs = self.irqs.lock().unwrap();
        if irqs.contains(&line) && !self.failing(MockFault::SharedIrq) {
            return false;
        }
        irqs.push(line);
        self.record(format!("request_irq {line} {name}"));
        true
    }

    pub fn free_irq(&self, line: usize) {
        let mut irqs = self.irqs.lock().unwrap();
        if let Some(pos) = irqs.iter().position(|l| *l == line) {
            irqs.remove(pos);
            self.record(format!("free_irq {line}"));
        }
    }

    /// 单调时钟：每次读取前进 1 ms
    pub fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    pub fn regs_at(&self, phys_start: usize) -> Option<Arc<MockGpioRegs>> {
        self.blocks
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| *p == phys_start)
            .map(|(_, r)| r.clone())
    }

    pub fn irq_registered(&self, line: usize) -> bool {
        self.irqs.lock().unwrap().contains(&line)
    }

    /// `line` 当前被注册的次数
    pub fn irq_registrations(&self, line: usize) -> usize {
        self.irqs.lock().unwrap().iter().filter(|l| **l == line).count()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn mapped_count(&self) -> usize {
        self.mapped.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}
