//! 设备注册表
//!
//! 平台句柄 / minor 号 / 中断线 到 [`GpioDevice`] 的映射，三种键各自唯一。
//!
//! 注册表只在 attach/detach 时修改，查找则很频繁（包括中断处理路径），
//! 因此使用读写自旋锁：查找只取读锁，不关中断、不分配；
//! 写者持锁期间关闭本地中断，同一 CPU 上的中断处理不会与之死锁。

use alloc::sync::Arc;
use alloc::vec::Vec;
use sync::RwLock;

use crate::GpioError;
use crate::descriptor::GpioDevice;
use crate::ops::PlatformHandle;

/// 设备注册表
pub struct DeviceRegistry {
    entries: RwLock<Vec<(PlatformHandle, Arc<GpioDevice>)>>,
    capacity: usize,
}

impl DeviceRegistry {
    /// 创建容量为 `capacity` 的注册表
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// 绑定 `handle` 到 `device`
    ///
    /// 注册表已满，或句柄 / minor / 中断线与已有条目冲突时失败。
    pub fn bind(&self, handle: PlatformHandle, device: Arc<GpioDevice>) -> Result<(), GpioError> {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            return Err(GpioError::ResourceUnavailable);
        }
        let info = device.info();
        if entries.iter().any(|(h, d)| {
            *h == handle || d.minor() == info.minor || d.info().irq_line == info.irq_line
        }) {
            return Err(GpioError::ResourceUnavailable);
        }
        entries.push((handle, device));
        Ok(())
    }

    /// 解除绑定，返回被移除的设备
    pub fn unbind(&self, handle: PlatformHandle) -> Option<Arc<GpioDevice>> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|(h, _)| *h == handle)?;
        Some(entries.swap_remove(pos).1)
    }

    /// 按平台句柄查找
    pub fn find_by_handle(&self, handle: PlatformHandle) -> Option<Arc<GpioDevice>> {
        self.find(|h, _| h == handle)
    }

    /// 按 minor 号查找
    pub fn find_by_minor(&self, minor: u32) -> Option<Arc<GpioDevice>> {
        self.find(|_, d| d.minor() == minor)
    }

    /// 按中断线查找
    pub fn find_by_irq_line(&self, line: usize) -> Option<Arc<GpioDevice>> {
        self.find(|_, d| d.info().irq_line == line)
    }

    /// 在读锁内对中断线 `line` 上的设备调用 `f`（供中断处理路径使用）
    ///
    /// 不克隆 `Arc`：中断侧从不持有描述符的引用，
    /// 也就不会在中断上下文中释放描述符。解除绑定需要写锁，会等 `f` 返回。
    pub fn with_irq_line<R>(&self, line: usize, f: impl FnOnce(&GpioDevice) -> R) -> Option<R> {
        let entries = self.entries.read();
        entries
            .iter()
            .find(|(_, d)| d.info().irq_line == line)
            .map(|(_, d)| f(&**d))
    }

    fn find(
        &self,
        pred: impl Fn(PlatformHandle, &GpioDevice) -> bool,
    ) -> Option<Arc<GpioDevice>> {
        self.entries
            .read()
            .iter()
            .find(|(h, d)| pred(*h, d))
            .map(|(_, d)| d.clone())
    }

    /// 已绑定的设备数
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 所有已绑定设备的句柄
    pub fn handles(&self) -> Vec<PlatformHandle> {
        self.entries.read().iter().map(|(h, _)| *h).collect()
    }
}
