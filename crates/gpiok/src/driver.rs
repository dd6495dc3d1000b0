//! 驱动入口
//!
//! [`GpioDriver`] 聚合平台服务、配置、注册表以及 minor 号和物理区间的分配状态，
//! 对外提供 attach/detach（见 `lifecycle`）、open 和中断分发。

use alloc::sync::Arc;

use crate::GpioError;
use crate::cdev::GpioFile;
use crate::config::GpioConfig;
use crate::descriptor::GpioDevice;
use crate::devno::{MinorAllocator, major, minor};
use crate::ops::PlatformOps;
use crate::registry::DeviceRegistry;
use crate::resource::MemRegionTable;
use crate::uapi::OpenFlags;

/// GPIO 字符设备驱动
pub struct GpioDriver {
    pub(crate) platform: Arc<dyn PlatformOps>,
    pub(crate) config: GpioConfig,
    pub(crate) registry: DeviceRegistry,
    pub(crate) regions: Arc<MemRegionTable>,
    pub(crate) minors: Arc<MinorAllocator>,
}

impl GpioDriver {
    /// 创建驱动，此时尚未绑定任何实例
    pub fn new(platform: Arc<dyn PlatformOps>, config: GpioConfig) -> Self {
        Self {
            platform,
            config,
            registry: DeviceRegistry::new(config.max_devices),
            regions: Arc::new(MemRegionTable::new()),
            minors: Arc::new(MinorAllocator::new(config.max_devices)),
        }
    }

    /// 配置
    pub fn config(&self) -> &GpioConfig {
        &self.config
    }

    /// 设备注册表
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// 打开设备号 `devno` 对应的设备
    pub fn open(&self, devno: u64, flags: OpenFlags) -> Result<GpioFile, GpioError> {
        if major(devno) != self.config.major {
            return Err(GpioError::NoDevice);
        }
        let device = self
            .registry
            .find_by_minor(minor(devno))
            .ok_or(GpioError::NoDevice)?;
        if device.is_dead() {
            return Err(GpioError::NoDevice);
        }
        log::debug!("{}: open ({:?})", device.name(), flags);
        Ok(GpioFile::new(
            device,
            flags,
            self.platform.clone(),
            self.config.read_timeout_ms,
        ))
    }

    /// 中断分发入口
    ///
    /// 宿主在中断线 `line` 触发时调用；返回 `false` 表示该线不属于本驱动。
    /// 描述符只在注册表读锁内借用，中断侧不持有也不释放它。
    pub fn try_handle_interrupt(&self, line: usize) -> bool {
        match self.registry.with_irq_line(line, GpioDevice::handle_irq) {
            Some(handled) => handled,
            None => {
                log::warn!("gpiok: interrupt on unknown line {line}");
                false
            }
        }
    }

    /// 按 minor 号查找设备
    pub fn device(&self, minor: u32) -> Option<Arc<GpioDevice>> {
        self.registry.find_by_minor(minor)
    }
}

impl Drop for GpioDriver {
    fn drop(&mut self) {
        self.detach_all();
    }
}
