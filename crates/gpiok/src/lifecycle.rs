//! 生命周期管理：attach / detach
//!
//! attach 的每一步都由一个 RAII guard 表示，失败时已完成的步骤按相反顺序自动撤销：
//!
//! 1. 分配 minor 号（[`MinorReservation`]）
//! 2. 创建设备节点（[`DeviceNode`]）
//! 3. 查询并独占寄存器物理区间（[`RegionReservation`]）
//! 4. 映射寄存器（[`Mapping`]）
//! 5. 注册中断线（[`IrqBinding`]）
//! 6. 初始化同步状态（随描述符创建）
//! 7. 打开本实例的中断掩码（[`ArmedInterrupts`]）
//! 8. 加入注册表
//!
//! detach 严格按相反顺序拆除，并保证拆除映射前没有正在执行的中断处理函数。

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::ops::Range;

use crate::GpioError;
use crate::config::{DEVICE_NAME_PREFIX, DRIVER_NAME};
use crate::descriptor::{DeviceInfo, GpioDevice};
use crate::devno::{MinorReservation, makedev};
use crate::driver::GpioDriver;
use crate::ops::{PlatformHandle, PlatformOps};
use crate::regs::{RegisterIo, RegisterLayout, Registers};
use crate::resource::RegionReservation;

/// 已创建的设备节点
pub struct DeviceNode {
    platform: Arc<dyn PlatformOps>,
    devno: u64,
}

impl DeviceNode {
    fn create(platform: &Arc<dyn PlatformOps>, name: &str, devno: u64) -> Result<Self, GpioError> {
        platform.create_node(name, devno)?;
        Ok(Self {
            platform: platform.clone(),
            devno,
        })
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        self.platform.remove_node(self.devno);
    }
}

/// 已映射的寄存器区间
pub struct Mapping {
    platform: Arc<dyn PlatformOps>,
    range: Range<usize>,
    io: Arc<dyn RegisterIo>,
}

impl Mapping {
    fn map(platform: &Arc<dyn PlatformOps>, range: Range<usize>) -> Result<Self, GpioError> {
        let io = platform.ioremap(range.clone())?;
        Ok(Self {
            platform: platform.clone(),
            range,
            io,
        })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        self.platform.iounmap(self.range.clone());
    }
}

/// 已注册的中断线
pub struct IrqBinding {
    platform: Arc<dyn PlatformOps>,
    line: usize,
}

impl IrqBinding {
    fn request(platform: &Arc<dyn PlatformOps>, line: usize) -> Result<Self, GpioError> {
        platform.request_irq(line, DRIVER_NAME)?;
        Ok(Self {
            platform: platform.clone(),
            line,
        })
    }
}

impl Drop for IrqBinding {
    fn drop(&mut self) {
        self.platform.free_irq(self.line);
    }
}

/// 已在硬件上打开的中断掩码，`Drop` 时关闭
pub struct ArmedInterrupts {
    io: Arc<dyn RegisterIo>,
    layout: RegisterLayout,
    mask: u32,
}

impl ArmedInterrupts {
    fn arm(io: &Arc<dyn RegisterIo>, layout: RegisterLayout, mask: u32) -> Self {
        let regs = Registers::new(&**io, layout);
        regs.pin_interrupt_enable(mask);
        regs.global_interrupt_enable();
        Self {
            io: io.clone(),
            layout,
            mask,
        }
    }
}

impl Drop for ArmedInterrupts {
    fn drop(&mut self) {
        let regs = Registers::new(&*self.io, self.layout);
        regs.global_interrupt_disable();
        regs.pin_interrupt_disable(self.mask);
    }
}

/// 一个实例持有的全部资源
pub(crate) struct Bindings {
    armed: ArmedInterrupts,
    irq: IrqBinding,
    mapping: Mapping,
    region: RegionReservation,
    node: DeviceNode,
    minor: MinorReservation,
}

/// attach 失败时记录是哪一步
fn step<T>(name: &str, what: &str, res: Result<T, GpioError>) -> Result<T, GpioError> {
    res.inspect_err(|e| log::error!("{name}: attach failed at {what}: {e}"))
}

impl GpioDriver {
    /// 绑定 `handle` 对应的硬件实例
    pub fn attach(&self, handle: PlatformHandle) -> Result<Arc<GpioDevice>, GpioError> {
        if self.registry.find_by_handle(handle).is_some() {
            return Err(GpioError::ResourceUnavailable);
        }
        let platform = &self.platform;

        let minor = step(DRIVER_NAME, "minor", self.minors.reserve())?;
        let name: String = format!("{DEVICE_NAME_PREFIX}{}", minor.minor());
        let devno = makedev(self.config.major, minor.minor());

        let node = step(
            &name,
            "device node",
            DeviceNode::create(platform, &name, devno),
        )?;

        let resource = step(
            &name,
            "resource lookup",
            platform.resource(handle).ok_or(GpioError::NoDevice),
        )?;
        let region = step(&name, "region", self.regions.claim(resource.regs.clone()))?;

        let mapping = step(
            &name,
            "ioremap",
            Mapping::map(platform, resource.regs.clone()),
        )?;

        let irq = step(
            &name,
            "irq",
            IrqBinding::request(platform, resource.irq_line),
        )?;

        let info = DeviceInfo {
            handle,
            minor: minor.minor(),
            devno,
            name,
            irq_line: resource.irq_line,
            irq_mask: self.config.irq_mask,
            size: resource.regs.len(),
            debounce: self.config.debounce,
        };
        let device = Arc::new(GpioDevice::new(
            info,
            mapping.io.clone(),
            RegisterLayout::STANDARD,
        ));

        let armed = ArmedInterrupts::arm(
            &mapping.io,
            RegisterLayout::STANDARD,
            self.config.irq_mask,
        );

        step(
            device.name(),
            "registry",
            self.registry.bind(handle, device.clone()),
        )?;

        device.install(Bindings {
            armed,
            irq,
            mapping,
            region,
            node,
            minor,
        });
        log::info!(
            "{}: bound to handle {} (regs {:#x}..{:#x}, irq {})",
            device.name(),
            handle.0,
            resource.regs.start,
            resource.regs.end,
            resource.irq_line
        );
        Ok(device)
    }

    /// 解除 `handle` 对应实例的绑定
    pub fn detach(&self, handle: PlatformHandle) -> Result<(), GpioError> {
        let device = self
            .registry
            .find_by_handle(handle)
            .ok_or(GpioError::NoDevice)?;
        let bindings = device.take_bindings().ok_or(GpioError::NoDevice)?;

        device.kill();

        let Bindings {
            armed,
            irq,
            mapping,
            region,
            node,
            minor,
        } = bindings;
        drop(armed);
        drop(irq);
        device.wait_isr_quiesce();
        drop(mapping);
        drop(region);
        drop(node);
        self.registry.unbind(handle);
        drop(minor);

        log::info!(
            "{}: detached (handle {}, {} interrupts)",
            device.name(),
            handle.0,
            device.irq_count()
        );
        Ok(())
    }

    /// 解除所有实例的绑定
    pub fn detach_all(&self) {
        for handle in self.registry.handles() {
            if let Err(e) = self.detach(handle) {
                log::warn!("{DRIVER_NAME}: detach of handle {} failed: {e}", handle.0);
            }
        }
    }
}
