//! 中断同步的 GPIO 字符设备驱动
//!
//! 面向 SoC 上内存映射 GPIO 外设的驱动核心：
//!
//! - [`regs`] - 寄存器访问层（读-改-写辅助函数，可在中断上下文调用）
//! - [`GpioDevice`] - 设备描述符：映射、中断线绑定与同步状态
//! - [`DeviceRegistry`] - 按平台句柄 / minor / 中断线查找描述符
//! - [`IrqEvent`] - 中断处理函数与阻塞读者之间的事件传递
//! - [`GpioFile`] - 字符设备接口（lseek/read/write/poll）
//! - [`GpioDriver`] - attach/detach 生命周期管理与中断分发
//!
//! # 使用方式
//!
//! 宿主内核实现 [`PlatformOps`]，注册 `sync` 的架构操作，然后：
//!
//! 1. 用 [`GpioDriver::new`] 创建驱动；
//! 2. 对每个枚举到的硬件实例调用 [`GpioDriver::attach`]；
//! 3. 中断线触发时调用 [`GpioDriver::try_handle_interrupt`]；
//! 4. 打开设备节点时调用 [`GpioDriver::open`]。

#![no_std]

extern crate alloc;

pub mod config;
pub mod devno;
pub mod error;
pub mod regs;
pub mod uaccess;
pub mod uapi;

mod cdev;
mod descriptor;
mod driver;
mod event;
mod lifecycle;
mod ops;
mod registry;
mod resource;

#[cfg(test)]
mod tests;

pub use cdev::{CancelToken, GpioFile};
pub use config::GpioConfig;
pub use descriptor::{DeviceInfo, GpioDevice, UseGuard};
pub use devno::{major, makedev, minor};
pub use driver::GpioDriver;
pub use error::GpioError;
pub use event::IrqEvent;
pub use lifecycle::{ArmedInterrupts, DeviceNode, IrqBinding, Mapping};
pub use ops::{PlatformHandle, PlatformOps, PlatformResource};
pub use registry::DeviceRegistry;
pub use resource::{MemRegionTable, RegionReservation};
pub use uapi::{OpenFlags, PollEvents, SeekWhence};
