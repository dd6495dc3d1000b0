//! 平台服务接口
//!
//! 驱动需要的外部能力（设备枚举、映射、中断线、设备节点、时钟）通过
//! [`PlatformOps`] 抽象，宿主内核实现后在构造 [`crate::GpioDriver`] 时传入。

use alloc::sync::Arc;
use core::ops::Range;

use crate::GpioError;
use crate::regs::RegisterIo;

/// 平台设备句柄
///
/// 由枚举机制分配，驱动只把它当作不透明的键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformHandle(pub usize);

/// 一个硬件实例的资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResource {
    /// 寄存器物理区间
    pub regs: Range<usize>,
    /// 中断线
    pub irq_line: usize,
}

/// 平台服务
pub trait PlatformOps: Send + Sync {
    // ========== 设备枚举 ==========

    /// 查询 `handle` 对应的寄存器区间和中断线
    fn resource(&self, handle: PlatformHandle) -> Option<PlatformResource>;

    // ========== 映射 ==========

    /// 把物理区间映射为可访问的寄存器块
    fn ioremap(&self, regs: Range<usize>) -> Result<Arc<dyn RegisterIo>, GpioError>;

    /// 解除映射
    fn iounmap(&self, regs: Range<usize>);

    // ========== 中断线 ==========

    /// 注册中断线
    ///
    /// 注册成功后，该线触发时宿主需调用 [`crate::GpioDriver::try_handle_interrupt`]。
    fn request_irq(&self, line: usize, name: &str) -> Result<(), GpioError>;

    /// 注销中断线
    ///
    /// 返回时该线上不会再有新的处理函数调用开始。
    fn free_irq(&self, line: usize);

    // ========== 设备节点 ==========

    /// 创建设备节点
    fn create_node(&self, name: &str, devno: u64) -> Result<(), GpioError>;

    /// 删除设备节点
    fn remove_node(&self, devno: u64);

    // ========== 时间 ==========

    /// 单调时钟（毫秒）
    fn uptime_ms(&self) -> u64;
}
