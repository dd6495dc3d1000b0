//! 驱动配置
//!
//! 编译期默认值以常量给出，运行期配置通过 [`GpioConfig`] 在构造驱动时传入。

/// 驱动名称（注册中断线时使用）
pub const DRIVER_NAME: &str = "gpiok";

/// 设备节点名前缀，完整名称为 `gpiok<minor>`
pub const DEVICE_NAME_PREFIX: &str = "gpiok";

/// 可同时绑定的最大设备数
pub const MAX_NUM_OF_DEVICES: usize = 15;

/// 默认关心的引脚中断掩码（全部引脚）
pub const DEFAULT_IRQ_MASK: u32 = 0xFFFF_FFFF;

/// 默认字符设备 major 号
pub const GPIOK_MAJOR: u32 = 240;

/// 寄存器块大小（7 个 32 位寄存器）
pub const REGISTER_SPAN: usize = 0x1C;

/// 运行期配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioConfig {
    /// 注册表容量
    pub max_devices: usize,
    /// 每个实例使能并确认的引脚中断掩码
    pub irq_mask: u32,
    /// 字符设备 major 号
    pub major: u32,
    /// 阻塞读是否等待输入回到静止电平后才确认中断
    pub debounce: bool,
    /// 阻塞读超时（毫秒），`None` 表示无限等待
    pub read_timeout_ms: Option<u64>,
}

impl GpioConfig {
    /// 默认配置
    pub const fn new() -> Self {
        Self {
            max_devices: MAX_NUM_OF_DEVICES,
            irq_mask: DEFAULT_IRQ_MASK,
            major: GPIOK_MAJOR,
            debounce: true,
            read_timeout_ms: None,
        }
    }

    /// 设置注册表容量
    pub const fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = max_devices;
        self
    }

    /// 设置引脚中断掩码
    pub const fn with_irq_mask(mut self, irq_mask: u32) -> Self {
        self.irq_mask = irq_mask;
        self
    }

    /// 设置 major 号
    pub const fn with_major(mut self, major: u32) -> Self {
        self.major = major;
        self
    }

    /// 打开或关闭去抖等待
    pub const fn with_debounce(mut self, debounce: bool) -> Self {
        self.debounce = debounce;
        self
    }

    /// 设置阻塞读超时
    pub const fn with_read_timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.read_timeout_ms = timeout;
        self
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self::new()
    }
}
