//! 驱动错误类型
//!
//! 可通过 [`GpioError::to_errno()`] 转换为系统调用错误码。

/// 驱动错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// 偏移超出映射的寄存器范围 (-EFAULT)
    OutOfRange,
    /// 寄存器区间或中断线已被占用，或 attach 时资源不足 (-EBUSY)
    ResourceUnavailable,
    /// 与用户缓冲区之间的数据拷贝失败 (-EFAULT)
    UserTransferFault,
    /// 阻塞等待被外部取消 (-ERESTARTSYS)
    Cancelled,
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 设备不存在或已被移除 (-ENODEV)
    NoDevice,
    /// 阻塞读超时 (-ETIMEDOUT)
    TimedOut,
    /// 内存不足 (-ENOMEM)
    OutOfMemory,
}

impl GpioError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            GpioError::OutOfMemory => -12,
            GpioError::OutOfRange | GpioError::UserTransferFault => -14,
            GpioError::ResourceUnavailable => -16,
            GpioError::NoDevice => -19,
            GpioError::InvalidArgument => -22,
            GpioError::TimedOut => -110,
            GpioError::Cancelled => -512,
        }
    }
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            GpioError::OutOfRange => "register offset out of range",
            GpioError::ResourceUnavailable => "resource busy",
            GpioError::UserTransferFault => "bad user buffer",
            GpioError::Cancelled => "wait cancelled",
            GpioError::InvalidArgument => "invalid argument",
            GpioError::NoDevice => "no such device",
            GpioError::TimedOut => "timed out",
            GpioError::OutOfMemory => "out of memory",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(GpioError::OutOfRange.to_errno(), -14);
        assert_eq!(GpioError::ResourceUnavailable.to_errno(), -16);
        assert_eq!(GpioError::Cancelled.to_errno(), -512);
        assert_eq!(GpioError::TimedOut.to_errno(), -110);
    }
}
