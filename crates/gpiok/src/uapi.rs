//! 面向调用者的常量与标志
//!
//! 与 Linux 用户态 ABI 保持一致的打开标志、poll 事件和 lseek 基准。

bitflags::bitflags! {
    /// 打开标志（只保留驱动关心的部分）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// 只读
        const O_RDONLY   = 0o0;
        /// 只写
        const O_WRONLY   = 0o1;
        /// 读写
        const O_RDWR     = 0o2;
        /// 非阻塞
        const O_NONBLOCK = 0o4000;
    }
}

impl OpenFlags {
    /// 是否以非阻塞方式打开
    pub fn is_nonblocking(&self) -> bool {
        self.contains(OpenFlags::O_NONBLOCK)
    }
}

bitflags::bitflags! {
    /// poll 事件
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PollEvents: u16 {
        /// 有数据可读
        const POLLIN     = 0x0001;
        /// 普通数据可读
        const POLLRDNORM = 0x0040;
    }
}

/// lseek 基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// 绝对位置 (SEEK_SET)
    Set,
    /// 相对当前位置 (SEEK_CUR)
    Cur,
    /// 相对寄存器区间末尾 (SEEK_END)
    End,
}

impl TryFrom<i32> for SeekWhence {
    type Error = crate::GpioError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SeekWhence::Set),
            1 => Ok(SeekWhence::Cur),
            2 => Ok(SeekWhence::End),
            _ => Err(crate::GpioError::InvalidArgument),
        }
    }
}
