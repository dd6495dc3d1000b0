//! 调用者缓冲区访问
//!
//! 寄存器值在驱动与调用者之间以 4 字节本机字节序传递。
//! 缓冲区不足 4 字节视为拷贝失败（[`GpioError::UserTransferFault`]）。

use crate::GpioError;

/// 寄存器值的字节数
pub const REG_BYTES: usize = core::mem::size_of::<u32>();

/// 可被驱动写入的调用者缓冲区
pub trait UserBufferWriter {
    /// 剩余可写字节数
    fn len(&self) -> usize;

    /// 缓冲区是否已满
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 写入 `data`，空间不足时失败且不写入任何字节
    fn write_slice(&mut self, data: &[u8]) -> Result<(), GpioError>;
}

/// 可被驱动读取的调用者缓冲区
pub trait UserBufferReader {
    /// 剩余可读字节数
    fn len(&self) -> usize;

    /// 缓冲区是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读满 `out`，数据不足时失败
    fn read_slice(&self, out: &mut [u8]) -> Result<(), GpioError>;
}

impl UserBufferWriter for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn write_slice(&mut self, data: &[u8]) -> Result<(), GpioError> {
        self.get_mut(..data.len())
            .ok_or(GpioError::UserTransferFault)?
            .copy_from_slice(data);
        Ok(())
    }
}

impl UserBufferReader for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn read_slice(&self, out: &mut [u8]) -> Result<(), GpioError> {
        out.copy_from_slice(self.get(..out.len()).ok_or(GpioError::UserTransferFault)?);
        Ok(())
    }
}

/// 把寄存器值写给调用者
pub fn put_reg<W: UserBufferWriter + ?Sized>(buf: &mut W, value: u32) -> Result<usize, GpioError> {
    buf.write_slice(&value.to_ne_bytes())?;
    Ok(REG_BYTES)
}

/// 从调用者读取寄存器值
pub fn get_reg<R: UserBufferReader + ?Sized>(buf: &R) -> Result<u32, GpioError> {
    let mut bytes = [0u8; REG_BYTES];
    buf.read_slice(&mut bytes)?;
    Ok(u32::from_ne_bytes(bytes))
}
