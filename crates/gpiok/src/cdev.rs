//! 字符设备接口
//!
//! 每次 open 得到一个 [`GpioFile`]，它维护寄存器游标和打开标志，
//! 把 lseek/read/write/poll 映射到描述符上的寄存器访问和中断同步。
//!
//! read/write 不移动游标：调用者 seek 一次后可以反复读同一个寄存器。
//! 文件对象被丢弃即为 release。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use sync::{PollTable, SpinLock};

use crate::GpioError;
use crate::descriptor::GpioDevice;
use crate::ops::PlatformOps;
use crate::uaccess::{REG_BYTES, UserBufferReader, UserBufferWriter, get_reg, put_reg};
use crate::uapi::{OpenFlags, PollEvents, SeekWhence};

/// 阻塞读的外部取消信号
///
/// 相当于向阻塞中的调用者投递信号：等待中的读以 [`GpioError::Cancelled`] 返回，
/// 投递后信号被清除，后续的读正常进行。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 请求取消
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否有未投递的取消请求
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// 打开的设备文件
pub struct GpioFile {
    device: Arc<GpioDevice>,
    flags: OpenFlags,
    offset: SpinLock<usize>,
    cancel: CancelToken,
    clock: Arc<dyn PlatformOps>,
    read_timeout_ms: Option<u64>,
}

impl GpioFile {
    pub(crate) fn new(
        device: Arc<GpioDevice>,
        flags: OpenFlags,
        clock: Arc<dyn PlatformOps>,
        read_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            device,
            flags,
            offset: SpinLock::new(0),
            cancel: CancelToken::default(),
            clock,
            read_timeout_ms,
        }
    }

    /// 对应的设备
    pub fn device(&self) -> &Arc<GpioDevice> {
        &self.device
    }

    /// 打开标志
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// 当前寄存器游标
    pub fn offset(&self) -> usize {
        *self.offset.lock()
    }

    /// 本文件的取消信号
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 移动寄存器游标
    pub fn lseek(&self, offset: isize, whence: SeekWhence) -> Result<usize, GpioError> {
        let mut cursor = self.offset.lock();
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => *cursor,
            SeekWhence::End => self.device.info().size,
        };
        let new_offset = base
            .checked_add_signed(offset)
            .ok_or(GpioError::InvalidArgument)?;
        *cursor = new_offset;
        log::debug!("{}: seek to {:#x}", self.device.name(), new_offset);
        Ok(new_offset)
    }

    /// 读游标处的寄存器
    pub fn read<W: UserBufferWriter + ?Sized>(&self, buf: &mut W) -> Result<usize, GpioError> {
        let offset = self.offset();
        self.read_at(buf, offset)
    }

    /// 读 `offset` 处的寄存器，不移动游标
    ///
    /// 阻塞模式下等待一次中断事件；非阻塞模式直接返回寄存器当前值。
    pub fn read_at<W: UserBufferWriter + ?Sized>(
        &self,
        buf: &mut W,
        offset: usize,
    ) -> Result<usize, GpioError> {
        if buf.len() < REG_BYTES {
            return Err(GpioError::UserTransferFault);
        }
        let value = if self.flags.is_nonblocking() {
            self.device.read_now(offset)?
        } else {
            self.read_blocking(offset)?
        };
        put_reg(buf, value)
    }

    fn read_blocking(&self, offset: usize) -> Result<u32, GpioError> {
        let deadline = self
            .read_timeout_ms
            .map(|ms| self.clock.uptime_ms().saturating_add(ms));
        let res = self.device.read_event(offset, || {
            if self.cancel.take() {
                return Some(GpioError::Cancelled);
            }
            match deadline {
                Some(deadline) if self.clock.uptime_ms() >= deadline => Some(GpioError::TimedOut),
                _ => None,
            }
        });
        match res {
            Err(GpioError::Cancelled) => {
                log::warn!("{}: blocking read cancelled", self.device.name());
            }
            Err(GpioError::TimedOut) => {
                log::warn!("{}: blocking read timed out", self.device.name());
            }
            _ => {}
        }
        res
    }

    /// 写游标处的寄存器
    pub fn write<R: UserBufferReader + ?Sized>(&self, buf: &R) -> Result<usize, GpioError> {
        let offset = self.offset();
        self.write_at(buf, offset)
    }

    /// 写 `offset` 处的寄存器，不移动游标
    pub fn write_at<R: UserBufferReader + ?Sized>(
        &self,
        buf: &R,
        offset: usize,
    ) -> Result<usize, GpioError> {
        let value = get_reg(buf)?;
        self.device.write(offset, value)?;
        Ok(REG_BYTES)
    }

    /// poll 查询
    ///
    /// 有未消费事件时返回 `POLLIN | POLLRDNORM`；给出登记表时把调用者登记到 poll 等待队列。
    pub fn poll<'a>(
        &'a self,
        table: Option<&mut PollTable<'a>>,
    ) -> Result<PollEvents, GpioError> {
        Ok(if self.device.poll(table)? {
            PollEvents::POLLIN | PollEvents::POLLRDNORM
        } else {
            PollEvents::empty()
        })
    }
}

impl Drop for GpioFile {
    fn drop(&mut self) {
        log::debug!("{}: release", self.device.name());
    }
}
