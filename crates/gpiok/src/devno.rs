//! 设备号与 minor 分配
//!
//! 设备号采用 Linux 的编码方式（与 glibc `makedev` 一致）。

use alloc::sync::Arc;
use alloc::vec::Vec;
use sync::SpinLock;

use crate::GpioError;

/// 由 major/minor 组成设备号
pub const fn makedev(major: u32, minor: u32) -> u64 {
    let major = major as u64;
    let minor = minor as u64;
    ((major & 0xffff_f000) << 32)
        | ((major & 0x0000_0fff) << 8)
        | ((minor & 0xffff_ff00) << 12)
        | (minor & 0x0000_00ff)
}

/// 取设备号的 major 部分
pub const fn major(dev: u64) -> u32 {
    (((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)) as u32
}

/// 取设备号的 minor 部分
pub const fn minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)) as u32
}

/// minor 号分配器
///
/// 总是分配最小的空闲号，释放后的号可以被再次使用。
pub struct MinorAllocator {
    used: SpinLock<Vec<bool>>,
}

impl MinorAllocator {
    /// 创建容量为 `capacity` 的分配器
    pub fn new(capacity: usize) -> Self {
        let mut used = Vec::new();
        used.resize(capacity, false);
        Self {
            used: SpinLock::new(used),
        }
    }

    /// 分配一个 minor 号，`Drop` 时自动归还
    pub fn reserve(self: &Arc<Self>) -> Result<MinorReservation, GpioError> {
        let mut used = self.used.lock();
        let slot = used
            .iter()
            .position(|u| !u)
            .ok_or(GpioError::ResourceUnavailable)?;
        used[slot] = true;
        Ok(MinorReservation {
            minor: slot as u32,
            owner: self.clone(),
        })
    }

    /// 已分配的数量
    pub fn in_use(&self) -> usize {
        self.used.lock().iter().filter(|u| **u).count()
    }

    fn release(&self, minor: u32) {
        if let Some(slot) = self.used.lock().get_mut(minor as usize) {
            *slot = false;
        }
    }
}

/// 已分配的 minor 号
pub struct MinorReservation {
    minor: u32,
    owner: Arc<MinorAllocator>,
}

impl MinorReservation {
    /// minor 号
    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl Drop for MinorReservation {
    fn drop(&mut self) {
        self.owner.release(self.minor);
    }
}
