//! 物理寄存器区间的独占登记
//!
//! 每个被绑定的实例独占一段物理区间，与已登记区间有任何重叠都会失败。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;
use sync::SpinLock;

use crate::GpioError;

/// 已被占用的物理区间表
#[derive(Default)]
pub struct MemRegionTable {
    claimed: SpinLock<Vec<Range<usize>>>,
}

impl MemRegionTable {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 独占登记 `range`，`Drop` 时释放
    pub fn claim(self: &Arc<Self>, range: Range<usize>) -> Result<RegionReservation, GpioError> {
        if range.is_empty() {
            return Err(GpioError::InvalidArgument);
        }
        let mut claimed = self.claimed.lock();
        if claimed
            .iter()
            .any(|r| r.start < range.end && range.start < r.end)
        {
            return Err(GpioError::ResourceUnavailable);
        }
        claimed.push(range.clone());
        Ok(RegionReservation {
            range,
            table: self.clone(),
        })
    }

    /// `range` 是否与已登记区间重叠
    pub fn is_claimed(&self, range: &Range<usize>) -> bool {
        self.claimed
            .lock()
            .iter()
            .any(|r| r.start < range.end && range.start < r.end)
    }

    fn release(&self, range: &Range<usize>) {
        self.claimed.lock().retain(|r| r != range);
    }
}

/// 已登记的物理区间
pub struct RegionReservation {
    range: Range<usize>,
    table: Arc<MemRegionTable>,
}

impl RegionReservation {
    /// 区间
    pub fn range(&self) -> &Range<usize> {
        &self.range
    }
}

impl Drop for RegionReservation {
    fn drop(&mut self) {
        log::trace!(
            "gpiok: release region {:#x}..{:#x}",
            self.range.start,
            self.range.end
        );
        self.table.release(&self.range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init;

    #[test]
    fn test_overlapping_claim_rejected() {
        init();
        let table = Arc::new(MemRegionTable::new());
        let a = table.claim(0x4000_0000..0x4000_001C).unwrap();
        assert_eq!(
            table.claim(0x4000_0018..0x4000_0030).err(),
            Some(GpioError::ResourceUnavailable)
        );
        let b = table.claim(0x4000_001C..0x4000_0038).unwrap();
        drop(a);
        assert!(!table.is_claimed(&(0x4000_0000..0x4000_001C)));
        assert!(table.is_claimed(b.range()));
    }
}
