// Scenario tests for the driver, run on the host with the test-support mocks.
//
// The mock types live in `test-support`, which does not depend on this crate,
// so the trait impls that plug them in are provided here.

extern crate std;

use alloc::sync::Arc;
use core::ops::Range;
use std::sync::Once;

use test_support::mock::arch::MOCK_ARCH_OPS;
use test_support::mock::gpio::MockGpioRegs;
use test_support::mock::platform::MockPlatform;

use crate::regs::RegisterIo;
use crate::{GpioConfig, GpioDriver, GpioError, PlatformHandle, PlatformOps, PlatformResource};

mod blocking;
mod cdev;

struct TestArch;

impl sync::ArchOps for TestArch {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { MOCK_ARCH_OPS.read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { MOCK_ARCH_OPS.restore_interrupts(flags) }
    }

    fn in_interrupt(&self) -> bool {
        MOCK_ARCH_OPS.in_interrupt()
    }

    fn cpu_relax(&self) {
        MOCK_ARCH_OPS.cpu_relax();
    }

    fn current_task(&self) -> usize {
        MOCK_ARCH_OPS.current_task()
    }

    fn wait_for_wakeup(&self) {
        MOCK_ARCH_OPS.park();
    }

    fn wake_task(&self, task: usize) {
        MOCK_ARCH_OPS.unpark(task);
    }
}

static TEST_ARCH: TestArch = TestArch;
static INIT: Once = Once::new();

/// Registers the host arch ops for `sync` (safe to call repeatedly).
pub(crate) fn init() {
    // SAFETY: Once guarantees a single registration
    INIT.call_once(|| unsafe { sync::register_arch_ops(&TEST_ARCH) });
}

impl RegisterIo for MockGpioRegs {
    fn read32(&self, offset: usize) -> u32 {
        MockGpioRegs::read32(self, offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        MockGpioRegs::write32(self, offset, value);
    }
}

impl PlatformOps for MockPlatform {
    fn resource(&self, handle: PlatformHandle) -> Option<PlatformResource> {
        MockPlatform::resource(self, handle.0).map(|r| PlatformResource {
            regs: r.phys_start..r.phys_start + r.size,
            irq_line: r.irq_line,
        })
    }

    fn ioremap(&self, regs: Range<usize>) -> Result<Arc<dyn RegisterIo>, GpioError> {
        let block = self
            .map(regs.start, regs.len())
            .ok_or(GpioError::OutOfMemory)?;
        Ok(block)
    }

    fn iounmap(&self, regs: Range<usize>) {
        self.unmap(regs.start);
    }

    fn request_irq(&self, line: usize, name: &str) -> Result<(), GpioError> {
        if MockPlatform::request_irq(self, line, name) {
            Ok(())
        } else {
            Err(GpioError::ResourceUnavailable)
        }
    }

    fn free_irq(&self, line: usize) {
        MockPlatform::free_irq(self, line);
    }

    fn create_node(&self, name: &str, devno: u64) -> Result<(), GpioError> {
        if MockPlatform::create_node(self, name, devno) {
            Ok(())
        } else {
            Err(GpioError::ResourceUnavailable)
        }
    }

    fn remove_node(&self, devno: u64) {
        MockPlatform::remove_node(self, devno);
    }

    fn uptime_ms(&self) -> u64 {
        self.tick()
    }
}

pub(crate) const BASE: usize = 0x4120_0000;
pub(crate) const SPAN: usize = 0x1C;
pub(crate) const LINE: usize = 61;

/// A driver wired to a mock platform.
pub(crate) struct Harness {
    pub platform: Arc<MockPlatform>,
    pub driver: GpioDriver,
}

pub(crate) fn harness(config: GpioConfig) -> Harness {
    init();
    let platform = Arc::new(MockPlatform::new());
    let driver = GpioDriver::new(platform.clone(), config);
    Harness { platform, driver }
}

/// Default test config: 4 input pins of interest.
pub(crate) fn config() -> GpioConfig {
    GpioConfig::new().with_irq_mask(0xF)
}
