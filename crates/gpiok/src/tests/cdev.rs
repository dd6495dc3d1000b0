use super::*;
use crate::config::GPIOK_MAJOR;
use crate::{GpioFile, OpenFlags, PollEvents, SeekWhence, makedev};
use alloc::sync::Arc;
use sync::PollTable;

fn open(h: &Harness, flags: OpenFlags) -> GpioFile {
    h.driver.open(makedev(GPIOK_MAJOR, 0), flags).unwrap()
}

fn attached(config: GpioConfig) -> (Harness, Arc<MockGpioRegs>) {
    let h = harness(config);
    let regs = h.platform.add_device(1, BASE, SPAN, LINE);
    h.driver.attach(PlatformHandle(1)).unwrap();
    (h, regs)
}

#[test]
fn test_open_unknown_device() {
    let (h, _) = attached(config());
    assert_eq!(
        h.driver.open(makedev(GPIOK_MAJOR, 5), OpenFlags::O_RDONLY).err(),
        Some(GpioError::NoDevice)
    );
    assert_eq!(
        h.driver.open(makedev(GPIOK_MAJOR + 1, 0), OpenFlags::O_RDONLY).err(),
        Some(GpioError::NoDevice)
    );
}

#[test]
fn test_lseek_whence() {
    let (h, _) = attached(config());
    let file = open(&h, OpenFlags::O_RDWR);

    assert_eq!(file.lseek(0x08, SeekWhence::Set), Ok(0x08));
    assert_eq!(file.lseek(0x04, SeekWhence::Cur), Ok(0x0C));
    assert_eq!(file.lseek(-4, SeekWhence::Cur), Ok(0x08));
    assert_eq!(file.lseek(-4, SeekWhence::End), Ok(0x18));
    assert_eq!(file.lseek(0, SeekWhence::End), Ok(SPAN));
    assert_eq!(
        file.lseek(-0x20, SeekWhence::End),
        Err(GpioError::InvalidArgument)
    );
    assert_eq!(file.lseek(-1, SeekWhence::Set), Err(GpioError::InvalidArgument));
    assert_eq!(file.offset(), SPAN);
    assert_eq!(SeekWhence::try_from(2), Ok(SeekWhence::End));
    assert_eq!(SeekWhence::try_from(3), Err(GpioError::InvalidArgument));
}

#[test]
fn test_write_and_nonblocking_read() {
    let (h, regs) = attached(config());
    let file = open(&h, OpenFlags::O_RDWR | OpenFlags::O_NONBLOCK);

    file.lseek(0x00, SeekWhence::Set).unwrap();
    assert_eq!(file.write(&0b0011u32.to_ne_bytes()[..]), Ok(4));
    assert_eq!(regs.mode(), 0b0011);
    assert_eq!(file.write_at(&0b0110u32.to_ne_bytes()[..], 0x04), Ok(4));
    assert_eq!(regs.output(), 0b0110);
    assert_eq!(file.offset(), 0x00);

    regs.set_input(0b1010);
    let mut buf = [0u8; 4];
    assert_eq!(file.read_at(&mut buf[..], 0x08), Ok(4));
    assert_eq!(u32::from_ne_bytes(buf), 0b1010);
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert_eq!(u32::from_ne_bytes(buf), 0b0011);

    // read 寄存器只读
    file.write_at(&0xFFu32.to_ne_bytes()[..], 0x08).unwrap();
    assert_eq!(regs.input(), 0b1010);
}

#[test]
fn test_nonblocking_read_leaves_event_and_interrupts_alone() {
    let (h, regs) = attached(config());
    let file = open(&h, OpenFlags::O_RDONLY | OpenFlags::O_NONBLOCK);
    regs.raise(0b0100);
    assert!(h.driver.try_handle_interrupt(LINE));

    let mut buf = [0u8; 4];
    file.read_at(&mut buf[..], 0x14).unwrap();
    assert_eq!(u32::from_ne_bytes(buf), 0b0100);
    assert!(file.device().event().is_ready());
    assert_eq!(regs.ack_count(), 0);
    assert_eq!(regs.pie(), 0);
    assert!(!regs.global_enabled());
}

#[test]
fn test_access_errors() {
    let (h, _) = attached(config());
    let file = open(&h, OpenFlags::O_RDWR | OpenFlags::O_NONBLOCK);
    let mut buf = [0u8; 4];

    assert_eq!(file.read_at(&mut buf[..], SPAN), Err(GpioError::OutOfRange));
    assert_eq!(file.read_at(&mut buf[..], 0x06), Err(GpioError::InvalidArgument));
    assert_eq!(
        file.write_at(&buf[..], 0x100),
        Err(GpioError::OutOfRange)
    );

    let mut short = [0u8; 2];
    assert_eq!(file.read_at(&mut short[..], 0), Err(GpioError::UserTransferFault));
    assert_eq!(file.write_at(&short[..], 0), Err(GpioError::UserTransferFault));
    assert_eq!(GpioError::UserTransferFault.to_errno(), -14);
}

#[test]
fn test_blocking_read_checks_arguments_before_waiting() {
    let (h, _) = attached(config());
    let file = open(&h, OpenFlags::O_RDONLY);
    let mut short = [0u8; 3];
    let mut buf = [0u8; 4];
    assert_eq!(file.read_at(&mut short[..], 0x08), Err(GpioError::UserTransferFault));
    assert_eq!(file.read_at(&mut buf[..], 0x20), Err(GpioError::OutOfRange));
    assert_eq!(file.device().event().blocked_readers(), 0);
}

#[test]
fn test_poll_reports_readable_after_interrupt() {
    let (h, regs) = attached(config());
    let file = open(&h, OpenFlags::O_RDONLY);

    let mut table = PollTable::new();
    assert_eq!(file.poll(Some(&mut table)), Ok(PollEvents::empty()));
    assert_eq!(table.len(), 1);
    assert!(!table.is_woken());

    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);
    assert!(table.is_woken());
    assert_eq!(
        file.poll(None),
        Ok(PollEvents::POLLIN | PollEvents::POLLRDNORM)
    );
}

#[test]
fn test_files_on_detached_device_fail() {
    let (h, _) = attached(config());
    let file = open(&h, OpenFlags::O_RDWR | OpenFlags::O_NONBLOCK);
    h.driver.detach(PlatformHandle(1)).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Err(GpioError::NoDevice));
    assert_eq!(file.write(&buf[..]), Err(GpioError::NoDevice));
    assert_eq!(file.poll(None), Err(GpioError::NoDevice));
    assert_eq!(
        h.driver.open(makedev(GPIOK_MAJOR, 0), OpenFlags::O_RDONLY).err(),
        Some(GpioError::NoDevice)
    );
}
