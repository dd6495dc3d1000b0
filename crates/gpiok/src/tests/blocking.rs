use super::*;
use crate::config::GPIOK_MAJOR;
use crate::{GpioDevice, GpioFile, OpenFlags, SeekWhence, makedev};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn attached(config: GpioConfig) -> (Harness, Arc<MockGpioRegs>, Arc<GpioDevice>) {
    let h = harness(config);
    let regs = h.platform.add_device(1, BASE, SPAN, LINE);
    let dev = h.driver.attach(PlatformHandle(1)).unwrap();
    (h, regs, dev)
}

fn open_at(h: &Harness, offset: usize) -> GpioFile {
    let file = h
        .driver
        .open(makedev(GPIOK_MAJOR, 0), OpenFlags::O_RDONLY)
        .unwrap();
    file.lseek(offset as isize, SeekWhence::Set).unwrap();
    file
}

fn spawn_reader(file: GpioFile) -> thread::JoinHandle<(Result<usize, GpioError>, u32)> {
    thread::spawn(move || {
        let mut buf = [0u8; 4];
        let res = file.read(&mut buf[..]);
        (res, u32::from_ne_bytes(buf))
    })
}

fn wait_blocked(dev: &GpioDevice, n: usize) {
    while dev.event().blocked_readers() < n {
        thread::yield_now();
    }
}

#[test]
fn test_button_press_end_to_end() {
    let (h, regs, dev) = attached(config());
    let reader = spawn_reader(open_at(&h, 0x08));
    wait_blocked(&dev, 1);

    // 按钮按下：接下来 3 次读取为 0b0101，之后松开
    regs.press(0b0101, 3);
    assert!(regs.raise(0b0101));
    assert!(MOCK_ARCH_OPS.as_interrupt(|| h.driver.try_handle_interrupt(LINE)));
    assert!(!regs.global_enabled());

    let (res, value) = reader.join().unwrap();
    assert_eq!(res, Ok(4));
    assert_eq!(value, 0b0101);
    assert_eq!(regs.input(), 0);
    assert!(regs.input_reads() > 3);
    assert_eq!(regs.last_ack(), 0xF);
    assert_eq!(regs.ack_count(), 1);
    assert_eq!(regs.pending(), 0);
    assert_eq!(regs.pie(), 0xF);
    assert!(regs.global_enabled());
    assert_eq!(dev.irq_count(), 1);
    assert!(!dev.event().is_ready());
}

#[test]
fn test_read_after_interrupt_does_not_block() {
    let (h, regs, dev) = attached(config());
    regs.raise(0b1000);
    h.driver.try_handle_interrupt(LINE);

    let file = open_at(&h, 0x14);
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert_eq!(u32::from_ne_bytes(buf), 0b1000);
    assert_eq!(regs.pending(), 0);
    assert_eq!(dev.irq_count(), 1);
}

#[test]
fn test_one_event_releases_one_reader() {
    let (h, regs, dev) = attached(config());
    regs.set_input(0);
    let done = Arc::new(AtomicUsize::new(0));

    let mut tokens = std::vec::Vec::new();
    let readers: std::vec::Vec<_> = (0..3)
        .map(|_| {
            let file = open_at(&h, 0x08);
            tokens.push(file.cancel_token());
            let done = done.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 4];
                let res = file.read(&mut buf[..]);
                done.fetch_add(1, Ordering::AcqRel);
                res
            })
        })
        .collect();
    wait_blocked(&dev, 3);

    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);
    while done.load(Ordering::Acquire) == 0 {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(20));
    assert_eq!(done.load(Ordering::Acquire), 1);
    assert_eq!(dev.irq_count(), 1);

    for token in &tokens {
        token.cancel();
    }
    let results: std::vec::Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| **r == Ok(4)).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| **r == Err(GpioError::Cancelled))
            .count(),
        2
    );
}

#[test]
fn test_cancelled_read_keeps_state() {
    let (h, regs, dev) = attached(config());
    regs.set_input(0);
    let file = open_at(&h, 0x08);
    let token = file.cancel_token();
    let file = Arc::new(file);

    let reader = {
        let file = file.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 4];
            file.read(&mut buf[..])
        })
    };
    wait_blocked(&dev, 1);
    token.cancel();
    assert_eq!(reader.join().unwrap(), Err(GpioError::Cancelled));
    assert!(!token.is_cancelled());
    assert!(!dev.event().is_ready());
    assert!(regs.global_enabled());
    assert_eq!(regs.ack_count(), 0);

    // 中断触发后没有读者：中断保持关闭，事件保留给下一次读
    regs.raise(0b0010);
    h.driver.try_handle_interrupt(LINE);
    assert!(!regs.global_enabled());
    assert!(dev.event().is_ready());

    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert!(regs.global_enabled());
    assert_eq!(regs.ack_count(), 1);
}

#[test]
fn test_read_timeout_does_not_consume() {
    let (h, regs, dev) = attached(config().with_read_timeout_ms(Some(25)));
    regs.set_input(0);
    let file = open_at(&h, 0x08);

    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Err(GpioError::TimedOut));
    assert_eq!(dev.event().blocked_readers(), 0);

    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert_eq!(dev.irq_count(), 1);
}

#[test]
fn test_debounce_disabled_acks_immediately() {
    let (h, regs, _dev) = attached(config().with_debounce(false));
    regs.set_input(0b0001);
    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);

    let file = open_at(&h, 0x08);
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert_eq!(u32::from_ne_bytes(buf), 0b0001);
    // 输入仍为高，但中断已确认并重新打开
    assert_eq!(regs.input(), 0b0001);
    assert_eq!(regs.ack_count(), 1);
    assert!(regs.global_enabled());
}

#[test]
fn test_debounce_ignores_pins_outside_mask() {
    let (h, regs, _dev) = attached(config().with_irq_mask(0b0011));
    regs.set_input(0b1100);
    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);

    let file = open_at(&h, 0x08);
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf[..]), Ok(4));
    assert_eq!(u32::from_ne_bytes(buf), 0b1100);
    assert_eq!(regs.last_ack(), 0b0011);
}

#[test]
fn test_detach_releases_blocked_readers() {
    let (h, regs, dev) = attached(config());
    let readers: std::vec::Vec<_> = (0..2).map(|_| spawn_reader(open_at(&h, 0x08))).collect();
    wait_blocked(&dev, 2);

    h.driver.detach(PlatformHandle(1)).unwrap();
    for r in readers {
        assert_eq!(r.join().unwrap().0, Err(GpioError::NoDevice));
    }
    assert!(dev.is_dead());
    assert!(!regs.global_enabled());
    assert!(!h.platform.irq_registered(LINE));
    assert_eq!(h.driver.registry().count(), 0);
}

#[test]
fn test_detach_releases_stuck_debounce() {
    let (h, regs, dev) = attached(config());
    let reader = spawn_reader(open_at(&h, 0x08));
    wait_blocked(&dev, 1);

    // 输入一直为高：读者停在去抖等待中，中断不会被重新打开
    regs.set_input(0b0001);
    regs.raise(0b0001);
    h.driver.try_handle_interrupt(LINE);
    while regs.input_reads() < 5 {
        thread::yield_now();
    }
    assert!(!regs.global_enabled());
    assert_eq!(regs.ack_count(), 0);

    h.driver.detach(PlatformHandle(1)).unwrap();
    let (res, value) = reader.join().unwrap();
    assert_eq!(res, Ok(4));
    assert_eq!(value, 0b0001);
    assert!(!regs.global_enabled());
    assert_eq!(regs.pie(), 0);
}
