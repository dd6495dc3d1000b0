//! 测试支持 crate
//!
//! 提供架构操作、GPIO 寄存器块和平台服务的 Mock 实现。
//!
//! 本 crate 不依赖 `sync` / `gpiok`（避免循环依赖），
//! 由它们在 `cfg(test)` 下为这里的类型实现各自的 trait。

pub mod mock;
