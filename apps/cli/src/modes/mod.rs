//! 运行模式
//!
//! One-shot 模式：每次命令独立连接，执行后断开。

pub mod oneshot;
