//! 缓冲区契约模块。
//!
//! # 模块架构（Why）
//! - 将只读与可写契约拆分为独立子模块，对齐 Netty、Tokio Bytes 等主流框架的职责分离实践；
//! - 通过统一的 [`ReadableBuffer`]/[`WritableBuffer`] 契约隐藏底层实现差异，
//!   让编解码层与具体内存策略解耦：默认堆实现、池化实现或共享内存实现均可替换接入。
//!
//! # 设计总览（How）
//! - [`readable`] 定义只读缓冲协议，涵盖 `split_to`、`advance`、`copy_into_slice` 等核心操作，
//!   其中 `split_to` 是 segment 跳过路径依赖的关键原语；
//! - [`writable`] 提供可写缓冲协议，强调与只读视图之间的“冻结”转换；
//! - [`heap`] 给出基于 `Vec<u8>` 的默认实现，并与 `bytes` 生态桥接。
//!
//! # 命名共识（Consistency）
//! - 类型命名避免业务前缀，遵循 Rust 异步生态的惯用术语，便于与 Bytes/Tonic 等互操作。

pub mod heap;
pub mod readable;
pub mod writable;

pub use heap::{HeapBuffer, HeapSlice};
pub use readable::ReadableBuffer;
pub use writable::WritableBuffer;
