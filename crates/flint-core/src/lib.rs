#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # flint-core
//!
//! ## 教案目的（Why）
//! - **定位**：flint 异常编解码栈的共享契约层，收拢缓冲区、错误与调用范围信号三类横切能力。
//! - **架构角色**：`flint-codec-fault` 等编解码 crate 只依赖本层的对象安全契约，不感知具体内存策略，
//!   从而允许接入方以池化、零拷贝或共享内存实现替换默认缓冲。
//! - **设计策略**：契约全部以 trait 对象形态暴露，配合 `no_std + alloc` 支持，保证在嵌入式网关与
//!   常规服务端之间共用同一套源码。
//!
//! ## 交互契约（What）
//! - [`buffer`] 输出 [`ReadableBuffer`]/[`WritableBuffer`] 读写契约与堆实现 [`HeapBuffer`]/[`HeapSlice`]。
//! - [`error`] 输出 [`CoreError`] 与稳定错误码表 [`error::codes`]。
//! - [`contract`] 输出取消信号探针 [`CancelSignal`]，供同步解码在边界处观察外部取消。
//!
//! ## 实现策略（How）
//! - 契约按“观察-拆分-推进”的缓冲语义组织，错误统一携带 `<域>.<语义>` 形式的稳定错误码；
//! - 通过 `sealed` 模块保留未来为公开 trait 增加默认方法的演进空间。
//!
//! ## 风险提示（Trade-offs）
//! - 对象安全意味着放弃部分泛型零成本抽象，换取跨 crate 的动态调度能力；
//! - 默认堆实现面向正确性而非极限吞吐，热路径如需池化需自行实现缓冲契约。

extern crate alloc;

pub mod buffer;
pub mod contract;
pub mod error;

pub(crate) mod sealed;

pub use buffer::{HeapBuffer, HeapSlice, ReadableBuffer, WritableBuffer};
pub use contract::{CancelFlag, CancelSignal, NeverCancel};
pub use error::CoreError;

/// 框架统一的 `Result` 别名，默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;
