//! 调用范围信号契约。
//!
//! # 教案定位（Why）
//! - 编解码本身是同步单遍操作，不具备挂起能力；当外层 RPC 调用被取消时，
//!   解码方只能在“可检查边界”（帧边界、segment 边界）观察取消并尽快退出。
//! - 将取消探针抽象为最小谓词，使传输层可以用原子标志、deadline 判定或
//!   任意运行时原语接入，而编解码 crate 不感知具体实现。
//!
//! # 契约说明（What）
//! - [`CancelSignal::is_cancelled`] 必须是廉价、无副作用且可重复调用的查询；
//! - 一旦返回 `true`，后续查询不得再返回 `false`（取消具备单调性）；
//! - 被取消的解码调用以错误返回，半成品实例不得流出到应用层。

use core::sync::atomic::{AtomicBool, Ordering};

/// 取消信号探针。
///
/// # 设计背景（Why）
/// - 对标调用上下文中的取消语义：解码在每个 segment 边界轮询一次，
///   将传输层取消转化为解码错误向上传播。
///
/// # 契约说明（What）
/// - **前置条件**：实现必须线程安全，查询不得阻塞；
/// - **后置条件**：返回 `true` 后必须保持 `true`，调用方可据此缓存判定。
pub trait CancelSignal: Send + Sync {
    /// 查询调用是否已被取消。
    fn is_cancelled(&self) -> bool;
}

/// 永不取消的默认探针，供无取消语义的调用场景使用。
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// 基于原子标志的取消探针，供传输层在连接中断或超时时置位。
///
/// # 逻辑解析（How）
/// - `trigger` 以 `Release` 写入，`is_cancelled` 以 `Acquire` 读取，
///   保证置位前的状态变更对观察到取消的解码线程可见；
/// - 标志只能从未取消变为已取消，满足 [`CancelSignal`] 的单调性要求。
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    /// 构造未触发的取消标志。
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// 置位取消标志；重复调用幂等。
    pub fn trigger(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl CancelSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_monotonic() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.trigger();
        flag.trigger();
        assert!(flag.is_cancelled());
    }
}
