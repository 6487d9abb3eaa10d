use crate::{CoreError, sealed::Sealed};
use alloc::boxed::Box;

use super::ReadableBuffer;

/// `WritableBuffer` 描述统一的可写缓冲契约。
///
/// # 设计背景（Why）
/// - **行业借鉴**：融合 Tokio `bytes::BufMut`、Netty `CompositeByteBuf`、.NET `PipeWriter` 的写入语义，
///   覆盖协议编码所需的顺序写入、扩容与冻结边界；
/// - **框架职责**：编码路径在共享缓冲上高频写入，契约必须清晰划定扩容、写入、冻结的职责归属。
///
/// # 逻辑解析（How）
/// - `reserve` 借鉴 PipeWriter 的“增量扩容”模式，鼓励实现按需增长并向调用方反馈失败；
/// - `put_slice` 承担主写入通道，适配定长头部与变长载荷的顺序编码；
/// - `freeze` 参考 Tokio Bytes 的同名语义，将可写缓冲转换为只读视图，确保所有权安全转移；
/// - `clear` 对标 Netty 的 `clear()`，便于编码器在多个区段之间重复使用暂存缓冲。
///
/// # 契约说明（What）
/// - **输入参数**：`reserve(additional)` 表示最少需要追加的可写空间；`put_slice(src)` 写入 `src` 全部字节；
/// - **前置条件**：调用方需遵循顺序写入，不允许并发写入同一实例；
/// - **后置条件**：成功写入后 `written()` 必须立即可见；`freeze` 之后原对象不可再写；
/// - **错误语义**：容量受限（池耗尽、背压）时返回携带 `buffer.overflow` 错误码的 [`CoreError`]。
///
/// # 设计考量（Trade-offs & Gotchas）
/// - **容量模型**：只暴露 `written` 单指标，长度追踪职责完全归实现方；
/// - **冻结风险**：冻结后若底层仍被共享，实现必须保证引用计数正确，防止悬垂引用。
pub trait WritableBuffer: Send + Sync + 'static + Sealed {
    /// 已写入的字节数，便于观测与区段长度计算。
    fn written(&self) -> usize;

    /// 确保至少追加 `additional` 字节的可写空间。
    fn reserve(&mut self, additional: usize) -> crate::Result<(), CoreError>;

    /// 将切片写入缓冲末尾。
    fn put_slice(&mut self, src: &[u8]) -> crate::Result<(), CoreError>;

    /// 清空已写内容但保留容量，便于重复使用。
    fn clear(&mut self);

    /// 冻结缓冲区，转换为只读视图。
    fn freeze(self: Box<Self>) -> crate::Result<Box<dyn ReadableBuffer>, CoreError>;
}
