use crate::{CoreError, sealed::Sealed};
use alloc::{boxed::Box, vec::Vec};

/// `ReadableBuffer` 定义对象安全的只读缓冲契约。
///
/// # 设计背景（Why）
/// - **对标实践**：综合 Tokio `bytes::Buf`、Netty `ByteBuf`、gRPC C++ `Slice` 的读取语义，
///   抽象出编解码层需要的最小读取视图；
/// - **框架定位**：协议解析需要统一的游标语义，避免在热路径中频繁进行类型转换或复制；
/// - **扩展目标**：允许自定义实现以适配零拷贝、共享内存等场景，同时在 `no_std + alloc` 环境保持可用。
///
/// # 逻辑解析（How）
/// - 按照“观察-拆分-推进”三段式设计：`chunk` 暴露当前可读块，`split_to` 转移所有权拆出前缀，
///   `advance` 推进读指针丢弃数据；
/// - `split_to` 是前向兼容跳过的底层原语：调用方拆出定长区段后，无论消费多少，
///   父缓冲的游标都已精确越过该区段；
/// - `copy_into_slice` 提供兼容传统切片 API 的降级路径，`try_into_vec` 供一次性扁平化消费使用。
///
/// # 契约说明（What）
/// - **输入参数**：`split_to(len)`/`advance(len)` 的 `len` 以字节计，必须满足 `len <= remaining()`；
///   `copy_into_slice(dst)` 需保证 `dst.len() <= remaining()`；
/// - **返回值**：`split_to` 返回新的 `ReadableBuffer` 实例，拥有拆分区段的所有权；
/// - **后置条件**：所有推进或拆分操作结束后，`remaining()` 必须准确反映剩余字节数；
/// - **错误语义**：越界操作返回携带稳定错误码（`buffer.underflow`）的 [`CoreError`]，内部状态保持不变。
///
/// # 设计考量（Trade-offs & Gotchas）
/// - **对象安全权衡**：放弃泛型化零成本抽象，换取跨组件的动态调度能力；
/// - **性能提示**：`try_into_vec` 与 `split_to` 的默认堆实现会复制，热路径应优先走 `chunk`。
pub trait ReadableBuffer: Send + Sync + 'static + Sealed {
    /// 返回剩余可读字节数。
    fn remaining(&self) -> usize;

    /// 返回当前可直接读取的连续字节块。
    fn chunk(&self) -> &[u8];

    /// 拆分出前 `len` 字节，返回新的缓冲区实例。
    fn split_to(&mut self, len: usize) -> Result<Box<dyn ReadableBuffer>, CoreError>;

    /// 将读指针前移 `len` 字节，丢弃对应数据。
    fn advance(&mut self, len: usize) -> Result<(), CoreError>;

    /// 将缓冲内容复制到 `dst`，兼容传统基于切片的 API。
    fn copy_into_slice(&mut self, dst: &mut [u8]) -> Result<(), CoreError>;

    /// 尝试将剩余数据扁平化为 `Vec<u8>`，供一次性消费场景使用。
    fn try_into_vec(self: Box<Self>) -> Result<Vec<u8>, CoreError>;

    /// 判断缓冲区是否已读空。
    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}
