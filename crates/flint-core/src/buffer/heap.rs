//! 基于 `Vec<u8>` 的默认缓冲实现。
//!
//! # 教案定位（Why）
//! - 为编解码层与测试提供开箱即用的缓冲实现，无需先接入池化或零拷贝基础设施；
//! - 作为契约的参考实现，演示越界防御与游标维护的标准写法。
//!
//! # 实现策略（How）
//! - [`HeapBuffer`] 以 `Vec<u8>` 承载写入，按需扩容，`freeze` 后转为 [`HeapSlice`]；
//! - [`HeapSlice`] 维护“数据 + 游标”二元组，`split_to` 以复制方式拆出前缀——
//!   协议报文通常小于 MTU，复制开销可控，换取逻辑直观、易于审查；
//! - 与 `bytes` 生态桥接：`HeapSlice` 实现 [`bytes::Buf`]，并支持从 [`bytes::Bytes`] 构造。

use alloc::{boxed::Box, vec::Vec};

use crate::{
    CoreError,
    error::codes,
};

use super::{ReadableBuffer, WritableBuffer};

/// 堆上可写缓冲，[`WritableBuffer`] 的默认实现。
///
/// # 契约说明（What）
/// - 写入总是成功（`Vec` 按需扩容），`reserve` 仅做容量预热；
/// - `freeze` 将内部向量转移给 [`HeapSlice`]，不发生复制。
#[derive(Debug, Default, Clone)]
pub struct HeapBuffer {
    data: Vec<u8>,
}

impl HeapBuffer {
    /// 构造空缓冲。
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// 构造具备初始容量的缓冲，减少热路径上的扩容次数。
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// 以切片视图访问已写入的字节。
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// 消费缓冲并取出底层向量。
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl WritableBuffer for HeapBuffer {
    fn written(&self) -> usize {
        self.data.len()
    }

    fn reserve(&mut self, additional: usize) -> crate::Result<(), CoreError> {
        self.data.reserve(additional);
        Ok(())
    }

    fn put_slice(&mut self, src: &[u8]) -> crate::Result<(), CoreError> {
        self.data.extend_from_slice(src);
        Ok(())
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn freeze(self: Box<Self>) -> crate::Result<Box<dyn ReadableBuffer>, CoreError> {
        Ok(Box::new(HeapSlice::from(self.data)))
    }
}

/// 堆上只读缓冲，[`ReadableBuffer`] 的默认实现。
///
/// # 逻辑解析（How）
/// - 维护一个字节向量与游标，所有读取操作在越界时返回 `buffer.underflow` 错误且不改变状态；
/// - `split_to` 复制拆分区段并推进父游标，拆出的区段独立拥有所有权。
#[derive(Debug, Clone, Default)]
pub struct HeapSlice {
    data: Vec<u8>,
    cursor: usize,
}

impl HeapSlice {
    /// 基于字节向量构造只读缓冲，游标位于起始处。
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, cursor: 0 }
    }

    fn underflow(&self, requested: usize) -> CoreError {
        CoreError::new(codes::BUFFER_UNDERFLOW, "读取长度超过缓冲剩余字节").with_cause(
            UnderflowDetail {
                requested,
                remaining: self.remaining(),
            },
        )
    }
}

/// 越界明细，作为 [`CoreError`] 的底层原因链露出。
#[derive(Debug)]
struct UnderflowDetail {
    requested: usize,
    remaining: usize,
}

impl core::fmt::Display for UnderflowDetail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "requested {} bytes, {} remaining",
            self.requested, self.remaining
        )
    }
}

impl core::error::Error for UnderflowDetail {}

impl From<Vec<u8>> for HeapSlice {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<bytes::Bytes> for HeapSlice {
    fn from(data: bytes::Bytes) -> Self {
        Self::new(Vec::from(data.as_ref()))
    }
}

impl ReadableBuffer for HeapSlice {
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    fn chunk(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    fn split_to(&mut self, len: usize) -> crate::Result<Box<dyn ReadableBuffer>, CoreError> {
        if len > self.remaining() {
            return Err(self.underflow(len));
        }
        let end = self.cursor + len;
        let slice = self.data[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Box::new(HeapSlice::new(slice)))
    }

    fn advance(&mut self, len: usize) -> crate::Result<(), CoreError> {
        if len > self.remaining() {
            return Err(self.underflow(len));
        }
        self.cursor += len;
        Ok(())
    }

    fn copy_into_slice(&mut self, dst: &mut [u8]) -> crate::Result<(), CoreError> {
        if dst.len() > self.remaining() {
            return Err(self.underflow(dst.len()));
        }
        let end = self.cursor + dst.len();
        dst.copy_from_slice(&self.data[self.cursor..end]);
        self.cursor = end;
        Ok(())
    }

    fn try_into_vec(self: Box<Self>) -> crate::Result<Vec<u8>, CoreError> {
        let remaining = self.data[self.cursor..].to_vec();
        Ok(remaining)
    }
}

impl bytes::Buf for HeapSlice {
    fn remaining(&self) -> usize {
        ReadableBuffer::remaining(self)
    }

    fn chunk(&self) -> &[u8] {
        ReadableBuffer::chunk(self)
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= ReadableBuffer::remaining(self),
            "bytes::Buf::advance 越过缓冲末尾"
        );
        self.cursor += cnt;
    }
}
