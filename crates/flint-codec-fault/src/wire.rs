//! 线缆原语层：大端序的基础读写操作。
//!
//! # 教案定位（Why）
//! - segment 与帧协议只关心“type id、长度、标志”这类语义字段，将字节序、长度前缀与
//!   越界防御收拢到本模块，上层逻辑保持可审查的线性结构；
//! - 读写两侧均以 `flint-core` 的缓冲契约为底座，不触碰具体内存实现。
//!
//! # 契约说明（What）
//! - 所有多字节整数使用大端序（网络序）；
//! - 字符串与字节数组以 `u32` 长度前缀编码，字符串必须是合法 UTF-8；
//! - 布尔值占一个字节，仅 `0x00`/`0x01` 合法，其余取值是解码错误而非静默截断。
//!
//! # 实现策略（How）
//! - 读取前先校验 `remaining()`，失败时返回带缺陷标签的
//!   [`FaultError::MalformedSegment`]，且不改变底层游标；
//! - 每个读取方法接受 `context` 标签参数，使错误能指出具体是哪个协议字段被截断。

use alloc::{boxed::Box, string::String, vec, vec::Vec};

use flint_core::{ReadableBuffer, WritableBuffer};

use crate::error::FaultError;

/// 将写入侧的缓冲失败折算为 [`FaultError::BufferExhausted`]。
fn exhausted(needed: usize) -> FaultError {
    FaultError::BufferExhausted { needed }
}

/// 大端序写入游标，包装任意 [`WritableBuffer`] 实现。
///
/// # 契约说明（What）
/// - 写入严格顺序化，调用方负责字段排布；
/// - 底层缓冲拒绝扩容时返回 [`FaultError::BufferExhausted`]，已写入内容的完整性由调用方弃用整帧来保证。
pub(crate) struct WireWriter<'a> {
    out: &'a mut dyn WritableBuffer,
}

impl<'a> WireWriter<'a> {
    pub(crate) fn new(out: &'a mut dyn WritableBuffer) -> Self {
        Self { out }
    }

    pub(crate) fn put_u8(&mut self, value: u8) -> Result<(), FaultError> {
        self.out.put_slice(&[value]).map_err(|_| exhausted(1))
    }

    pub(crate) fn put_bool(&mut self, value: bool) -> Result<(), FaultError> {
        self.put_u8(u8::from(value))
    }

    pub(crate) fn put_u32(&mut self, value: u32) -> Result<(), FaultError> {
        self.out
            .put_slice(&value.to_be_bytes())
            .map_err(|_| exhausted(4))
    }

    pub(crate) fn put_u64(&mut self, value: u64) -> Result<(), FaultError> {
        self.out
            .put_slice(&value.to_be_bytes())
            .map_err(|_| exhausted(8))
    }

    pub(crate) fn put_i64(&mut self, value: i64) -> Result<(), FaultError> {
        self.out
            .put_slice(&value.to_be_bytes())
            .map_err(|_| exhausted(8))
    }

    /// 以 `u32` 长度前缀写入 UTF-8 字符串。
    pub(crate) fn put_str(&mut self, value: &str) -> Result<(), FaultError> {
        self.put_bytes(value.as_bytes())
    }

    /// 以 `u32` 长度前缀写入字节数组。
    pub(crate) fn put_bytes(&mut self, value: &[u8]) -> Result<(), FaultError> {
        let len = u32::try_from(value.len())
            .map_err(|_| FaultError::BufferExhausted { needed: value.len() })?;
        self.out
            .reserve(4 + value.len())
            .map_err(|_| exhausted(4 + value.len()))?;
        self.put_u32(len)?;
        self.out
            .put_slice(value)
            .map_err(|_| exhausted(value.len()))
    }
}

/// 大端序读取游标，包装任意 [`ReadableBuffer`] 实现。
///
/// # 逻辑解析（How）
/// - 每次读取前校验剩余字节数，越界立即返回缺陷标签化的错误，保证“截断必报错，绝不静默误读”；
/// - [`split_body`](Self::split_body) 将定长区段整体拆出，父游标精确落在区段之后——
///   这是 segment 前向兼容跳过依赖的唯一原语。
pub(crate) struct WireReader<'a> {
    src: &'a mut dyn ReadableBuffer,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(src: &'a mut dyn ReadableBuffer) -> Self {
        Self { src }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.src.remaining()
    }

    fn truncated(&self, context: &'static str, needed: usize) -> FaultError {
        FaultError::MalformedSegment {
            reason: context,
            expected: needed,
            actual: self.src.remaining(),
        }
    }

    pub(crate) fn get_u8(&mut self, context: &'static str) -> Result<u8, FaultError> {
        if self.src.remaining() < 1 {
            return Err(self.truncated(context, 1));
        }
        let mut byte = [0u8; 1];
        self.src
            .copy_into_slice(&mut byte)
            .map_err(|_| self.truncated(context, 1))?;
        Ok(byte[0])
    }

    pub(crate) fn get_bool(&mut self, context: &'static str) -> Result<bool, FaultError> {
        match self.get_u8(context)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(FaultError::MalformedSegment {
                reason: "invalid-bool-byte",
                expected: 1,
                actual: other as usize,
            }),
        }
    }

    pub(crate) fn get_u32(&mut self, context: &'static str) -> Result<u32, FaultError> {
        if self.src.remaining() < 4 {
            return Err(self.truncated(context, 4));
        }
        let mut bytes = [0u8; 4];
        self.src
            .copy_into_slice(&mut bytes)
            .map_err(|_| self.truncated(context, 4))?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub(crate) fn get_u64(&mut self, context: &'static str) -> Result<u64, FaultError> {
        if self.src.remaining() < 8 {
            return Err(self.truncated(context, 8));
        }
        let mut bytes = [0u8; 8];
        self.src
            .copy_into_slice(&mut bytes)
            .map_err(|_| self.truncated(context, 8))?;
        Ok(u64::from_be_bytes(bytes))
    }

    pub(crate) fn get_i64(&mut self, context: &'static str) -> Result<i64, FaultError> {
        self.get_u64(context).map(|raw| raw as i64)
    }

    /// 读取 `u32` 长度前缀的字节数组。
    pub(crate) fn get_bytes(&mut self, context: &'static str) -> Result<Vec<u8>, FaultError> {
        let len = self.get_u32(context)? as usize;
        if self.src.remaining() < len {
            return Err(self.truncated(context, len));
        }
        let mut bytes = vec![0u8; len];
        self.src
            .copy_into_slice(&mut bytes)
            .map_err(|_| self.truncated(context, len))?;
        Ok(bytes)
    }

    /// 读取 `u32` 长度前缀的 UTF-8 字符串。
    pub(crate) fn get_str(&mut self, context: &'static str) -> Result<String, FaultError> {
        let bytes = self.get_bytes(context)?;
        let len = bytes.len();
        String::from_utf8(bytes).map_err(|_| FaultError::MalformedSegment {
            reason: "string-not-utf8",
            expected: len,
            actual: len,
        })
    }

    /// 将接下来的 `len` 字节整体拆出为独立缓冲，父游标精确越过该区段。
    pub(crate) fn split_body(
        &mut self,
        len: usize,
    ) -> Result<Box<dyn ReadableBuffer>, FaultError> {
        if self.src.remaining() < len {
            return Err(FaultError::MalformedSegment {
                reason: "length-overrun",
                expected: len,
                actual: self.src.remaining(),
            });
        }
        self.src.split_to(len).map_err(|_| FaultError::MalformedSegment {
            reason: "length-overrun",
            expected: len,
            actual: 0,
        })
    }
}
