//! segment 编解码：继承链中单个层级的线缆记录。
//!
//! # 教案定位（Why）
//! - 异常按继承链逐层上线，每个 segment 精确承载一个层级的字段，
//!   头部的 type id 与显式长度让接收方能在不理解字段内容的情况下保持流对齐；
//! - 前向兼容的核心在这里：接收方不认识某个 segment 时，依声明长度整体跳过即可，
//!   后续 segment 依旧对齐，解码不会因此失败。
//!
//! # 契约说明（What）
//! - 线缆布局：`type_id:str(u32 长度前缀 + UTF-8)`、`segment_length:u32`、
//!   `field_data:bytes[segment_length]`、`has_more:bool(u8)`；
//! - 编码侧保证每个 segment 只包含本层级字段，绝不掺入祖先或派生层级的数据；
//! - 解码侧将载荷经 `split_to` 整体拆出：无论消费方读取多少字节，
//!   父游标都已精确落在 `has_more` 标志上，丢弃载荷缓冲即完成跳过。
//!
//! # 实现策略（How）
//! - 头部截断、声明长度与剩余字节不一致、type id 非 UTF-8 均返回
//!   [`FaultError::MalformedSegment`]，并以静态标签指明缺陷字段；
//! - 跳过的 segment 可折叠为 [`RawSegment`] 转储保留，供未识别异常的诊断路径复用。

use alloc::{boxed::Box, string::String, vec::Vec};

use flint_core::ReadableBuffer;

use crate::error::FaultError;
use crate::wire::{WireReader, WireWriter};

/// segment 转储列表默认的内联容量。
///
/// ### 教案说明（Why）
/// - IDL 生成的异常继承链通常不超过三四层，`SmallVec` 将典型深度的转储直接存储在栈上，
///   避免诊断路径上的堆分配；超出时自动回退到堆，语义与 `Vec` 一致。
pub const DEFAULT_LINEAGE_CAPACITY: usize = 4;

/// 按出现顺序保留的 segment 转储列表。
pub type SegmentVec = smallvec::SmallVec<[RawSegment; DEFAULT_LINEAGE_CAPACITY]>;

/// 构造空的 [`SegmentVec`]，便于调用方无需直接引用 `smallvec` 依赖。
#[must_use]
pub fn new_segment_vec() -> SegmentVec {
    smallvec::SmallVec::new()
}

/// 已脱离流的 segment 原始转储。
///
/// # 契约说明（What）
/// - `body` 是该层级字段的未解释字节，保持线缆原貌；
/// - 转储只用于诊断与通用呈现，绝不回写到线缆。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    /// 该层级的稳定类型标识。
    pub type_id: String,
    /// 未解释的字段字节。
    pub body: Vec<u8>,
}

/// 解码后的 segment：头部语义字段加已拆出的载荷缓冲。
pub(crate) struct Segment {
    pub(crate) type_id: String,
    pub(crate) body: Box<dyn ReadableBuffer>,
    pub(crate) has_more: bool,
}

impl Segment {
    /// 将载荷折叠为 [`RawSegment`] 转储，消费载荷缓冲。
    pub(crate) fn into_dump(self) -> Result<RawSegment, FaultError> {
        let body = self
            .body
            .try_into_vec()
            .map_err(|_| FaultError::MalformedSegment {
                reason: "body-flatten",
                expected: 0,
                actual: 0,
            })?;
        Ok(RawSegment {
            type_id: self.type_id,
            body,
        })
    }
}

/// 写出一个完整 segment：头部、载荷与后继标志。
///
/// # 调用契约（What）
/// - **输入参数**：`body` 必须恰好是该层级字段的完整编码；`has_more` 在根层级之外恒为 `true`；
/// - **后置条件**：成功返回后，输出缓冲追加了一个自描述、可独立跳过的线缆记录。
pub(crate) fn write_segment(
    writer: &mut WireWriter<'_>,
    type_id: &str,
    body: &[u8],
    has_more: bool,
) -> Result<(), FaultError> {
    writer.put_str(type_id)?;
    writer.put_bytes(body)?;
    writer.put_bool(has_more)
}

/// 读入一个完整 segment，载荷以独立缓冲形式拆出。
///
/// # 调用契约（What）
/// - **返回值**：头部语义字段与已拆出的载荷；调用方丢弃载荷缓冲即等价于前向兼容跳过；
/// - **后置条件**：无论载荷随后被消费多少，底层流的游标都已精确落在本 segment 之后；
/// - **错误语义**：头部截断或声明长度超过剩余字节时返回 [`FaultError::MalformedSegment`]，
///   此时流对齐不可信，调用方必须中止整条消息。
pub(crate) fn read_segment(reader: &mut WireReader<'_>) -> Result<Segment, FaultError> {
    let type_id = reader.get_str("type-id")?;
    let declared = reader.get_u32("segment-length")? as usize;
    let body = reader.split_body(declared)?;
    let has_more = reader.get_bool("has-more-flag")?;
    Ok(Segment {
        type_id,
        body,
        has_more,
    })
}
