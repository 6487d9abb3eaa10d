//! 远端异常编解码错误类型定义。
//!
//! # 教案定位（Why）
//! - 解码异常帧时需要向上游明确失败原因，以便调用方区分“输入数据损坏”“对端版本更新”
//!   与“实现 bug”三类情况并采取不同处置；
//! - 与 `frame`/`segment` 模块解耦，避免协议逻辑与错误枚举相互污染，保持模块职责单一。
//!
//! # 使用契约（What）
//! - 除 [`FaultError::UnrecognizedRemoteFault`] 外，所有分支均表示“当前消息无法继续使用”，
//!   外层 RPC 调用应当中止且不得内部重试；
//! - `UnrecognizedRemoteFault` 是协议演进下的预期结果：对端发送了本端不认识的异常层级，
//!   错误中携带最派生 type id 与原始字段转储，调用方可记录日志或呈现通用错误；
//! - 所有变体实现 `Clone`/`PartialEq`，便于测试直接断言具体错误形态。
//!
//! # 设计考量（How）
//! - 错误枚举仅存储整型、静态字符串与已脱离流的字节转储，确保 `no_std + alloc` 可用；
//! - [`FaultError::code`] 将每个变体映射到稳定错误码，供日志与指标侧做机读分类；
//! - 通过实现 `Display` 输出友好提示，配合 `#[cfg(feature = "std")]` 的 `Error` 实现接入常规错误栈。

use alloc::string::{String, ToString};
use core::fmt;

use flint_core::CoreError;

use crate::graph::SlotId;
use crate::segment::SegmentVec;

/// 远端异常编解码的稳定错误码表。
///
/// # 契约说明（What）
/// - 常量一经发布不得变更语义，命名遵循 `<域>.<语义>` 约定；
/// - 与 [`flint_core::error::codes`] 共享同一命名空间规范，调用方可统一筛选。
pub mod codes {
    /// segment 头部被截断、声明长度与剩余字节不一致或字段取值非法。
    pub const FAULT_MALFORMED_SEGMENT: &str = "fault.malformed_segment";
    /// 帧起止标记缺失、帧过早结束或 segment 链与已注册谱系不一致。
    pub const FAULT_MALFORMED_FRAME: &str = "fault.malformed_frame";
    /// 整个帧中没有任何 segment 的 type id 命中本地注册表。
    pub const FAULT_UNRECOGNIZED: &str = "fault.unrecognized";
    /// 对象图序列化器未能在消息结束前解析某个引用槽位。
    pub const FAULT_UNRESOLVED_SLOT: &str = "fault.unresolved_slot";
    /// 图参与契约被违反（未附加序列化器、空引用单元、类型不符）。
    pub const FAULT_GRAPH_CONTRACT: &str = "fault.graph_contract";
}

/// 远端异常编解码过程中可能出现的错误。
///
/// ## 教案解读（Why）
/// - 每个分支对应协议的关键约束：帧必须以起止标记包裹、segment 声明长度必须与剩余字节一致、
///   发送方必须携带完整祖先链等；
/// - 明确的错误形态帮助排查对端实现的协议偏差，同时在编写解码逻辑时形成自检清单。
///
/// ## 契约定义（What）
/// - 触发错误后不应假定解码函数已消费全部输入；唯一的例外是
///   [`UnrecognizedRemoteFault`](Self::UnrecognizedRemoteFault)：返回它时游标已精确越过帧结束标记，
///   外层信封可以继续处理流中的后续内容。
///
/// ## 注意事项（Trade-offs）
/// - `MalformedSegment` 以 `reason` 标签区分具体缺陷，`expected`/`actual` 的量纲随标签而定
///   （截断时为字节数，字段非法时为合法值与实际值）；这比逐缺陷建变体更紧凑，代价是
///   调用方若需逐标签分流，须依赖文档中登记的标签集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultError {
    /// segment 头部或载荷违反声明布局，流对齐已不可信。
    MalformedSegment {
        /// 静态缺陷标签（如 `type-id-truncated`、`length-overrun`、`invalid-bool-byte`）。
        reason: &'static str,
        /// 期望的数量（字节数或合法取值）。
        expected: usize,
        /// 实际观测到的数量。
        actual: usize,
    },
    /// 帧起止标记缺失，或 segment 链与命中工厂的谱系不一致。
    MalformedFrame {
        /// 静态缺陷标签（如 `missing-start`、`missing-end`、`lineage-divergence`）。
        reason: &'static str,
        /// 期望标记处实际读到的字节；因截断而缺失时为 `None`。
        found: Option<u8>,
    },
    /// 帧内所有 segment 的 type id 均未命中本地注册表。
    UnrecognizedRemoteFault {
        /// 帧中最派生（第一个）segment 的 type id。
        most_derived: String,
        /// 按出现顺序保留的原始 segment 转储，供诊断与通用呈现使用。
        segments: SegmentVec,
    },
    /// 对象图序列化器在消息读取完毕后仍无法填补的引用槽位。
    UnresolvedGraphReference {
        /// 未解析的槽位。
        slot: SlotId,
    },
    /// 图参与契约被违反：类型声明与实际图操作不匹配。
    GraphContractBreached {
        /// 静态说明违反场景的标签（如 `encode-graph-detached`、`graph-cell-empty`）。
        context: &'static str,
    },
    /// 出站缓冲拒绝继续提供容量（池耗尽或背压）。
    BufferExhausted {
        /// 本次写入需要的字节数。
        needed: usize,
    },
    /// 调用被外部取消信号在帧或 segment 边界终止。
    Cancelled,
}

impl FaultError {
    /// 返回变体对应的稳定错误码。
    ///
    /// # 契约说明（What）
    /// - 返回值恒为 `'static`，与 [`codes`] 及 `flint-core` 的错误码表一致；
    /// - 同一变体的错误码跨版本稳定，日志与指标侧可安全依赖。
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedSegment { .. } => codes::FAULT_MALFORMED_SEGMENT,
            Self::MalformedFrame { .. } => codes::FAULT_MALFORMED_FRAME,
            Self::UnrecognizedRemoteFault { .. } => codes::FAULT_UNRECOGNIZED,
            Self::UnresolvedGraphReference { .. } => codes::FAULT_UNRESOLVED_SLOT,
            Self::GraphContractBreached { .. } => codes::FAULT_GRAPH_CONTRACT,
            Self::BufferExhausted { .. } => flint_core::error::codes::BUFFER_OVERFLOW,
            Self::Cancelled => flint_core::error::codes::RPC_CANCELLED,
        }
    }

    /// 桥接为契约层 [`CoreError`]，供统一的错误出口使用。
    #[must_use]
    pub fn into_core(self) -> CoreError {
        CoreError::new(self.code(), self.to_string())
    }
}

impl fmt::Display for FaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSegment {
                reason,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "segment 布局非法（{reason}）：期望 {expected}，实际 {actual}"
                )
            }
            Self::MalformedFrame { reason, found } => match found {
                Some(byte) => write!(f, "异常帧结构非法（{reason}），读到字节 0x{byte:02X}"),
                None => write!(f, "异常帧结构非法（{reason}）"),
            },
            Self::UnrecognizedRemoteFault {
                most_derived,
                segments,
            } => {
                write!(
                    f,
                    "远端异常 {most_derived} 未在本地注册（共 {} 个 segment 被保留）",
                    segments.len()
                )
            }
            Self::UnresolvedGraphReference { slot } => {
                write!(f, "引用槽位 {} 在消息结束后仍未解析", slot.index())
            }
            Self::GraphContractBreached { context } => {
                write!(f, "图参与契约被违反（{context}）")
            }
            Self::BufferExhausted { needed } => {
                write!(f, "出站缓冲无法再提供 {needed} 字节容量")
            }
            Self::Cancelled => f.write_str("调用已被取消，解码在检查边界终止"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FaultError {}
