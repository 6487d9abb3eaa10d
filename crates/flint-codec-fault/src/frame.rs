//! 异常帧协议：segment 链的包裹、派发与前向兼容跳过。
//!
//! # 教案定位（Why）
//! - 一条异常以“帧”形态上线：起始标记、按继承链从最派生到根逐层排列的 segment、
//!   结束标记。发送方恒发完整祖先链，这是派发与跳过逻辑赖以成立的硬性协议不变量；
//! - 接收方据注册表逐 segment 判定：第一个命中本地工厂的 type id 获胜，
//!   更派生而本地不认识的 segment 依声明长度跳过——两端因此可以独立演进。
//!
//! # 契约说明（What）
//! - [`write_fault`]/[`read_fault`] 每次恰好处理一条异常帧；外层 RPC 信封保证
//!   调用时流已定位在异常载荷处，并期望返回时游标精确落在帧结束标记之后
//!   （成功路径与可恢复的未识别路径均满足；帧损坏时流已不可信，不作游标承诺）；
//! - 取消信号在帧起点与每个 segment 边界被检查，触发时以
//!   [`FaultError::Cancelled`] 返回，半成品实例不会流出；
//! - 图参与在帧前置阶段核对：类型声明参与而上下文未附加序列化器时立即失败。
//!
//! # 实现策略（How）
//! - 编码侧将每层字段先写入可复用的暂存缓冲，再以“type id、长度、载荷、后继标志”
//!   包裹为 segment，根层级的后继标志为 `false`；
//! - 解码侧命中工厂后，余下 segment 必须与工厂谱系逐一吻合直至根；
//!   任何偏离（提前结束、超出谱系、type id 不符）都是帧损坏而非可跳过差异。

use alloc::{boxed::Box, string::String, sync::Arc};

use flint_core::{
    CancelSignal, HeapBuffer, NeverCancel, ReadableBuffer, WritableBuffer,
};

use crate::error::FaultError;
use crate::fault::{BodyReader, BodyWriter, RemoteFault};
use crate::graph::{GraphPatchSink, GraphSlotAllocator, NoGraphRefs};
use crate::registry::{FaultFactory, FaultRegistry};
use crate::segment::{Segment, new_segment_vec, read_segment, write_segment};
use crate::wire::{WireReader, WireWriter};

/// 帧起始标记。
pub const FRAME_START: u8 = 0xF1;
/// 帧结束标记。
pub const FRAME_END: u8 = 0xF2;

const NEVER_CANCEL: NeverCancel = NeverCancel;

/// 编码侧的图序列化器绑定。
enum AllocatorBinding<'a> {
    /// 未附加序列化器；任何图操作都是契约违反。
    Detached(NoGraphRefs),
    /// 已附加外部序列化器。
    Attached(&'a mut dyn GraphSlotAllocator),
}

/// 异常帧编码上下文。
///
/// # 契约说明（What）
/// - 不携带图引用的异常可使用 [`detached`](Self::detached) 上下文；
/// - 声明 `uses_graph_refs` 的异常必须经 [`with_graph`](Self::with_graph)
///   附加外部序列化器，否则编码在帧前置检查即失败。
pub struct EncodeContext<'a> {
    graph: AllocatorBinding<'a>,
}

impl<'a> EncodeContext<'a> {
    /// 构造无图参与的编码上下文。
    #[must_use]
    pub fn detached() -> Self {
        Self {
            graph: AllocatorBinding::Detached(NoGraphRefs),
        }
    }

    /// 构造附加了图序列化器的编码上下文。
    #[must_use]
    pub fn with_graph(graph: &'a mut dyn GraphSlotAllocator) -> Self {
        Self {
            graph: AllocatorBinding::Attached(graph),
        }
    }

    fn is_detached(&self) -> bool {
        matches!(self.graph, AllocatorBinding::Detached(_))
    }

    fn allocator(&mut self) -> &mut dyn GraphSlotAllocator {
        match &mut self.graph {
            AllocatorBinding::Detached(sentinel) => sentinel,
            AllocatorBinding::Attached(graph) => &mut **graph,
        }
    }
}

/// 解码侧的修补登记绑定。
enum PatchBinding<'a> {
    Detached(NoGraphRefs),
    Attached(&'a mut dyn GraphPatchSink),
}

impl<'a> PatchBinding<'a> {
    fn is_detached(&self) -> bool {
        matches!(self, Self::Detached(_))
    }

    fn sink(&mut self) -> &mut dyn GraphPatchSink {
        match self {
            Self::Detached(sentinel) => sentinel,
            Self::Attached(sink) => &mut **sink,
        }
    }
}

/// 异常帧解码上下文。
///
/// # 契约说明（What）
/// - `registry` 是冻结后的只读注册表，可在多条在途消息间共享；
/// - 修补登记与取消信号按需经 Builder 方法附加，默认分别为“无图参与”与“永不取消”。
pub struct DecodeContext<'a> {
    registry: &'a FaultRegistry,
    patches: PatchBinding<'a>,
    cancel: &'a dyn CancelSignal,
}

impl<'a> DecodeContext<'a> {
    /// 基于注册表构造解码上下文。
    #[must_use]
    pub fn new(registry: &'a FaultRegistry) -> Self {
        Self {
            registry,
            patches: PatchBinding::Detached(NoGraphRefs),
            cancel: &NEVER_CANCEL,
        }
    }

    /// 附加图修补登记通道。
    #[must_use]
    pub fn with_patches(mut self, patches: &'a mut dyn GraphPatchSink) -> Self {
        self.patches = PatchBinding::Attached(patches);
        self
    }

    /// 附加取消信号探针。
    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a dyn CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

/// 将一条异常实例编码为完整的帧。
///
/// # 调用契约（What）
/// - **输入参数**：`fault` 为待编码实例；`out` 为外层信封提供的输出缓冲；
/// - **前置条件**：实例谱系非空；声明图参与时上下文必须已附加序列化器；
/// - **后置条件**：成功返回时 `out` 追加了一个自描述完整帧；失败时帧内容不完整，
///   调用方必须弃用整条消息（错误不可内部重试）。
pub fn write_fault(
    fault: &dyn RemoteFault,
    out: &mut dyn WritableBuffer,
    ctx: &mut EncodeContext<'_>,
) -> Result<(), FaultError> {
    let lineage = fault.lineage();
    if lineage.is_empty() {
        return Err(FaultError::MalformedFrame {
            reason: "empty-lineage",
            found: None,
        });
    }
    if fault.uses_graph_refs() && ctx.is_detached() {
        return Err(FaultError::GraphContractBreached {
            context: "encode-graph-detached",
        });
    }

    let mut writer = WireWriter::new(out);
    writer.put_u8(FRAME_START)?;

    let mut scratch = HeapBuffer::with_capacity(64);
    for (level, type_id) in lineage.iter().enumerate() {
        scratch.clear();
        {
            let mut body = BodyWriter::new(&mut scratch, ctx.allocator());
            fault.encode_segment(level, &mut body)?;
        }
        write_segment(
            &mut writer,
            type_id,
            scratch.as_slice(),
            level + 1 < lineage.len(),
        )?;
    }

    writer.put_u8(FRAME_END)?;

    #[cfg(feature = "observability")]
    tracing::debug!(
        type_id = fault.type_id(),
        segments = lineage.len(),
        "异常帧编码完成"
    );

    Ok(())
}

/// 命中工厂后的解码进度。
struct MatchedFault {
    factory: Arc<dyn FaultFactory>,
    instance: Box<dyn RemoteFault>,
    next_level: usize,
}

/// 从流中解码一条异常帧。
///
/// # 调用契约（What）
/// - **返回值**：物化的具体异常实例；若帧内所有 type id 均未注册，返回
///   [`FaultError::UnrecognizedRemoteFault`]（此时游标已越过帧结束标记，
///   外层信封可以继续消费流中的后续内容）；
/// - **错误语义**：帧/segment 损坏、图契约违反与取消均为致命错误，消息作废；
/// - **后置条件**：成功与未识别两条路径下，游标精确落在帧结束标记之后。
///
/// # 实现细节（How）
/// 1. 核对帧起始标记，随后逐 segment 读取；
/// 2. 未命中注册表的 segment 依声明长度跳过并保留原始转储；
/// 3. 首个命中的 segment 物化实例并填充本层字段，其后每个 segment
///    必须与工厂谱系逐一吻合、依序填充，直至根层级（`has_more == false`）；
/// 4. 核对帧结束标记，返回实例或未识别错误。
pub fn read_fault(
    src: &mut dyn ReadableBuffer,
    ctx: &mut DecodeContext<'_>,
) -> Result<Box<dyn RemoteFault>, FaultError> {
    if ctx.cancel.is_cancelled() {
        return Err(FaultError::Cancelled);
    }

    let registry = ctx.registry;
    let mut reader = WireReader::new(src);

    if reader.remaining() < 1 {
        return Err(FaultError::MalformedFrame {
            reason: "missing-start",
            found: None,
        });
    }
    let start = reader.get_u8("frame-start")?;
    if start != FRAME_START {
        return Err(FaultError::MalformedFrame {
            reason: "missing-start",
            found: Some(start),
        });
    }

    let mut matched: Option<MatchedFault> = None;
    let mut most_derived: Option<String> = None;
    let mut dumps = new_segment_vec();

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(FaultError::Cancelled);
        }

        let segment = read_segment(&mut reader)?;
        if most_derived.is_none() {
            most_derived = Some(segment.type_id.clone());
        }
        let has_more = segment.has_more;

        if let Some(progress) = matched.as_mut() {
            let lineage = progress.factory.lineage();
            if progress.next_level >= lineage.len() {
                return Err(FaultError::MalformedFrame {
                    reason: "lineage-overrun",
                    found: None,
                });
            }
            if segment.type_id != lineage[progress.next_level] {
                return Err(FaultError::MalformedFrame {
                    reason: "lineage-divergence",
                    found: None,
                });
            }
            feed_segment(
                progress.instance.as_mut(),
                progress.next_level,
                segment,
                ctx.patches.sink(),
            )?;
            progress.next_level += 1;
            if !has_more {
                if progress.next_level != lineage.len() {
                    return Err(FaultError::MalformedFrame {
                        reason: "lineage-underrun",
                        found: None,
                    });
                }
                break;
            }
        } else if let Some(factory) = registry.lookup(&segment.type_id) {
            let factory = Arc::clone(factory);
            if factory.uses_graph_refs() && ctx.patches.is_detached() {
                return Err(FaultError::GraphContractBreached {
                    context: "decode-graph-detached",
                });
            }
            let mut instance = factory.instantiate();
            feed_segment(instance.as_mut(), 0, segment, ctx.patches.sink())?;
            if !has_more && factory.lineage().len() != 1 {
                return Err(FaultError::MalformedFrame {
                    reason: "lineage-underrun",
                    found: None,
                });
            }
            let chain_complete = !has_more;
            matched = Some(MatchedFault {
                factory,
                instance,
                next_level: 1,
            });
            if chain_complete {
                break;
            }
        } else {
            #[cfg(feature = "observability")]
            tracing::debug!(type_id = %segment.type_id, "跳过未注册的派生 segment");
            dumps.push(segment.into_dump()?);
            if !has_more {
                break;
            }
        }
    }

    if reader.remaining() < 1 {
        return Err(FaultError::MalformedFrame {
            reason: "missing-end",
            found: None,
        });
    }
    let end = reader.get_u8("frame-end")?;
    if end != FRAME_END {
        return Err(FaultError::MalformedFrame {
            reason: "missing-end",
            found: Some(end),
        });
    }

    match matched {
        Some(progress) => {
            #[cfg(feature = "observability")]
            tracing::debug!(
                fault = %progress.instance.describe(),
                skipped = dumps.len(),
                "异常帧解码完成"
            );
            Ok(progress.instance)
        }
        None => {
            let most_derived = most_derived.unwrap_or_default();
            #[cfg(feature = "observability")]
            tracing::debug!(
                most_derived = %most_derived,
                segments = dumps.len(),
                "异常帧未命中任何本地类型，回退为未识别异常"
            );
            Err(FaultError::UnrecognizedRemoteFault {
                most_derived,
                segments: dumps,
            })
        }
    }
}

/// 将单个 segment 的载荷喂给实例的对应层级。
///
/// 载荷缓冲在此函数结束时被丢弃：实例未读完的尾部字节随之越过，
/// 浅于发送方的本地层级定义不会破坏流对齐。
fn feed_segment(
    instance: &mut dyn RemoteFault,
    level: usize,
    segment: Segment,
    patches: &mut dyn GraphPatchSink,
) -> Result<(), FaultError> {
    let mut body = segment.body;
    let mut reader = BodyReader::new(body.as_mut(), patches);
    instance.decode_segment(level, &mut reader)
}

#[cfg(test)]
mod tests {
    //! 针对“发送方必须携带完整祖先链”硬性不变量的单元测试：
    //! 这些畸形帧无法经正常编码路径产生，只能手工拼装。

    use super::*;
    use crate::registry::{FaultRegistryBuilder, TypedFaultFactory};
    use alloc::vec::Vec;
    use core::any::Any;
    use flint_core::HeapSlice;

    const MID_LINEAGE: &[&str] = &["::t::Mid", "::t::Base"];

    #[derive(Debug, Default)]
    struct MidFault;

    impl RemoteFault for MidFault {
        fn lineage(&self) -> &'static [&'static str] {
            MID_LINEAGE
        }

        fn encode_segment(
            &self,
            _level: usize,
            _body: &mut BodyWriter<'_>,
        ) -> Result<(), FaultError> {
            Ok(())
        }

        fn decode_segment(
            &mut self,
            _level: usize,
            _body: &mut BodyReader<'_>,
        ) -> Result<(), FaultError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn mid_registry() -> FaultRegistry {
        let mut builder = FaultRegistryBuilder::new();
        builder
            .register(Arc::new(TypedFaultFactory::new(MID_LINEAGE, || {
                Box::new(MidFault)
            })))
            .expect("注册应成功");
        builder.build()
    }

    /// 手工拼装帧：`(type_id, has_more)` 列表，载荷一律为空。
    fn hand_built_frame(segments: &[(&str, bool)]) -> Vec<u8> {
        let mut out = HeapBuffer::new();
        let mut writer = WireWriter::new(&mut out);
        writer.put_u8(FRAME_START).expect("写入起始标记");
        for (type_id, has_more) in segments {
            write_segment(&mut writer, type_id, &[], *has_more).expect("写入 segment");
        }
        writer.put_u8(FRAME_END).expect("写入结束标记");
        out.into_vec()
    }

    fn decode(bytes: Vec<u8>) -> Result<Box<dyn RemoteFault>, FaultError> {
        let registry = mid_registry();
        let mut slice = HeapSlice::new(bytes);
        let mut ctx = DecodeContext::new(&registry);
        read_fault(&mut slice, &mut ctx)
    }

    #[test]
    fn lineage_divergence_is_malformed_frame() {
        let bytes = hand_built_frame(&[("::t::Mid", true), ("::t::Other", false)]);
        let err = decode(bytes).expect_err("谱系偏离必须报错");
        assert_eq!(
            err,
            FaultError::MalformedFrame {
                reason: "lineage-divergence",
                found: None,
            }
        );
    }

    #[test]
    fn premature_chain_end_is_lineage_underrun() {
        let bytes = hand_built_frame(&[("::t::Mid", false)]);
        let err = decode(bytes).expect_err("祖先链缺失必须报错");
        assert_eq!(
            err,
            FaultError::MalformedFrame {
                reason: "lineage-underrun",
                found: None,
            }
        );
    }

    #[test]
    fn segments_beyond_root_are_lineage_overrun() {
        let bytes =
            hand_built_frame(&[("::t::Mid", true), ("::t::Base", true), ("::t::Extra", false)]);
        let err = decode(bytes).expect_err("根层级之后的 segment 必须报错");
        assert_eq!(
            err,
            FaultError::MalformedFrame {
                reason: "lineage-overrun",
                found: None,
            }
        );
    }

    #[test]
    fn frame_without_segments_is_rejected() {
        let mut out = HeapBuffer::new();
        let mut writer = WireWriter::new(&mut out);
        writer.put_u8(FRAME_START).expect("写入起始标记");
        writer.put_u8(FRAME_END).expect("写入结束标记");

        let err = decode(out.into_vec()).expect_err("空帧必须报错");
        assert!(matches!(err, FaultError::MalformedSegment { .. }));
    }
}
