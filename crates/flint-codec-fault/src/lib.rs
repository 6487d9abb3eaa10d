#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # flint-codec-fault
//!
//! ## 教案目的（Why）
//! - **定位**：二进制 RPC 传输中“远端异常”的封送层，负责把 IDL 编译出的异常继承链
//!   写上线缆、再在对端还原，同时容忍两端各自独立演进。
//! - **架构角色**：外层 RPC 信封在响应携带异常时恰好调用一次
//!   [`write_fault`]/[`read_fault`]；本 crate 不关心信封、传输帧与压缩。
//! - **设计策略**：异常按继承链逐层切分为自描述 segment（type id、显式长度、后继标志），
//!   接收方凭注册表逐 segment 派发——第一个命中的 type id 获胜，不认识的派生层级
//!   依声明长度跳过，流对齐始终不被破坏。
//!
//! ## 交互契约（What）
//! - **依赖输入**：依托 `flint-core` 的
//!   [`ReadableBuffer`](flint_core::ReadableBuffer)/[`WritableBuffer`](flint_core::WritableBuffer)
//!   缓冲契约读写字节流；
//! - **输出职责**：提供异常帧的编解码入口、类型注册表、以及共享对象图引用的
//!   槽位化与延迟修补钩子；
//! - **前置约束**：注册表必须在并发解码流量开始之前冻结；槽位与修补列表严格
//!   限定单条消息范围。
//!
//! ## 实现策略（How）
//! - **实施步骤**：
//!   1. `wire`/`segment` 承担大端序原语与单层级记录的编解码；
//!   2. `frame` 驱动完整帧：标记包裹、谱系派发、前向兼容跳过与帧尾校验；
//!   3. `registry` 提供“注册期 Builder → 冻结只读表”的一次性映射；
//!   4. `graph` 实现共享引用的槽位间接层与消息末尾的统一修补。
//! - **技术考量**：解码全程同步单遍，取消只在帧与 segment 边界被观察；
//!   未识别异常消费完整帧后以错误返回，携带最派生 type id 与原始转储。
//!
//! ## 风险提示（Trade-offs）
//! - **复制权衡**：segment 载荷经 `split_to` 拆出（堆实现为复制）；异常帧通常远小于
//!   MTU，复制开销可控，换取跳过逻辑的直观与可审查；
//! - **演进风险**：协议依赖“发送方恒发完整祖先链”这一硬性不变量，省略祖先 segment
//!   的实现会被判定为帧损坏；新增字段只能追加在层级尾部，否则旧端字段错位。

extern crate alloc;

mod error;
mod fault;
mod frame;
mod graph;
mod registry;
mod segment;
mod wire;

pub use crate::{
    error::{FaultError, codes},
    fault::{BodyReader, BodyWriter, RemoteFault},
    frame::{DecodeContext, EncodeContext, FRAME_END, FRAME_START, read_fault, write_fault},
    graph::{
        GraphCell, GraphPatchSink, GraphSlotAllocator, GraphSlotResolver, InMemoryGraphTable,
        NoGraphRefs, PatchFn, SharedValue, SlotId,
    },
    registry::{FaultFactory, FaultRegistry, FaultRegistryBuilder, TypedFaultFactory},
    segment::{DEFAULT_LINEAGE_CAPACITY, RawSegment, SegmentVec, new_segment_vec},
};
