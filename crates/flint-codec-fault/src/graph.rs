//! 对象图参与钩子：共享引用的槽位化与延迟修补。
//!
//! # 教案定位（Why）
//! - 异常字段可能引用同一消息中序列化的共享对象，而被引用对象可能出现在流的更后方，
//!   甚至与异常构成环。同步单遍解码无法在第一遍就建立直接引用；
//! - 本模块实现规约中的“间接表”方案：第一遍只记录槽位索引并登记修补回调，
//!   待外部图序列化器读完整个消息的对象图后，由它回填真实引用。
//!
//! # 交互契约（What）
//! - 图的遍历、环检测与实例去重属于外部序列化器的职责，本模块只定义三条边界：
//!   [`GraphSlotAllocator`]（编码侧分配槽位）、[`GraphPatchSink`]（解码侧登记修补）、
//!   [`GraphSlotResolver`]（按槽位取回实例）；
//! - 槽位与修补列表严格限定在单条消息范围内，跨消息保留或解析是协议错误；
//! - 消息解码完成时仍未解析的槽位是致命错误
//!   （[`FaultError::UnresolvedGraphReference`]），整条消息作废。
//!
//! # 实现策略（How）
//! - [`GraphCell`] 以 `Arc + spin::Mutex` 承载共享状态，修补回调持有同一内部单元，
//!   从而能在实例已交付给帧解码器之后填充字段；
//! - [`InMemoryGraphTable`] 作为参考实现，按指针同一性去重并在 `complete` 时统一跑修补，
//!   供测试与单进程内嵌场景使用。
//!
//! # 风险提示（Trade-offs）
//! - 经 [`GraphCell`] 解析出的环持有强 `Arc` 引用；消息范围内由实例表兜底，
//!   若调用方将环状值保留到消息之外，需自行断环或接受泄漏。

use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use crate::error::FaultError;

/// 外部图序列化器实例表中的槽位索引。
///
/// # 契约说明（What）
/// - 槽位仅在单条消息的编解码过程中有意义，不得跨消息保留；
/// - 同一槽位在一条消息内恒指向同一实例（单实例不变量由外部序列化器维护）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    /// 基于线缆上的原始索引构造槽位。
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// 返回槽位的原始索引。
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.0
    }
}

/// 图中共享实例的类型擦除形态。
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// 延迟修补回调：图读取完毕后以真实实例调用一次。
pub type PatchFn = Box<dyn FnOnce(SharedValue) -> Result<(), FaultError> + Send>;

/// 编码侧边界：为共享实例分配（或复用）槽位。
///
/// # 契约说明（What）
/// - **前置条件**：同一实例（指针同一性）重复传入时，实现必须返回同一槽位；
/// - **后置条件**：返回的槽位在本消息内稳定有效。
pub trait GraphSlotAllocator {
    /// 为 `value` 分配槽位；同一实例重复分配返回既有槽位。
    fn allocate_slot(&mut self, value: SharedValue) -> Result<SlotId, FaultError>;
}

/// 解码侧边界：登记“图读完后回填此槽位”的修补回调。
///
/// # 契约说明（What）
/// - 回调必须恰好执行一次，且仅在整条消息的对象图读取完毕之后；
/// - 消息解码失败时，实现必须丢弃全部未执行的回调，释放其持有的单元引用。
pub trait GraphPatchSink {
    /// 登记槽位的修补回调。
    fn register_pending_patch(&mut self, slot: SlotId, patch: PatchFn) -> Result<(), FaultError>;
}

/// 查询侧边界：按槽位取回已读入的共享实例。
pub trait GraphSlotResolver {
    /// 解析槽位对应的实例；槽位未填充时返回
    /// [`FaultError::UnresolvedGraphReference`]。
    fn resolve_slot(&self, slot: SlotId) -> Result<SharedValue, FaultError>;
}

/// 图参与单元的内部共享状态。
#[derive(Debug)]
pub(crate) struct CellShared {
    state: spin::Mutex<CellState>,
}

#[derive(Clone)]
enum CellState {
    /// 尚未绑定任何实例或槽位。
    Empty,
    /// 解码第一遍记录的槽位，等待修补。
    Pending(SlotId),
    /// 已持有真实实例。
    Ready(SharedValue),
}

impl fmt::Debug for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Pending(slot) => f.debug_tuple("Pending").field(slot).finish(),
            Self::Ready(_) => f.write_str("Ready"),
        }
    }
}

impl CellShared {
    fn new(state: CellState) -> Arc<Self> {
        Arc::new(Self {
            state: spin::Mutex::new(state),
        })
    }

    /// 修补回调入口：以真实实例覆盖 Pending 状态。
    pub(crate) fn fill(&self, value: SharedValue) -> Result<(), FaultError> {
        let mut state = self.state.lock();
        *state = CellState::Ready(value);
        Ok(())
    }
}

/// 异常字段中的共享图引用单元。
///
/// # 设计背景（Why）
/// - 生成的异常类型以该单元声明引用共享对象的字段；单元内部共享可变状态，
///   使延迟修补能够在实例已交付之后回填真实引用；
/// - 类型参数 `T` 只约束访问侧的下转型，线缆上始终是槽位索引。
///
/// # 契约说明（What）
/// - **状态机**：Empty →（解码）Pending →（修补）Ready；编码侧要求 Ready；
/// - `try_get` 在 Pending 状态返回 [`FaultError::UnresolvedGraphReference`]，
///   在 Empty 或类型不符时返回 [`FaultError::GraphContractBreached`]；
/// - `clone` 共享同一内部单元：克隆体观察到同一次修补结果。
///
/// # 风险提示（Trade-offs）
/// - Ready 状态持有强 `Arc`；环状图谱在消息之外的生命周期管理由调用方负责。
pub struct GraphCell<T> {
    shared: Arc<CellShared>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> GraphCell<T> {
    /// 构造已持有实例的单元，供编码侧使用。
    #[must_use]
    pub fn ready(value: Arc<T>) -> Self {
        Self {
            shared: CellShared::new(CellState::Ready(value)),
            _marker: PhantomData,
        }
    }

    /// 构造空单元，表示字段尚未绑定实例。
    #[must_use]
    pub fn empty() -> Self {
        Self {
            shared: CellShared::new(CellState::Empty),
            _marker: PhantomData,
        }
    }

    /// 构造等待修补的单元，仅供解码路径使用。
    pub(crate) fn pending(slot: SlotId) -> Self {
        Self {
            shared: CellShared::new(CellState::Pending(slot)),
            _marker: PhantomData,
        }
    }

    /// 取出内部共享单元的句柄，供修补回调捕获。
    pub(crate) fn shared_handle(&self) -> Arc<CellShared> {
        Arc::clone(&self.shared)
    }

    /// 判断单元是否已持有真实实例。
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(*self.shared.state.lock(), CellState::Ready(_))
    }

    /// 判断单元是否仍在等待修补。
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.shared.state.lock(), CellState::Pending(_))
    }

    /// 以具体类型访问实例。
    ///
    /// # 契约说明（What）
    /// - **后置条件**：成功返回的 `Arc<T>` 与单元内部实例共享所有权；
    /// - **错误语义**：Pending 返回未解析槽位错误；Empty 或实例类型与 `T` 不符
    ///   返回图契约违反错误。
    pub fn try_get(&self) -> Result<Arc<T>, FaultError> {
        let state = self.shared.state.lock();
        match &*state {
            CellState::Ready(value) => Arc::clone(value)
                .downcast::<T>()
                .map_err(|_| FaultError::GraphContractBreached {
                    context: "graph-cell-type-mismatch",
                }),
            CellState::Pending(slot) => Err(FaultError::UnresolvedGraphReference { slot: *slot }),
            CellState::Empty => Err(FaultError::GraphContractBreached {
                context: "graph-cell-empty",
            }),
        }
    }

    /// 编码侧取出类型擦除实例；非 Ready 状态视为契约违反。
    pub(crate) fn shared_value(&self) -> Result<SharedValue, FaultError> {
        let state = self.shared.state.lock();
        match &*state {
            CellState::Ready(value) => Ok(Arc::clone(value)),
            CellState::Pending(slot) => Err(FaultError::UnresolvedGraphReference { slot: *slot }),
            CellState::Empty => Err(FaultError::GraphContractBreached {
                context: "graph-cell-empty",
            }),
        }
    }
}

impl<T: Any + Send + Sync> Default for GraphCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for GraphCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for GraphCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        match &*state {
            CellState::Empty => f.write_str("GraphCell::Empty"),
            CellState::Pending(slot) => write!(f, "GraphCell::Pending({})", slot.index()),
            CellState::Ready(_) => f.write_str("GraphCell::Ready"),
        }
    }
}

impl<T: Any + Send + Sync + PartialEq> PartialEq for GraphCell<T> {
    fn eq(&self, other: &Self) -> bool {
        let lhs = self.shared.state.lock().clone();
        let rhs = other.shared.state.lock().clone();
        match (lhs, rhs) {
            (CellState::Empty, CellState::Empty) => true,
            (CellState::Pending(a), CellState::Pending(b)) => a == b,
            (CellState::Ready(a), CellState::Ready(b)) => {
                match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

/// 无图参与的哨兵：类型声明不使用图引用时绑定到编解码上下文。
///
/// # 契约说明（What）
/// - 任何图操作触达哨兵都说明类型元数据与实际编解码行为不一致，
///   一律返回 [`FaultError::GraphContractBreached`]。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGraphRefs;

impl GraphSlotAllocator for NoGraphRefs {
    fn allocate_slot(&mut self, _value: SharedValue) -> Result<SlotId, FaultError> {
        Err(FaultError::GraphContractBreached {
            context: "allocate-without-graph",
        })
    }
}

impl GraphPatchSink for NoGraphRefs {
    fn register_pending_patch(
        &mut self,
        _slot: SlotId,
        _patch: PatchFn,
    ) -> Result<(), FaultError> {
        Err(FaultError::GraphContractBreached {
            context: "patch-without-graph",
        })
    }
}

impl GraphSlotResolver for NoGraphRefs {
    fn resolve_slot(&self, _slot: SlotId) -> Result<SharedValue, FaultError> {
        Err(FaultError::GraphContractBreached {
            context: "resolve-without-graph",
        })
    }
}

/// 单进程内存版实例表，图序列化器边界的参考实现。
///
/// # 设计背景（Why）
/// - 测试与单进程内嵌场景需要一个行为完整的图边界实现：
///   按指针同一性去重、槽位化、延迟修补与未解析检测；
/// - 分布式或跨语言场景应由真正的图序列化器实现同一组 trait。
///
/// # 契约说明（What）
/// - **生命周期**：实例表严格限定单条消息；消息结束（成功或失败）后调用
///   [`reset`](Self::reset) 释放槽位与未执行回调；
/// - [`complete`](Self::complete) 在整条消息读取完毕后执行：逐一解析并运行修补回调，
///   首个无法解析的槽位使消息以 [`FaultError::UnresolvedGraphReference`] 失败。
#[derive(Default)]
pub struct InMemoryGraphTable {
    slots: Vec<Option<SharedValue>>,
    pending: Vec<(SlotId, PatchFn)>,
}

impl InMemoryGraphTable {
    /// 构造空实例表。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 解码侧登记：图序列化器读到的实例按槽位入表。
    pub fn admit(&mut self, slot: SlotId, value: SharedValue) {
        let index = slot.index() as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    /// 当前登记的槽位数量。
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 判断实例表是否为空。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 整条消息读取完毕后执行全部修补回调。
    ///
    /// # 契约说明（What）
    /// - **后置条件**：成功返回时修补列表为空，所有登记过的单元都已持有真实实例；
    /// - **错误语义**：遇到未填充槽位立即失败，剩余回调被丢弃（消息作废）。
    pub fn complete(&mut self) -> Result<(), FaultError> {
        let pending = core::mem::take(&mut self.pending);
        for (slot, patch) in pending {
            let value = self.resolve_slot(slot)?;
            patch(value)?;
        }
        Ok(())
    }

    /// 释放消息范围内的全部状态（槽位与未执行回调）。
    pub fn reset(&mut self) {
        self.slots.clear();
        self.pending.clear();
    }
}

impl fmt::Debug for InMemoryGraphTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryGraphTable")
            .field("slots", &self.slots.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl GraphSlotAllocator for InMemoryGraphTable {
    fn allocate_slot(&mut self, value: SharedValue) -> Result<SlotId, FaultError> {
        let candidate = Arc::as_ptr(&value) as *const ();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(existing) = slot {
                if core::ptr::eq(Arc::as_ptr(existing) as *const (), candidate) {
                    let index = u32::try_from(index).map_err(|_| {
                        FaultError::GraphContractBreached {
                            context: "slot-index-overflow",
                        }
                    })?;
                    return Ok(SlotId::new(index));
                }
            }
        }
        let index =
            u32::try_from(self.slots.len()).map_err(|_| FaultError::GraphContractBreached {
                context: "slot-index-overflow",
            })?;
        self.slots.push(Some(value));
        Ok(SlotId::new(index))
    }
}

impl GraphPatchSink for InMemoryGraphTable {
    fn register_pending_patch(&mut self, slot: SlotId, patch: PatchFn) -> Result<(), FaultError> {
        self.pending.push((slot, patch));
        Ok(())
    }
}

impl GraphSlotResolver for InMemoryGraphTable {
    fn resolve_slot(&self, slot: SlotId) -> Result<SharedValue, FaultError> {
        self.slots
            .get(slot.index() as usize)
            .and_then(|entry| entry.as_ref())
            .map(Arc::clone)
            .ok_or(FaultError::UnresolvedGraphReference { slot })
    }
}
