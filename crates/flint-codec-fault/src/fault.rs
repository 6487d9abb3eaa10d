//! 远端异常实例模型与层级编解码游标。
//!
//! # 教案定位（Why）
//! - IDL 编译器为每个异常定义生成一个具体类型；线缆协议需要的并非运行时继承，
//!   而是“每层一段字段”的有序描述：本模块以 [`RemoteFault`] trait 将其约束为
//!   静态谱系元数据加逐层编解码回调；
//! - [`BodyWriter`]/[`BodyReader`] 是生成代码与线缆原语之间的唯一通道，
//!   图引用字段的槽位化与修补登记也收拢于此，生成代码不触碰图序列化器。
//!
//! # 契约说明（What）
//! - [`RemoteFault::lineage`] 返回从最派生层级到根的完整 type id 链；
//!   空谱系是实现缺陷，帧协议会在编码入口拒绝；
//! - `encode_segment`/`decode_segment` 必须恰好处理 `level` 对应层级声明的字段，
//!   绝不读写祖先或派生层级的数据；
//! - 解码侧未读完的层级字节由帧协议依声明长度越过，实现无需自行对齐。

use alloc::{borrow::Cow, boxed::Box, string::String, vec::Vec};
use core::any::Any;
use core::fmt;

use flint_core::{ReadableBuffer, WritableBuffer};

use crate::error::FaultError;
use crate::graph::{GraphCell, GraphPatchSink, GraphSlotAllocator, SlotId};
use crate::wire::{WireReader, WireWriter};

/// 远端异常实例的对象安全契约。
///
/// # 设计背景（Why）
/// - 对应 IDL 中的异常定义：每个具体类型携带自身的谱系元数据与逐层字段编解码逻辑；
/// - trait 对象形态允许帧协议在不知道具体类型的情况下驱动编解码，
///   应用侧经 [`as_any`](Self::as_any) 下转型取回具体类型。
///
/// # 契约说明（What）
/// - **谱系不变量**：`lineage()` 非空，首元素等于 `type_id()`，末元素是继承链的根；
/// - **图参与声明**：`uses_graph_refs()` 为 `false` 时，编解码回调不得触碰图引用通道；
/// - **线程语义**：实例须满足 `Send + Sync`，解码过程本身单线程、单遍完成。
pub trait RemoteFault: fmt::Debug + Send + Sync {
    /// 返回最派生层级的稳定类型标识。
    fn type_id(&self) -> &'static str {
        self.lineage().first().copied().unwrap_or_default()
    }

    /// 返回从最派生层级到根的完整 type id 链。
    fn lineage(&self) -> &'static [&'static str];

    /// 声明本类型（或任一祖先层级）的字段是否引用共享对象图。
    fn uses_graph_refs(&self) -> bool {
        false
    }

    /// 面向诊断输出的一行描述，默认复用 type id。
    fn describe(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.type_id())
    }

    /// 编码 `level` 层级（`lineage()[level]`）声明的全部字段。
    fn encode_segment(&self, level: usize, body: &mut BodyWriter<'_>) -> Result<(), FaultError>;

    /// 解码 `level` 层级声明的全部字段，按编码时的字段顺序读取。
    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError>;

    /// 暴露 `Any` 视图，供应用侧下转型到具体异常类型。
    fn as_any(&self) -> &dyn Any;
}

/// 单个层级字段的编码游标。
///
/// # 逻辑解析（How）
/// - 字段经线缆原语顺序写入暂存缓冲，帧协议随后以声明长度包裹成 segment；
/// - 图引用字段先向外部序列化器换取槽位，再把槽位索引当作普通 `u32` 上线。
pub struct BodyWriter<'a> {
    wire: WireWriter<'a>,
    graph: &'a mut dyn GraphSlotAllocator,
}

impl<'a> BodyWriter<'a> {
    pub(crate) fn new(
        out: &'a mut dyn WritableBuffer,
        graph: &'a mut dyn GraphSlotAllocator,
    ) -> Self {
        Self {
            wire: WireWriter::new(out),
            graph,
        }
    }

    /// 写入单字节整数。
    pub fn put_u8(&mut self, value: u8) -> Result<(), FaultError> {
        self.wire.put_u8(value)
    }

    /// 写入布尔值（一个字节，`0x00`/`0x01`）。
    pub fn put_bool(&mut self, value: bool) -> Result<(), FaultError> {
        self.wire.put_bool(value)
    }

    /// 写入大端序 32 位无符号整数。
    pub fn put_u32(&mut self, value: u32) -> Result<(), FaultError> {
        self.wire.put_u32(value)
    }

    /// 写入大端序 64 位无符号整数。
    pub fn put_u64(&mut self, value: u64) -> Result<(), FaultError> {
        self.wire.put_u64(value)
    }

    /// 写入大端序 64 位有符号整数。
    pub fn put_i64(&mut self, value: i64) -> Result<(), FaultError> {
        self.wire.put_i64(value)
    }

    /// 写入 `u32` 长度前缀的 UTF-8 字符串。
    pub fn put_str(&mut self, value: &str) -> Result<(), FaultError> {
        self.wire.put_str(value)
    }

    /// 写入 `u32` 长度前缀的字节数组。
    pub fn put_bytes(&mut self, value: &[u8]) -> Result<(), FaultError> {
        self.wire.put_bytes(value)
    }

    /// 将共享图引用替换为槽位索引写入。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：单元必须处于 Ready 状态；实例的去重与环检测由外部序列化器完成；
    /// - **错误语义**：Pending 单元返回未解析槽位错误，Empty 单元与未附加序列化器
    ///   均为图契约违反。
    pub fn put_graph_ref<T: Any + Send + Sync>(
        &mut self,
        cell: &GraphCell<T>,
    ) -> Result<(), FaultError> {
        let value = cell.shared_value()?;
        let slot = self.graph.allocate_slot(value)?;
        self.wire.put_u32(slot.index())
    }
}

/// 单个层级字段的解码游标。
///
/// # 逻辑解析（How）
/// - 游标只覆盖本层级经 `split_to` 拆出的载荷区段，读取天然无法越入相邻 segment；
/// - 图引用字段读出槽位索引后登记修补回调，第一遍解码绝不建立直接引用。
pub struct BodyReader<'a> {
    wire: WireReader<'a>,
    patches: &'a mut dyn GraphPatchSink,
}

impl<'a> BodyReader<'a> {
    pub(crate) fn new(
        body: &'a mut dyn ReadableBuffer,
        patches: &'a mut dyn GraphPatchSink,
    ) -> Self {
        Self {
            wire: WireReader::new(body),
            patches,
        }
    }

    /// 本层级载荷中尚未读取的字节数。
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.wire.remaining()
    }

    /// 读取单字节整数。
    pub fn get_u8(&mut self) -> Result<u8, FaultError> {
        self.wire.get_u8("field-u8")
    }

    /// 读取布尔值。
    pub fn get_bool(&mut self) -> Result<bool, FaultError> {
        self.wire.get_bool("field-bool")
    }

    /// 读取大端序 32 位无符号整数。
    pub fn get_u32(&mut self) -> Result<u32, FaultError> {
        self.wire.get_u32("field-u32")
    }

    /// 读取大端序 64 位无符号整数。
    pub fn get_u64(&mut self) -> Result<u64, FaultError> {
        self.wire.get_u64("field-u64")
    }

    /// 读取大端序 64 位有符号整数。
    pub fn get_i64(&mut self) -> Result<i64, FaultError> {
        self.wire.get_i64("field-i64")
    }

    /// 读取 `u32` 长度前缀的 UTF-8 字符串。
    pub fn get_str(&mut self) -> Result<String, FaultError> {
        self.wire.get_str("field-string")
    }

    /// 读取 `u32` 长度前缀的字节数组。
    pub fn get_bytes(&mut self) -> Result<Vec<u8>, FaultError> {
        self.wire.get_bytes("field-bytes")
    }

    /// 读取共享图引用：记录槽位并登记延迟修补。
    ///
    /// # 契约说明（What）
    /// - **返回值**：Pending 状态的 [`GraphCell`]；真实实例在整条消息的对象图
    ///   读取完毕后由外部序列化器回填；
    /// - **后置条件**：修补回调已登记；消息解码失败时回调随修补列表一并丢弃。
    pub fn get_graph_ref<T: Any + Send + Sync>(&mut self) -> Result<GraphCell<T>, FaultError> {
        let slot = SlotId::new(self.wire.get_u32("field-graph-slot")?);
        let cell = GraphCell::pending(slot);
        let handle = cell.shared_handle();
        self.patches
            .register_pending_patch(slot, Box::new(move |value| handle.fill(value)))?;
        Ok(cell)
    }
}
