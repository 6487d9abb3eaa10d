//! 异常类型注册中心：type id 到具体构造器的一次性映射。
//!
//! # 教案定位（Why）
//! - 接收方按线缆上的 type id 决定能否物化具体异常类型；映射表由生成代码在
//!   进程初始化阶段一次性登记，此后只读——并发解码因此无需任何同步原语；
//! - Builder → 冻结的两段式设计把“可变注册期”与“只读服务期”在类型层面分开，
//!   运行时重注册在 API 上即不可表达。
//!
//! # 契约说明（What）
//! - [`FaultRegistryBuilder::register`] 校验工厂元数据并拒绝重复 type id；
//! - [`FaultRegistry::lookup`] 是纯只读查询，可在多条在途消息间无锁并发调用；
//! - 派发优先级由线缆顺序决定：最派生 segment 在前，第一个命中注册表的 type id 获胜，
//!   因此只注册了基类的旧接收方面对更派生的新异常会自然回退到基类。

use alloc::{boxed::Box, collections::BTreeMap, sync::Arc};

use flint_core::{CoreError, error::codes};

use crate::fault::RemoteFault;

/// 具体异常类型的构造器契约，注册表中的一个条目。
///
/// # 设计背景（Why）
/// - 对应 IDL 编译产物中每个异常类型的静态元数据：稳定 type id、完整谱系、
///   图参与声明，以及空实例构造入口；
/// - 与 [`RemoteFault`] 分离，使解码器在尚未物化实例时即可查询类型级信息。
///
/// # 契约说明（What）
/// - **元数据不变量**：`lineage()` 非空且首元素等于 `type_id()`；
/// - `instantiate()` 返回的实例处于“字段默认值”状态，随后由帧协议逐层填充。
pub trait FaultFactory: Send + Sync {
    /// 返回工厂对应的稳定类型标识。
    fn type_id(&self) -> &'static str;

    /// 返回从本类型到根的完整 type id 链。
    fn lineage(&self) -> &'static [&'static str];

    /// 声明该类型的字段是否引用共享对象图。
    fn uses_graph_refs(&self) -> bool {
        false
    }

    /// 构造待填充的空实例。
    fn instantiate(&self) -> Box<dyn RemoteFault>;
}

/// 闭包承载的工厂适配器，免去为每个类型手写工厂结构体。
///
/// # 行为逻辑（How）
/// - 保存静态谱系与构造闭包；`instantiate` 直接调用闭包；
/// - `with_graph_refs` 以 Builder 风格声明图参与，默认不参与。
///
/// # 风险提示（Trade-offs）
/// - 闭包若捕获状态，需满足 `Send + Sync + 'static`，避免破坏注册表的线程安全。
pub struct TypedFaultFactory<F>
where
    F: Fn() -> Box<dyn RemoteFault> + Send + Sync + 'static,
{
    lineage: &'static [&'static str],
    uses_graph_refs: bool,
    constructor: F,
}

impl<F> TypedFaultFactory<F>
where
    F: Fn() -> Box<dyn RemoteFault> + Send + Sync + 'static,
{
    /// 基于谱系与构造闭包创建工厂。
    pub fn new(lineage: &'static [&'static str], constructor: F) -> Self {
        Self {
            lineage,
            uses_graph_refs: false,
            constructor,
        }
    }

    /// 声明该类型的字段引用共享对象图。
    #[must_use]
    pub fn with_graph_refs(mut self, uses_graph_refs: bool) -> Self {
        self.uses_graph_refs = uses_graph_refs;
        self
    }
}

impl<F> FaultFactory for TypedFaultFactory<F>
where
    F: Fn() -> Box<dyn RemoteFault> + Send + Sync + 'static,
{
    fn type_id(&self) -> &'static str {
        self.lineage.first().copied().unwrap_or_default()
    }

    fn lineage(&self) -> &'static [&'static str] {
        self.lineage
    }

    fn uses_graph_refs(&self) -> bool {
        self.uses_graph_refs
    }

    fn instantiate(&self) -> Box<dyn RemoteFault> {
        (self.constructor)()
    }
}

/// 注册期 Builder：收集工厂并在 `build` 时冻结。
///
/// # 契约说明（What）
/// - **前置条件**：注册发生在任何并发解码流量开始之前，通常由生成代码在
///   进程或库初始化时完成；
/// - **错误语义**：元数据非法（空谱系、首元素不符）返回 `registry.invalid_factory`，
///   重复 type id 返回 `registry.duplicate_type_id`，两者均为 [`CoreError`]。
#[derive(Default)]
pub struct FaultRegistryBuilder {
    entries: BTreeMap<&'static str, Arc<dyn FaultFactory>>,
}

impl FaultRegistryBuilder {
    /// 构造空 Builder。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个异常类型工厂。
    pub fn register(&mut self, factory: Arc<dyn FaultFactory>) -> Result<&mut Self, CoreError> {
        let lineage = factory.lineage();
        let type_id = factory.type_id();
        if lineage.is_empty() || lineage[0] != type_id {
            return Err(CoreError::new(
                codes::REGISTRY_INVALID_FACTORY,
                "工厂谱系必须非空且以自身 type id 开头",
            ));
        }
        if self.entries.contains_key(type_id) {
            return Err(CoreError::new(
                codes::REGISTRY_DUPLICATE_TYPE_ID,
                "同一 type id 不得重复注册",
            ));
        }
        self.entries.insert(type_id, factory);
        Ok(self)
    }

    /// 冻结为只读注册表。
    #[must_use]
    pub fn build(self) -> FaultRegistry {
        FaultRegistry {
            entries: self.entries,
        }
    }
}

/// 冻结后的只读注册表。
///
/// # 线程安全（What）
/// - 构建完成后不再变更，查询走共享引用，跨线程并发读取无需同步；
/// - 注册表通常以 `'static` 或 `Arc` 形态在连接间共享。
pub struct FaultRegistry {
    entries: BTreeMap<&'static str, Arc<dyn FaultFactory>>,
}

impl FaultRegistry {
    /// 按 type id 查询工厂。
    #[must_use]
    pub fn lookup(&self, type_id: &str) -> Option<&Arc<dyn FaultFactory>> {
        self.entries.get(type_id)
    }

    /// 已注册的类型数量。
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 判断注册表是否为空。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl core::fmt::Debug for FaultRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FaultRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{BodyReader, BodyWriter};
    use core::any::Any;

    #[derive(Debug, Default)]
    struct StubFault;

    impl RemoteFault for StubFault {
        fn lineage(&self) -> &'static [&'static str] {
            &["::stub::Fault"]
        }

        fn encode_segment(
            &self,
            _level: usize,
            _body: &mut BodyWriter<'_>,
        ) -> Result<(), crate::error::FaultError> {
            Ok(())
        }

        fn decode_segment(
            &mut self,
            _level: usize,
            _body: &mut BodyReader<'_>,
        ) -> Result<(), crate::error::FaultError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn stub_factory() -> Arc<dyn FaultFactory> {
        Arc::new(TypedFaultFactory::new(&["::stub::Fault"], || {
            Box::new(StubFault)
        }))
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut builder = FaultRegistryBuilder::new();
        builder.register(stub_factory()).expect("首次注册应成功");
        let err = match builder.register(stub_factory()) {
            Err(e) => e,
            Ok(_) => panic!("重复注册必须失败"),
        };
        assert_eq!(err.code(), codes::REGISTRY_DUPLICATE_TYPE_ID);
    }

    #[test]
    fn empty_lineage_is_rejected() {
        let mut builder = FaultRegistryBuilder::new();
        let factory: Arc<dyn FaultFactory> =
            Arc::new(TypedFaultFactory::new(&[], || Box::new(StubFault)));
        let err = match builder.register(factory) {
            Err(e) => e,
            Ok(_) => panic!("空谱系必须失败"),
        };
        assert_eq!(err.code(), codes::REGISTRY_INVALID_FACTORY);
    }

    #[test]
    fn frozen_registry_serves_shared_lookups() {
        let mut builder = FaultRegistryBuilder::new();
        builder.register(stub_factory()).expect("注册应成功");
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        let factory = registry.lookup("::stub::Fault").expect("应能命中");
        assert_eq!(FaultFactory::type_id(&**factory), "::stub::Fault");
        assert!(registry.lookup("::stub::Other").is_none());
    }
}
