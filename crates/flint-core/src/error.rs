//! 契约层统一错误类型与稳定错误码表。
//!
//! # 教案定位（Why）
//! - 缓冲、注册与取消等契约层故障需要合流为统一的错误码，便于日志与告警系统执行精确分类；
//! - 框架兼容 `no_std + alloc` 场景，因此基于 [`core::error::Error`] 而非 `std` 专属设施。
//!
//! # 使用契约（What）
//! - 错误码恒为 `'static` 字符串，遵循 `<域>.<语义>` 命名约定，全部登记在 [`codes`] 模块；
//! - `message` 面向排障人员，不应包含敏感信息；`cause` 可选携带底层原因并通过 `source()` 暴露。

use alloc::{borrow::Cow, boxed::Box};
use core::error::Error;
use core::fmt;

/// `CoreError` 表示契约层跨组件共享的稳定错误域。
///
/// # 设计背景（Why）
/// - 缓冲实现、注册中心与取消探针在不同层次产生的故障需要统一形态，调用方才能按错误码驱动自动化处置；
/// - 结构体仅承载错误码、消息与底层原因，不执行格式化或指标上报，保持在 `no_std + alloc` 下可用。
///
/// # 逻辑解析（How）
/// - 以 Builder 风格方法叠加底层原因（[`with_cause`](Self::with_cause)），并通过 `source()` 暴露完整链路；
/// - 错误码 `code` 始终为 `'static` 字符串，承载稳定语义；`message` 允许静态或堆分配文案。
///
/// # 契约说明（What）
/// - **前置条件**：调用方必须使用 [`codes`] 模块或遵循 `<域>.<语义>` 约定的自定义码值；
/// - **返回值**：构造函数返回拥有所有权的 `CoreError`，可安全跨线程移动（`Send + Sync + 'static`）；
/// - **后置条件**：除非显式调用 `with_cause`，错误不包含额外上下文。
///
/// # 设计取舍（Trade-offs）
/// - 采用 `Cow` 保存消息，静态文案零分配，动态描述仅触发一次堆分配。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl CoreError {
    /// 构造契约层错误。
    ///
    /// # 契约定义（What）
    /// - **输入参数**：`code` 为已备案的稳定错误码；`message` 为面向排障人员的描述；
    /// - **后置条件**：返回的错误不含底层原因，可稍后通过 [`with_cause`](Self::with_cause) 填充。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    #[must_use]
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

/// 稳定错误码表。
///
/// # 契约说明（What）
/// - 所有常量一经发布不得变更语义；新增错误码需同步更新调用方的分类逻辑；
/// - 命名遵循 `<域>.<语义>`，与日志、指标侧的筛选维度保持一致。
pub mod codes {
    /// 读取超出缓冲剩余字节。
    pub const BUFFER_UNDERFLOW: &str = "buffer.underflow";
    /// 写入超出缓冲可提供的容量。
    pub const BUFFER_OVERFLOW: &str = "buffer.overflow";
    /// 同一 type id 被重复注册。
    pub const REGISTRY_DUPLICATE_TYPE_ID: &str = "registry.duplicate_type_id";
    /// 工厂元数据不满足注册前置条件（空谱系、标识不一致）。
    pub const REGISTRY_INVALID_FACTORY: &str = "registry.invalid_factory";
    /// 调用被外部取消信号终止。
    pub const RPC_CANCELLED: &str = "rpc.cancelled";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Truncation;

    impl fmt::Display for Truncation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("4 bytes missing")
        }
    }

    impl Error for Truncation {}

    #[test]
    fn cause_chain_is_exposed_through_source() {
        let outer =
            CoreError::new(codes::BUFFER_UNDERFLOW, "segment header truncated").with_cause(Truncation);

        assert_eq!(outer.code(), codes::BUFFER_UNDERFLOW);
        assert_eq!(outer.to_string(), "[buffer.underflow] segment header truncated");
        let source = Error::source(&outer).expect("底层原因应通过 source() 暴露");
        assert_eq!(source.to_string(), "4 bytes missing");
    }
}
