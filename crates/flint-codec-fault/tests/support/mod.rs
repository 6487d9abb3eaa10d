//! 测试夹具：模拟 IDL 编译产物的异常继承链。
//!
//! 层级关系（与生成代码一致，字段按层级平铺在具体类型上）：
//! - `::accounts::ResourceFault`（根）：`code: u32`、`detail: String`
//! - `::accounts::QuotaFault` 继承 ResourceFault：追加 `limit: u64`、`used: u64`
//! - `::accounts::StorageQuotaFault` 继承 QuotaFault：追加 `volume: String`
//! - `::sessions::PeerFault`（根，参与对象图）：`session: String`、
//!   `peer`/`origin` 两个共享引用字段

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use flint_codec_fault::{
    BodyReader, BodyWriter, EncodeContext, FaultError, FaultRegistry, FaultRegistryBuilder,
    GraphCell, RemoteFault, TypedFaultFactory, write_fault,
};
use flint_core::HeapBuffer;

pub const RESOURCE_FAULT_ID: &str = "::accounts::ResourceFault";
pub const QUOTA_FAULT_ID: &str = "::accounts::QuotaFault";
pub const STORAGE_QUOTA_FAULT_ID: &str = "::accounts::StorageQuotaFault";
pub const PEER_FAULT_ID: &str = "::sessions::PeerFault";

pub const RESOURCE_LINEAGE: &[&str] = &[RESOURCE_FAULT_ID];
pub const QUOTA_LINEAGE: &[&str] = &[QUOTA_FAULT_ID, RESOURCE_FAULT_ID];
pub const STORAGE_QUOTA_LINEAGE: &[&str] =
    &[STORAGE_QUOTA_FAULT_ID, QUOTA_FAULT_ID, RESOURCE_FAULT_ID];
pub const PEER_LINEAGE: &[&str] = &[PEER_FAULT_ID];

/// 根层级：资源类故障。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceFault {
    pub code: u32,
    pub detail: String,
}

impl RemoteFault for ResourceFault {
    fn lineage(&self) -> &'static [&'static str] {
        RESOURCE_LINEAGE
    }

    fn encode_segment(&self, level: usize, body: &mut BodyWriter<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                body.put_u32(self.code)?;
                body.put_str(&self.detail)
            }
            _ => unreachable!("ResourceFault 只有一个层级"),
        }
    }

    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                self.code = body.get_u32()?;
                self.detail = body.get_str()?;
                Ok(())
            }
            _ => unreachable!("ResourceFault 只有一个层级"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 中间层级：配额超限。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QuotaFault {
    pub limit: u64,
    pub used: u64,
    pub code: u32,
    pub detail: String,
}

impl RemoteFault for QuotaFault {
    fn lineage(&self) -> &'static [&'static str] {
        QUOTA_LINEAGE
    }

    fn encode_segment(&self, level: usize, body: &mut BodyWriter<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                body.put_u64(self.limit)?;
                body.put_u64(self.used)
            }
            1 => {
                body.put_u32(self.code)?;
                body.put_str(&self.detail)
            }
            _ => unreachable!("QuotaFault 只有两个层级"),
        }
    }

    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                self.limit = body.get_u64()?;
                self.used = body.get_u64()?;
                Ok(())
            }
            1 => {
                self.code = body.get_u32()?;
                self.detail = body.get_str()?;
                Ok(())
            }
            _ => unreachable!("QuotaFault 只有两个层级"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 最派生层级：存储卷配额超限。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StorageQuotaFault {
    pub volume: String,
    pub limit: u64,
    pub used: u64,
    pub code: u32,
    pub detail: String,
}

impl RemoteFault for StorageQuotaFault {
    fn lineage(&self) -> &'static [&'static str] {
        STORAGE_QUOTA_LINEAGE
    }

    fn encode_segment(&self, level: usize, body: &mut BodyWriter<'_>) -> Result<(), FaultError> {
        match level {
            0 => body.put_str(&self.volume),
            1 => {
                body.put_u64(self.limit)?;
                body.put_u64(self.used)
            }
            2 => {
                body.put_u32(self.code)?;
                body.put_str(&self.detail)
            }
            _ => unreachable!("StorageQuotaFault 只有三个层级"),
        }
    }

    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                self.volume = body.get_str()?;
                Ok(())
            }
            1 => {
                self.limit = body.get_u64()?;
                self.used = body.get_u64()?;
                Ok(())
            }
            2 => {
                self.code = body.get_u32()?;
                self.detail = body.get_str()?;
                Ok(())
            }
            _ => unreachable!("StorageQuotaFault 只有三个层级"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 对象图中的会话节点，可经 `next` 构成环。
#[derive(Debug, Default)]
pub struct PeerInfo {
    pub name: String,
    pub next: spin::Mutex<Option<Arc<PeerInfo>>>,
}

impl PeerInfo {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            next: spin::Mutex::new(None),
        })
    }
}

impl PartialEq for PeerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// 参与对象图的异常：携带两个共享引用字段。
#[derive(Debug, Default)]
pub struct PeerFault {
    pub session: String,
    pub peer: GraphCell<PeerInfo>,
    pub origin: GraphCell<PeerInfo>,
}

impl RemoteFault for PeerFault {
    fn lineage(&self) -> &'static [&'static str] {
        PEER_LINEAGE
    }

    fn uses_graph_refs(&self) -> bool {
        true
    }

    fn encode_segment(&self, level: usize, body: &mut BodyWriter<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                body.put_str(&self.session)?;
                body.put_graph_ref(&self.peer)?;
                body.put_graph_ref(&self.origin)
            }
            _ => unreachable!("PeerFault 只有一个层级"),
        }
    }

    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                self.session = body.get_str()?;
                self.peer = body.get_graph_ref()?;
                self.origin = body.get_graph_ref()?;
                Ok(())
            }
            _ => unreachable!("PeerFault 只有一个层级"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 构造注册了指定类型集合的冻结注册表。
pub fn registry_of(type_ids: &[&'static str]) -> FaultRegistry {
    let mut builder = FaultRegistryBuilder::new();
    for type_id in type_ids {
        match *type_id {
            RESOURCE_FAULT_ID => builder
                .register(Arc::new(TypedFaultFactory::new(RESOURCE_LINEAGE, || {
                    Box::new(ResourceFault::default())
                })))
                .expect("注册 ResourceFault 应成功"),
            QUOTA_FAULT_ID => builder
                .register(Arc::new(TypedFaultFactory::new(QUOTA_LINEAGE, || {
                    Box::new(QuotaFault::default())
                })))
                .expect("注册 QuotaFault 应成功"),
            STORAGE_QUOTA_FAULT_ID => builder
                .register(Arc::new(TypedFaultFactory::new(
                    STORAGE_QUOTA_LINEAGE,
                    || Box::new(StorageQuotaFault::default()),
                )))
                .expect("注册 StorageQuotaFault 应成功"),
            PEER_FAULT_ID => builder
                .register(Arc::new(
                    TypedFaultFactory::new(PEER_LINEAGE, || Box::new(PeerFault::default()))
                        .with_graph_refs(true),
                ))
                .expect("注册 PeerFault 应成功"),
            other => panic!("未知的测试类型: {other}"),
        };
    }
    builder.build()
}

/// 将异常编码为字节向量（无图参与）。
pub fn encode_to_vec(fault: &dyn RemoteFault) -> Vec<u8> {
    let mut out = HeapBuffer::new();
    let mut ctx = EncodeContext::detached();
    write_fault(fault, &mut out, &mut ctx).expect("编码不应失败");
    out.into_vec()
}

/// 构造一份有代表性的最派生异常实例。
pub fn sample_storage_fault() -> StorageQuotaFault {
    StorageQuotaFault {
        volume: "vol-a".into(),
        limit: 100,
        used: 101,
        code: 9,
        detail: "quota exceeded".into(),
    }
}
