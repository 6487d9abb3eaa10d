use std::any::Any;
use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use flint_codec_fault::{
    BodyReader, BodyWriter, DecodeContext, EncodeContext, FaultError, FaultRegistry,
    FaultRegistryBuilder, RemoteFault, TypedFaultFactory, read_fault, write_fault,
};
use flint_core::{HeapBuffer, HeapSlice};

const QUOTA_LINEAGE: &[&str] = &["::bench::QuotaFault", "::bench::ResourceFault"];

/// 基准专用的两层继承链异常。
#[derive(Debug, Default, Clone)]
struct QuotaFault {
    limit: u64,
    used: u64,
    code: u32,
    detail: String,
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
            _ => {
                body.put_u32(self.code)?;
                body.put_str(&self.detail)
            }
        }
    }

    fn decode_segment(&mut self, level: usize, body: &mut BodyReader<'_>) -> Result<(), FaultError> {
        match level {
            0 => {
                self.limit = body.get_u64()?;
                self.used = body.get_u64()?;
                Ok(())
            }
            _ => {
                self.code = body.get_u32()?;
                self.detail = body.get_str()?;
                Ok(())
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn bench_registry() -> FaultRegistry {
    let mut builder = FaultRegistryBuilder::new();
    builder
        .register(Arc::new(TypedFaultFactory::new(QUOTA_LINEAGE, || {
            Box::new(QuotaFault::default())
        })))
        .expect("注册基准类型应成功");
    builder.build()
}

/// 编码-解码一条两层继承链异常帧的端到端耗时。
///
/// # 设计目的（Why）
/// - 异常封送位于 RPC 错误路径，吞吐虽非首要指标，但需确保帧包裹与派发逻辑
///   不会引入异常量级的开销；
/// - 与 `tests/` 共享同一协议路径，基准回归可辅助发现意外的热路径复制。
fn bench_frame_roundtrip(c: &mut Criterion) {
    let registry = bench_registry();
    let fault = QuotaFault {
        limit: 1 << 30,
        used: (1 << 30) + 4096,
        code: 17,
        detail: "storage quota exceeded on volume".into(),
    };

    c.bench_function("fault_frame_roundtrip", |b| {
        b.iter(|| {
            let mut out = HeapBuffer::with_capacity(256);
            let mut encode_ctx = EncodeContext::detached();
            write_fault(black_box(&fault), &mut out, &mut encode_ctx)
                .expect("基准编码不应失败");

            let mut slice = HeapSlice::new(out.into_vec());
            let mut decode_ctx = DecodeContext::new(&registry);
            let decoded =
                read_fault(&mut slice, &mut decode_ctx).expect("基准解码不应失败");
            black_box(decoded);
        });
    });
}

criterion_group!(fault_benches, bench_frame_roundtrip);
criterion_main!(fault_benches);
