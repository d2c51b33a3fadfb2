use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use codec::{
    CellRequest, CodecLimits, DataElement, Filter, FilterKind, PutChanges, QueryChanges,
    SubRequest,
};
use wire::{CellId, ExGuid, Guid, SerialNumber};

const GUID: Guid = Guid::from_u128(0x0BAD_F00D_0000_4000_8000_0000_0000_0001);

fn sample_request(elements: u32) -> CellRequest {
    let cell = CellId::new(ExGuid::new(1, GUID), ExGuid::new(2, GUID));
    let query = QueryChanges::new(cell)
        .with_filter(Filter::include(FilterKind::All))
        .with_filter(Filter::exclude(FilterKind::CellId(cell)));
    let data = (0..elements)
        .map(|i| {
            DataElement::object_data_blob(
                ExGuid::new(i, GUID),
                SerialNumber::new(GUID, u64::from(i)),
                vec![0x5A; 256],
            )
        })
        .collect();

    CellRequest::new(vec![
        SubRequest::query_access(1),
        SubRequest::query_changes(2, query),
        SubRequest::put_changes(3, PutChanges::new(ExGuid::new(9, GUID))),
    ])
    .expect("non-empty request")
    .with_data_elements(data)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for elements in [0u32, 16, 256] {
        let request = sample_request(elements);
        let len = request.to_bytes().expect("encode").len();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function(format!("{elements}_elements"), |b| {
            b.iter(|| black_box(&request).to_bytes().expect("encode"));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let limits = CodecLimits::default();
    let mut group = c.benchmark_group("decode");
    for elements in [0u32, 16, 256] {
        let bytes = sample_request(elements).to_bytes().expect("encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(format!("{elements}_elements"), |b| {
            b.iter(|| CellRequest::decode(black_box(&bytes), &limits).expect("decode"));
        });
    }
    group.finish();
}

fn bench_base64(c: &mut Criterion) {
    let request = sample_request(16);
    let text = request.to_base64().expect("encode");
    let limits = CodecLimits::default();
    c.bench_function("base64_roundtrip_16_elements", |b| {
        b.iter(|| {
            let text = black_box(&request).to_base64().expect("encode");
            CellRequest::from_base64(black_box(&text), &limits).expect("decode")
        });
    });
    c.bench_function("from_base64_16_elements", |b| {
        b.iter(|| CellRequest::from_base64(black_box(&text), &limits).expect("decode"));
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_base64);
criterion_main!(benches);
