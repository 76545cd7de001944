use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tt_scheduler::{FlowEntry, FlowTable};

fn entry(flow_id: u16) -> FlowEntry {
    FlowEntry {
        flow_id,
        period: 1_000,
        offset: 0,
        packet_size: 64,
        buffer_id: 0,
    }
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("flow_table_insert", |b| {
        let table = FlowTable::new(8);
        let mut flow_id = 0u16;
        b.iter(|| {
            table.insert(entry(black_box(flow_id))).unwrap();
            flow_id = flow_id.wrapping_add(1);
        })
    });
}

fn bench_lookup(c: &mut Criterion) {
    let table = FlowTable::new(8);
    for id in 0..255u16 {
        table.insert(entry(id)).unwrap();
    }
    c.bench_function("flow_table_lookup", |b| {
        b.iter(|| table.lookup(black_box(128)))
    });
}

fn bench_delete_reinsert(c: &mut Criterion) {
    let table = FlowTable::new(8);
    for id in 0..255u16 {
        table.insert(entry(id)).unwrap();
    }
    c.bench_function("flow_table_delete_reinsert", |b| {
        b.iter(|| {
            table.delete(black_box(128));
            table.insert(entry(128)).unwrap();
        })
    });
}

criterion_group!(benches, bench_insert, bench_lookup, bench_delete_reinsert);
criterion_main!(benches);
