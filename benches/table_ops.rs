use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use async_table::{
    executor::tokio::TokioExecutor, future::all, mem::MemTransport, AsyncConnection, AsyncTable,
    Put, Scan, TableName,
};

const FAMILY: &[u8] = b"cf";
const QUALIFIER: &[u8] = b"cq";
const BATCHES: [usize; 3] = [1, 64, 1024];
const SCAN_ROWS: usize = 10_000;

type MemTable = AsyncTable<MemTransport<TokioExecutor>>;

fn build_runtime() -> Runtime {
    match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => panic!("tokio runtime build failed: {err}"),
    }
}

fn open_table(runtime: &Runtime) -> MemTable {
    let transport = MemTransport::new(TokioExecutor::new(runtime.handle().clone()));
    let name = TableName::new("bench").expect("valid table name");
    transport
        .create_table(name.clone(), [FAMILY])
        .expect("fresh store");
    AsyncConnection::new(transport).table(name)
}

fn concurrent_puts(c: &mut Criterion) {
    let runtime = build_runtime();
    let table = open_table(&runtime);
    let value = vec![0xAB_u8; 128];

    let mut group = c.benchmark_group("concurrent_puts");
    for batch in BATCHES {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.to_async(&runtime).iter(|| {
                let puts = (0..batch).map(|i| {
                    let row = fastrand::u64(..).to_be_bytes().to_vec();
                    Put::new(row).add_column(FAMILY, QUALIFIER, value[..(i % 128) + 1].to_vec())
                });
                let pending = all(table.put_many(puts));
                async move { black_box(pending.await.expect("puts")) }
            });
        });
    }
    group.finish();
}

fn concurrent_increments(c: &mut Criterion) {
    let runtime = build_runtime();
    let table = open_table(&runtime);

    let mut group = c.benchmark_group("concurrent_increments");
    for batch in BATCHES {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.to_async(&runtime).iter(|| {
                // A single hot counter: every increment contends on the same row.
                let increments = (0..batch)
                    .map(|_| table.increment_column_value("hot", FAMILY, QUALIFIER, 1));
                let pending = all(increments);
                async move { black_box(pending.await.expect("increments")) }
            });
        });
    }
    group.finish();
}

fn full_scan(c: &mut Criterion) {
    let runtime = build_runtime();
    let table = open_table(&runtime);
    let puts = (0..SCAN_ROWS)
        .map(|i| Put::new(format!("row-{i:06}")).add_column(FAMILY, QUALIFIER, "v"));
    runtime
        .block_on(all(table.put_many(puts)))
        .expect("populate");

    let mut group = c.benchmark_group("scan_all");
    group.throughput(Throughput::Elements(SCAN_ROWS as u64));
    group.bench_function("rows", |b| {
        b.to_async(&runtime).iter(|| {
            let rows = table.scan_all(Scan::new());
            async move { black_box(rows.await.expect("scan").len()) }
        });
    });
    group.finish();
}

criterion_group!(benches, concurrent_puts, concurrent_increments, full_scan);
criterion_main!(benches);
