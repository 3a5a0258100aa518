//! Benchmarks for the allocator stack's hot paths: stack bump/unwind, node
//! pool allocate/deallocate, array pool run allocation, and bucketed
//! pool-list allocation across mixed sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_alloc::block::HeapBlockAllocator;
use strata_alloc::memory_pool::{ArrayPool, NodePool};
use strata_alloc::memory_pool_list::NodePoolListLog2;
use strata_alloc::memory_stack::MemoryStackAllocator;
use strata_alloc::platform::HeapAllocator;

type Heap = HeapBlockAllocator<HeapAllocator>;

fn bench_memory_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_stack");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_and_unwind", |b| {
        let mut stack: MemoryStackAllocator<Heap> = MemoryStackAllocator::new(Heap::new(), 64 * 1024);
        b.iter(|| {
            let marker = stack.top();
            let ptr = stack.allocate(64, 8);
            black_box(ptr);
            stack.unwind(marker);
        });
    });

    group.finish();
}

fn bench_node_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_pool");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_deallocate", |b| {
        let mut pool: NodePool<Heap> = NodePool::new(
            Heap::new(),
            64,
            NodePool::<Heap>::min_block_size(64, 256),
        );
        b.iter(|| {
            let node = pool.allocate_node();
            black_box(node);
            unsafe { pool.deallocate_node(node) };
        });
    });

    group.finish();
}

fn bench_array_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_pool");
    group.throughput(Throughput::Elements(8));

    group.bench_function("allocate_run_of_8", |b| {
        let mut pool: ArrayPool<Heap> = ArrayPool::new(
            Heap::new(),
            32,
            ArrayPool::<Heap>::min_block_size(32, 256),
        );
        b.iter(|| {
            let run = pool.allocate_array(8);
            black_box(run);
            unsafe { pool.deallocate_array(run, 8) };
        });
    });

    group.finish();
}

fn bench_pool_list_mixed_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_list");
    group.throughput(Throughput::Elements(2));

    group.bench_function("mixed_size_allocate_deallocate", |b| {
        let mut pools: NodePoolListLog2<Heap> = NodePoolListLog2::new(Heap::new(), 64, 64 * 1024);
        b.iter(|| {
            let small = pools.allocate_node(8);
            let large = pools.allocate_node(48);
            black_box((small, large));
            unsafe {
                pools.deallocate_node(small, 8);
                pools.deallocate_node(large, 48);
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_stack,
    bench_node_pool,
    bench_array_pool,
    bench_pool_list_mixed_sizes
);
criterion_main!(benches);
