// Allocation tracking tests for the ring hot path.
//
// Enqueue and dequeue work entirely inside the ring's memory zone, so once a
// ring and its handles exist, moving elements must not touch the heap.
//
// dhat only allows one profiler at a time, so profiled tests are #[serial].
//
// cargo test --test allocation_tracking -- --nocapture

use dmxp_ring::{RingBuilder, SyncMode};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[test]
#[serial]
fn test_hot_path_with_dhat() {
    let ring = RingBuilder::new()
        .with_capacity(1024)
        .with_element_size(16)
        .with_producer(SyncMode::Single)
        .with_consumer(SyncMode::Single)
        .build()
        .unwrap();
    let mut tx = ring.producer().unwrap();
    let mut rx = ring.consumer().unwrap();
    let batch = [[0xabu64, 0xcdu64]; 32];
    let mut out = [[0u64; 2]; 32];

    let _profiler = dhat::Profiler::builder().testing().build();
    let before = dhat::HeapStats::get();

    for i in 0..10_000u64 {
        tx.enqueue_bulk_as(&batch);
        tx.enqueue_as([i, i]).unwrap();
        rx.dequeue_burst_as(&mut out);
        rx.dequeue_as::<[u64; 2]>();
    }

    let after = dhat::HeapStats::get();
    println!("heap blocks before: {}, after: {}", before.total_blocks, after.total_blocks);
    dhat::assert_eq!(after.total_blocks, before.total_blocks);
    assert!(ring.is_empty());
}

#[test]
#[serial]
fn test_threaded_hot_path_with_dhat() {
    let ring = RingBuilder::new()
        .with_capacity(256)
        .with_element_size(8)
        .build()
        .unwrap();
    let mut tx = ring.producer().unwrap();
    let mut rx = ring.consumer().unwrap();

    // Spawning allocates; the producer only starts once the profiler is up
    let ready = Arc::new(AtomicBool::new(false));
    let go = Arc::new(AtomicBool::new(false));
    let producer = {
        let (ready, go) = (ready.clone(), go.clone());
        thread::spawn(move || {
            ready.store(true, Ordering::Release);
            while !go.load(Ordering::Acquire) {
                std::hint::spin_loop();
            }
            let mut sent = 0u64;
            while sent < 50_000 {
                if tx.enqueue_as(sent).is_ok() {
                    sent += 1;
                }
            }
        })
    };
    while !ready.load(Ordering::Acquire) {
        std::hint::spin_loop();
    }

    let profiler = dhat::Profiler::builder().testing().build();
    let before = dhat::HeapStats::get();
    go.store(true, Ordering::Release);

    let mut received = 0u64;
    let mut out = [0u64; 64];
    while received < 50_000 {
        received += rx.dequeue_burst_as(&mut out).count as u64;
    }

    let after = dhat::HeapStats::get();
    dhat::assert_eq!(after.total_blocks, before.total_blocks);
    drop(profiler);
    producer.join().unwrap();
}

#[test]
fn test_zone_footprint_with_memory_stats() {
    use memory_stats::memory_stats;

    let before = memory_stats();
    let ring = RingBuilder::new()
        .with_capacity(1 << 16)
        .with_element_size(64)
        .build()
        .unwrap();
    let mut tx = ring.producer().unwrap();
    let mut rx = ring.consumer().unwrap();

    // Touch every slot once so the pages are resident
    let rec = [1u64; 8];
    while tx.enqueue_as(rec).is_ok() {}
    while rx.dequeue_as::<[u64; 8]>().is_some() {}

    let after = memory_stats();
    println!("Memory before: {:?}", before);
    println!("Memory after: {:?}", after);
    if let (Some(b), Some(a)) = (before, after) {
        let delta = a.physical_mem as i64 - b.physical_mem as i64;
        println!("Memory delta: {} bytes ({:.2} KB)", delta, delta as f64 / 1024.0);
        // 4 MiB of storage; allow generous slack for the test harness
        assert!(delta < 64 * 1024 * 1024);
    }
}
