// Single-threaded model check: any sequence of operations must behave exactly
// like a bounded FIFO of records.
use dmxp_ring::{Ring, RingBuilder, SyncMode};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Copy, Clone, Debug)]
enum Op {
    EnqueueBulk(usize),
    EnqueueBurst(usize),
    DequeueBulk(usize),
    DequeueBurst(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..24).prop_map(Op::EnqueueBulk),
        (0usize..24).prop_map(Op::EnqueueBurst),
        (0usize..24).prop_map(Op::DequeueBulk),
        (0usize..24).prop_map(Op::DequeueBurst),
    ]
}

fn esize() -> impl Strategy<Value = u32> {
    prop_oneof![Just(4u32), Just(8), Just(12), Just(16), Just(36)]
}

fn ring_shape() -> impl Strategy<Value = (u32, u32, bool)> {
    prop_oneof![
        (1u32..5, esize()).prop_map(|(shift, e)| (1 << shift, e, false)),
        (1u32..21, esize()).prop_map(|(cap, e)| (cap, e, true)),
    ]
}

fn build(capacity: u32, esize: u32, exact: bool) -> Ring {
    RingBuilder::new()
        .with_capacity(capacity)
        .with_element_size(esize)
        .with_exact_size(exact)
        .with_producer(SyncMode::Single)
        .with_consumer(SyncMode::Single)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn behaves_like_a_bounded_fifo(
        (capacity, esize, exact) in ring_shape(),
        ops in prop::collection::vec(op(), 1..200),
    ) {
        let ring = build(capacity, esize, exact);
        let mut tx = ring.producer().unwrap();
        let mut rx = ring.consumer().unwrap();
        let es = esize as usize;
        let cap = capacity as usize;

        let mut model: VecDeque<Vec<u8>> = VecDeque::new();
        let mut stamp = 0u32;

        for op in ops {
            match op {
                Op::EnqueueBulk(n) | Op::EnqueueBurst(n) => {
                    let records: Vec<Vec<u8>> = (0..n)
                        .map(|_| {
                            stamp += 1;
                            stamp.to_le_bytes().iter().copied().cycle().take(es).collect()
                        })
                        .collect();
                    let flat = records.concat();
                    let free = cap - model.len();
                    let (t, expect) = match op {
                        Op::EnqueueBulk(_) => (tx.enqueue_bulk(&flat), if n <= free { n } else { 0 }),
                        _ => (tx.enqueue_burst(&flat), n.min(free)),
                    };
                    prop_assert_eq!(t.count as usize, expect);
                    prop_assert_eq!(t.remaining as usize, free - expect);
                    model.extend(records.into_iter().take(expect));
                }
                Op::DequeueBulk(n) | Op::DequeueBurst(n) => {
                    let mut out = vec![0u8; n * es];
                    let have = model.len();
                    let (t, expect) = match op {
                        Op::DequeueBulk(_) => (rx.dequeue_bulk(&mut out), if n <= have { n } else { 0 }),
                        _ => (rx.dequeue_burst(&mut out), n.min(have)),
                    };
                    prop_assert_eq!(t.count as usize, expect);
                    prop_assert_eq!(t.remaining as usize, have - expect);
                    for chunk in out.chunks_exact(es).take(expect) {
                        let want = model.pop_front().unwrap();
                        prop_assert_eq!(chunk, want.as_slice());
                    }
                }
            }

            prop_assert_eq!(ring.count() as usize, model.len());
            prop_assert_eq!(ring.free_count() as usize, cap - model.len());
            prop_assert!(ring.cursors().is_consistent(capacity));
        }
    }
}
