use dmxp_ring::{Backing, RingBuilder, RingError, RingRegistry};
use serial_test::serial;
use std::thread;

fn named(name: &str) -> RingBuilder {
    RingBuilder::new()
        .with_name(name)
        .with_capacity(64)
        .with_element_size(16)
}

#[test]
fn test_create_lookup_free() {
    let registry: RingRegistry = RingRegistry::new();
    let ring = named("rx0").build_in(&registry).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.contains("rx0"));
    let found = registry.lookup("rx0").unwrap();
    assert!(found.ptr_eq(&ring));
    assert_eq!(found.name(), "rx0");

    // A handle from lookup sees what the creator enqueued
    let mut tx = ring.producer().unwrap();
    tx.enqueue_as([1u64, 2u64]).unwrap();
    assert_eq!(found.count(), 1);

    registry.free("rx0").unwrap();
    assert!(registry.lookup("rx0").is_none());
    assert!(registry.is_empty());

    // Still usable through surviving handles
    let mut rx = found.consumer().unwrap();
    assert_eq!(rx.dequeue_as::<[u64; 2]>(), Some([1, 2]));
}

#[test]
fn test_error_conditions() {
    let registry: RingRegistry = RingRegistry::with_limit(2);
    named("a").build_in(&registry).unwrap();

    assert!(matches!(
        named("a").build_in(&registry),
        Err(RingError::NameExists(n)) if n == "a"
    ));
    assert!(matches!(named("").build_in(&registry), Err(RingError::EmptyName)));
    assert!(matches!(registry.free("missing"), Err(RingError::NotFound(_))));

    // A rejected config never takes a slot
    assert!(named("bad").with_capacity(3).build_in(&registry).is_err());
    assert!(!registry.contains("bad"));

    named("b").build_in(&registry).unwrap();
    assert!(matches!(
        named("c").build_in(&registry),
        Err(RingError::RegistryFull(2))
    ));

    registry.free("a").unwrap();
    named("c").build_in(&registry).unwrap();
    assert_eq!(registry.names(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_concurrent_creation_is_unique() {
    let registry: RingRegistry = RingRegistry::new();
    let shared = &registry;
    let winners = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(move || named("shared").build_in(shared).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count()
    });
    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_ref_counts_and_dump() {
    let registry: RingRegistry = RingRegistry::new();
    let ring = named("dump_me").build_in(&registry).unwrap();
    // The caller's handle plus the registry's own
    assert_eq!(ring.ref_count(), 2);

    let dump = registry.dump();
    assert!(dump.contains("ring <dump_me>"));
    assert!(dump.contains("capacity=64"));
    assert!(format!("{registry:?}").contains("dump_me"));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_shared_memory_backing() {
    let ring = named("shm_ring")
        .with_backing(Backing::SharedMemory)
        .build()
        .unwrap();
    assert_eq!(ring.backing(), Backing::SharedMemory);

    let prefix = format!("dmxp_ring.shm_ring.{}.", std::process::id());
    let files = || {
        std::fs::read_dir("/dev/shm")
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .count()
    };
    assert_eq!(files(), 1);

    let mut tx = ring.producer().unwrap();
    let mut rx = ring.consumer().unwrap();
    assert_eq!(tx.enqueue_bulk_as(&[[7u64, 8u64]; 64]).count, 64);
    let mut out = [[0u64; 2]; 64];
    assert_eq!(rx.dequeue_bulk_as(&mut out).count, 64);
    assert!(out.iter().all(|r| *r == [7, 8]));

    drop((tx, rx, ring));
    assert_eq!(files(), 0);
}
