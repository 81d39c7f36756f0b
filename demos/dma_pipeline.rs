// Several "cores" post DMA descriptors into one multi-producer ring; a single
// "engine" drains them in bursts and verifies each descriptor's checksum.
//
// cargo run --release --example dma_pipeline -- --producers 4 --descriptors 1000000
// RUST_LOG=dmxp_ring=debug cargo run --example dma_pipeline -- --shm

use bytemuck::{Pod, Zeroable};
use clap::{Arg, ArgAction, Command};
use dmxp_ring::{Backing, RingBuilder, SyncMode};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// One transfer request: copy `len` bytes from `src` to `dst`.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
struct Descriptor {
    src: u64,
    dst: u64,
    len: u32,
    core: u32,
    seq: u64,
    check: u64,
}

fn checksum(src: u64, dst: u64, len: u32, seq: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(src.to_le_bytes());
    hasher.update(dst.to_le_bytes());
    hasher.update(len.to_le_bytes());
    hasher.update(seq.to_le_bytes());
    let digest = hasher.finalize();
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(first)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let matches = Command::new("dma_pipeline")
        .about("Multi-producer descriptor handoff through a dmxp ring")
        .arg(
            Arg::new("producers")
                .long("producers")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .default_value("4")
                .help("Number of producer threads"),
        )
        .arg(
            Arg::new("descriptors")
                .long("descriptors")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .default_value("200000")
                .help("Descriptors posted by each producer"),
        )
        .arg(
            Arg::new("capacity")
                .long("capacity")
                .value_name("SLOTS")
                .value_parser(clap::value_parser!(u32))
                .default_value("4096")
                .help("Ring capacity (any value; the ring is exact-sized)"),
        )
        .arg(
            Arg::new("burst")
                .long("burst")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .default_value("32")
                .help("Descriptors per enqueue/dequeue call"),
        )
        .arg(
            Arg::new("shm")
                .long("shm")
                .action(ArgAction::SetTrue)
                .help("Place the ring in /dev/shm instead of the heap"),
        )
        .get_matches();

    let producers = *matches.get_one::<u32>("producers").unwrap_or(&4);
    let per_producer = *matches.get_one::<u64>("descriptors").unwrap_or(&200_000);
    let capacity = *matches.get_one::<u32>("capacity").unwrap_or(&4096);
    let burst = (*matches.get_one::<usize>("burst").unwrap_or(&32)).max(1);
    let backing = if matches.get_flag("shm") {
        Backing::SharedMemory
    } else {
        Backing::Heap
    };

    let ring = RingBuilder::new()
        .with_name("dma_tx")
        .with_capacity(capacity)
        .with_exact_size(true)
        .with_element_size(std::mem::size_of::<Descriptor>() as u32)
        .with_producer(SyncMode::Multi)
        .with_consumer(SyncMode::Single)
        .with_backing(backing)
        .build()?;
    info!(
        capacity = ring.capacity(),
        size = ring.size(),
        element_size = ring.element_size(),
        ?backing,
        "ring ready"
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let start = Instant::now();
    let mut handles = Vec::new();
    for core in 0..producers {
        let mut tx = ring.producer()?;
        let running = running.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("core-{core}"))
                .spawn(move || {
                    let mut batch = Vec::with_capacity(burst);
                    let mut seq = 0u64;
                    let mut stalls = 0u64;
                    while seq < per_producer && running.load(Ordering::Relaxed) {
                        batch.clear();
                        let end = (seq + burst as u64).min(per_producer);
                        batch.extend((seq..end).map(|s| {
                            let src = 0x1000_0000 + (s << 12);
                            let dst = 0x8000_0000 + ((core as u64) << 32) + (s << 12);
                            let len = 64 + (s % 4032) as u32;
                            Descriptor {
                                src,
                                dst,
                                len,
                                core,
                                seq: s,
                                check: checksum(src, dst, len, s),
                            }
                        }));
                        let mut posted = 0;
                        while posted < batch.len() && running.load(Ordering::Relaxed) {
                            let t = tx.enqueue_burst_as(&batch[posted..]);
                            if t.is_empty() {
                                stalls += 1;
                                std::hint::spin_loop();
                            }
                            posted += t.count as usize;
                        }
                        seq += posted as u64;
                    }
                    (seq, stalls)
                })?,
        );
    }

    let mut rx = ring.consumer()?;
    let total = producers as u64 * per_producer;
    let mut next_seq = vec![0u64; producers as usize];
    let mut out = vec![Descriptor::zeroed(); burst];
    let mut drained = 0u64;
    let mut bytes = 0u64;
    let mut bad = 0u64;

    while drained < total && running.load(Ordering::Relaxed) {
        let t = rx.dequeue_burst_as(&mut out);
        for d in &out[..t.count as usize] {
            if d.check != checksum(d.src, d.dst, d.len, d.seq) || d.seq != next_seq[d.core as usize] {
                bad += 1;
                warn!(core = d.core, seq = d.seq, "corrupt or reordered descriptor");
            }
            next_seq[d.core as usize] = d.seq + 1;
            bytes += d.len as u64;
        }
        drained += t.count as u64;
    }

    let mut stalls = 0;
    for h in handles {
        let (_posted, s) = h.join().map_err(|_| "producer thread panicked")?;
        stalls += s;
    }
    let elapsed = start.elapsed();

    info!(
        drained,
        bad,
        stalls,
        payload_mib = bytes / (1 << 20),
        elapsed = ?elapsed,
        rate = %format!("{:.2} Mdesc/s", drained as f64 / elapsed.as_secs_f64() / 1e6),
        "pipeline finished"
    );
    println!("{}", ring.dump());

    if bad != 0 {
        return Err(format!("{bad} descriptors failed verification").into());
    }
    Ok(())
}
