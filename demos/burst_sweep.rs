// Throughput sweep over element widths, burst sizes and ordering strategies.
// One producer thread and one consumer thread per run.
//
// cargo run --release --example burst_sweep -- --elements 2000000

use clap::{Arg, Command};
use dmxp_ring::{AcqRel, Fenced, MemoryModel, RingBuilder, SyncMode};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const WIDTHS: [u32; 6] = [4, 8, 16, 24, 32, 64];
const BURSTS: [usize; 4] = [1, 8, 32, 128];

fn run<M: MemoryModel>(
    esize: u32,
    burst: usize,
    elements: u64,
    capacity: u32,
    multi: bool,
) -> Result<Duration, Box<dyn std::error::Error>> {
    let mode = if multi { SyncMode::Multi } else { SyncMode::Single };
    let ring = RingBuilder::new()
        .with_capacity(capacity)
        .with_element_size(esize)
        .with_producer(mode)
        .with_consumer(mode)
        .build_with_model::<M>()?;
    let mut tx = ring.producer()?;
    let mut rx = ring.consumer()?;
    let es = esize as usize;

    let start = Instant::now();
    let producer = thread::spawn(move || {
        let batch = vec![0x5au8; burst * es];
        let mut sent = 0u64;
        while sent < elements {
            let want = ((elements - sent) as usize).min(burst);
            sent += tx.enqueue_burst(&batch[..want * es]).count as u64;
        }
    });

    let mut out = vec![0u8; burst * es];
    let mut received = 0u64;
    while received < elements {
        received += rx.dequeue_burst(&mut out).count as u64;
    }
    producer.join().map_err(|_| "producer thread panicked")?;
    let elapsed = start.elapsed();

    debug!(model = M::NAME, esize, burst, dump = %ring.dump(), "run finished");
    Ok(elapsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("burst_sweep")
        .about("Measure ring throughput across element widths and burst sizes")
        .arg(
            Arg::new("elements")
                .long("elements")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .default_value("1000000")
                .help("Elements moved per run"),
        )
        .arg(
            Arg::new("capacity")
                .long("capacity")
                .value_name("SLOTS")
                .value_parser(clap::value_parser!(u32))
                .default_value("1024")
                .help("Ring capacity (power of two)"),
        )
        .arg(
            Arg::new("multi")
                .long("multi")
                .action(clap::ArgAction::SetTrue)
                .help("Use the multi-producer/multi-consumer paths"),
        )
        .get_matches();

    let elements = *matches.get_one::<u64>("elements").unwrap_or(&1_000_000);
    let capacity = *matches.get_one::<u32>("capacity").unwrap_or(&1024);
    let multi = matches.get_flag("multi");
    info!(elements, capacity, multi, "starting sweep");

    println!(
        "{:<8} {:>6} {:>6} {:>12} {:>10}",
        "model", "esize", "burst", "Melem/s", "MiB/s"
    );
    for esize in WIDTHS {
        for burst in BURSTS {
            for (name, elapsed) in [
                (AcqRel::NAME, run::<AcqRel>(esize, burst, elements, capacity, multi)?),
                (Fenced::NAME, run::<Fenced>(esize, burst, elements, capacity, multi)?),
            ] {
                let secs = elapsed.as_secs_f64();
                println!(
                    "{:<8} {:>6} {:>6} {:>12.2} {:>10.1}",
                    name,
                    esize,
                    burst,
                    elements as f64 / secs / 1e6,
                    (elements * esize as u64) as f64 / secs / (1 << 20) as f64
                );
            }
        }
    }
    Ok(())
}
