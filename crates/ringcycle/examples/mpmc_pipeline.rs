use ringcycle::{init_tracing, Config, MpmcQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn main() {
    init_tracing();

    println!("ringcycle MPMC Pipeline Example");
    println!("===============================\n");

    let config = Config::new(
        4096, // 4K slots
        8,    // up to 8 handles per end
        true, // metrics on so we can report claim behaviour
    );

    let queue = MpmcQueue::<[u64; 8]>::new(config).expect("valid config");

    const N_PRODUCERS: usize = 4;
    const N_CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: usize = 250_000;
    const TOTAL: usize = N_PRODUCERS * ITEMS_PER_PRODUCER;

    println!("Configuration:");
    println!("  Ring capacity: {} slots", queue.capacity());
    println!("  Producers: {}", N_PRODUCERS);
    println!("  Consumers: {}", N_CONSUMERS);
    println!("  Total items: {}\n", TOTAL);

    let start = Instant::now();
    let consumed = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..N_PRODUCERS)
        .map(|id| {
            let mut producer = queue.register_producer().expect("producer slot");
            thread::spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    let value = (id * ITEMS_PER_PRODUCER + i) as u64;
                    producer.enqueue([value; 8]); // 64 bytes per item
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..N_CONSUMERS)
        .map(|_| {
            let mut consumer = queue.register_consumer().expect("consumer slot");
            let consumed = Arc::clone(&consumed);
            thread::spawn(move || {
                let mut checksum = 0u64;
                while consumed.load(Ordering::Relaxed) < TOTAL {
                    let n = consumer.consume_up_to(1024, |item| {
                        checksum = checksum.wrapping_add(item[0]);
                    });
                    if n == 0 {
                        thread::yield_now();
                    } else {
                        consumed.fetch_add(n, Ordering::Relaxed);
                    }
                }
                checksum
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    let checksum = consumers
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold(0u64, u64::wrapping_add);
    let duration = start.elapsed();

    let expected = (0..TOTAL as u64).fold(0u64, u64::wrapping_add);
    assert_eq!(checksum, expected, "items lost or duplicated");

    let metrics = queue.metrics();
    let items_per_sec = TOTAL as f64 / duration.as_secs_f64();

    println!("Results:");
    println!("  Items consumed: {}", metrics.dequeued);
    println!("  Duration: {:.2?}", duration);
    println!("  Throughput: {:.2} million items/sec", items_per_sec / 1_000_000.0);
    println!("  Bandwidth: {:.2} GB/sec", items_per_sec * 64.0 / 1_000_000_000.0);
    println!("  CAS retries: {}", metrics.cas_retries);
    println!("  Abandoned claims: {}", metrics.abandoned_claims);
    println!("  Backoff rounds waiting on claims: {}", metrics.claim_waits);
}
