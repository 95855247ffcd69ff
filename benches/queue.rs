use chs::{OperationKind, OperationQueue, SpinBackoff, YieldNow};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use criterion::{criterion_group, criterion_main, Criterion};

fn bench_single_thread_round_trip(c: &mut Criterion) {
    c.bench_function("queue: single threaded round trip (yield)", |b| {
        let queue = OperationQueue::<YieldNow>::new();

        b.iter(|| {
            queue.enqueue(criterion::black_box(1), OperationKind::Insert);
            queue.dequeue()
        })
    });

    c.bench_function("queue: single threaded round trip (backoff)", |b| {
        let queue = OperationQueue::<SpinBackoff>::new();

        b.iter(|| {
            queue.enqueue(criterion::black_box(1), OperationKind::Insert);
            queue.dequeue()
        })
    });
}

fn bench_multi_thread_round_trip(c: &mut Criterion) {
    let num_threads = num_cpus::get();

    let queue = Arc::new(OperationQueue::<YieldNow>::new());
    let keep_going = Arc::new(AtomicBool::new(true));

    // every thread enqueues before it dequeues, so in-flight occupancy never
    // exceeds the thread count and nobody waits forever
    let threads: Vec<_> = (0..num_threads - 1)
        .map(|i| {
            let queue = queue.clone();
            let keep_going = keep_going.clone();

            thread::spawn(move || {
                while keep_going.load(Ordering::SeqCst) {
                    queue.enqueue(criterion::black_box(i as i64), OperationKind::Lookup);
                    queue.dequeue();
                }
            })
        })
        .collect();

    {
        let queue = queue.clone();

        c.bench_function("queue: contended round trip", move |b| {
            b.iter(|| {
                queue.enqueue(criterion::black_box(0), OperationKind::Lookup);
                queue.dequeue()
            })
        });
    }

    keep_going.store(false, Ordering::SeqCst);

    let _: Vec<_> = threads.into_iter().map(|t| t.join()).collect();
}

criterion_group!(
    benches,
    bench_single_thread_round_trip,
    bench_multi_thread_round_trip,
);
criterion_main!(benches);
