//! Rendezvous handoff throughput

use criterion::{BenchmarkId, Criterion, Throughput};
use racetrap::Rendezvous;

const MESSAGES: u64 = 1_000;

pub fn bench_handoff(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("handoff");
    group.throughput(Throughput::Elements(MESSAGES));

    for capacity in [0usize, 1, 64] {
        group.bench_with_input(
            BenchmarkId::new("send_recv", capacity),
            &capacity,
            |b, &capacity| {
                b.to_async(&rt).iter(|| async move {
                    let handoff = Rendezvous::buffered(capacity);
                    let tx = handoff.clone();
                    let producer = tokio::spawn(async move {
                        for i in 0..MESSAGES {
                            tx.send(i).await.unwrap();
                        }
                        tx.close();
                    });

                    let mut sum = 0;
                    while let Some(value) = handoff.recv().await {
                        sum += value;
                    }
                    producer.await.unwrap();
                    sum
                });
            },
        );
    }

    group.bench_function("try_send_full", |b| {
        let handoff = Rendezvous::unbuffered();
        b.iter(|| handoff.try_send(1u64).is_err());
    });

    group.finish();
}
