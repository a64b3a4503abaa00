//! Content-Addressing Benchmarks — Hashing and Batch Packing
//!
//! Benchmarks the pure functions on the state-refresh hot path: typed
//! transaction hashing, proposal hashing, and multisend packing.
//!
//! Run with: cargo bench --bench hashing_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use alloy::primitives::{Address, Bytes, U256};

use govexec::domain::batch::{SafeVersion, encode_batch};
use govexec::domain::hashing::{proposal_hash, transaction_hash};
use govexec::domain::transaction::{ExecutionBatch, ModuleTransaction, Operation};

fn sample_txs(count: usize) -> Vec<ModuleTransaction> {
    (0..count)
        .map(|i| ModuleTransaction {
            to: Address::repeat_byte(i as u8),
            value: U256::from(i as u64),
            data: Bytes::from(vec![0xab; 68]),
            operation: Operation::Call,
        })
        .collect()
}

/// Benchmark the EIP-712 typed hash of one transaction.
fn bench_transaction_hash(c: &mut Criterion) {
    let tx = sample_txs(1).remove(0);
    let module = Address::repeat_byte(0x5a);

    c.bench_function("transaction_hash_single", |b| {
        b.iter(|| {
            let _hash = transaction_hash(black_box(1), black_box(module), black_box(&tx), 0);
        });
    });
}

/// Benchmark the proposal hash over a ten-transaction set.
fn bench_proposal_hash(c: &mut Criterion) {
    let txs = sample_txs(10);

    c.bench_function("proposal_hash_10_txs", |b| {
        b.iter(|| {
            let _hash = proposal_hash(black_box(&txs));
        });
    });
}

/// Benchmark multisend packing of a ten-transaction batch.
fn bench_encode_batch(c: &mut Criterion) {
    let batch = ExecutionBatch::new(0, sample_txs(10));

    c.bench_function("encode_batch_10_txs", |b| {
        b.iter(|| {
            let _tx = encode_batch(black_box(1), SafeVersion::V1_3_0, black_box(&batch)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_transaction_hash,
    bench_proposal_hash,
    bench_encode_batch
);
criterion_main!(benches);
