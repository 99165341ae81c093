// Signing & verification benchmarks for Tessera.
//
// Covers secp256k1 key generation, canonical encoding, transaction signing
// and verification, and the block signature scan at various block sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tessera_protocol::block::FinalBlock;
use tessera_protocol::crypto::keys::WalletKeypair;
use tessera_protocol::transaction::{
    sign_transaction, verify_transaction, CanonicalEncode, Operation, Transaction, Transfer,
    TransactionBuilder,
};

fn unsigned_exchange(sender: &WalletKeypair, legs: usize) -> Transaction {
    let mut builder = TransactionBuilder::new(Operation::Exchange)
        .transfer(Transfer::new(sender.address(), 0, -(legs as i64), 0))
        .nonce(b"bench-nonce-0001".to_vec());
    for _ in 0..legs {
        builder = builder.transfer(Transfer::new(WalletKeypair::generate().address(), 0, 1, 0));
    }
    builder.build().unwrap()
}

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("secp256k1/keypair_generate", |b| {
        b.iter(WalletKeypair::generate);
    });
}

fn bench_encode_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding/transaction");
    let sender = WalletKeypair::generate();

    for legs in [1, 16, 255] {
        let tx = unsigned_exchange(&sender, legs);
        group.throughput(Throughput::Elements(legs as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(legs), &tx, |b, tx| {
            b.iter(|| tx.encode_canonical().unwrap());
        });
    }

    group.finish();
}

fn bench_sign_transaction(c: &mut Criterion) {
    let sender = WalletKeypair::generate();
    let tx = unsigned_exchange(&sender, 1);

    c.bench_function("secp256k1/sign_transaction", |b| {
        b.iter(|| sign_transaction(&tx, &sender).unwrap());
    });
}

fn bench_verify_transaction(c: &mut Criterion) {
    let sender = WalletKeypair::generate();
    let signed = sign_transaction(&unsigned_exchange(&sender, 1), &sender).unwrap();

    c.bench_function("secp256k1/verify_transaction", |b| {
        b.iter(|| verify_transaction(&signed).unwrap());
    });
}

fn bench_block_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("block/find_by_signature");
    let sender = WalletKeypair::generate();

    for size in [10, 100, 1000] {
        let txs: Vec<Transaction> = (0..size)
            .map(|i| {
                let tx = TransactionBuilder::new(Operation::Exchange)
                    .transfer(Transfer::new(sender.address(), 0, -1, 0))
                    .transfer(Transfer::new(sender.address(), 0, 1, 0))
                    .nonce(format!("tx-{:06}", i).into_bytes())
                    .build()
                    .unwrap();
                sign_transaction(&tx, &sender).unwrap()
            })
            .collect();
        let target = txs[size - 1].signature().unwrap().clone();
        let block = FinalBlock::new([0u8; 32], 0, txs).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &block, |b, block| {
            b.iter(|| block.find_by_signature(&target).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_encode_canonical,
    bench_sign_transaction,
    bench_verify_transaction,
    bench_block_scan,
);
criterion_main!(benches);
