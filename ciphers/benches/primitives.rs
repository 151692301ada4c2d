criterion::criterion_main!(evhash::benches, field::benches);

fn benchid(base: KvPairs, last: KvPairs) -> String {
    format!("{base},{last}")
}

#[derive(Clone, Copy, Debug)]
struct KvPair<'a>(&'a str, &'a str);

impl std::fmt::Display for KvPair<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{k}={v}", k = self.0, v = self.1)
    }
}

#[derive(Clone, Copy, Debug)]
struct KvPairs<'a>(&'a [KvPair<'a>]);

impl std::fmt::Display for KvPairs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut delim = "";
        for pair in self.0 {
            write!(f, "{delim}{pair}")?;
            delim = ",";
        }
        Ok(())
    }
}

mod evhash {
    criterion::criterion_group!(benches, bench_evhash_96, bench_evhash_256);

    use criterion::{black_box, Criterion, Throughput};
    use qtunnel_cipher_traits::{ContextAlgorithm, Key};
    use qtunnel_ciphers::gf2::Precalculation;
    use qtunnel_ciphers::subtle::evhash::EvHash;

    fn bench_evhash_96(c: &mut Criterion) {
        template(c, 12);
    }

    fn bench_evhash_256(c: &mut Criterion) {
        template(c, 32);
    }

    fn template(c: &mut Criterion, key_len: usize) {
        use crate::{benchid, KvPair, KvPairs};

        let bits = (key_len * 8).to_string();
        let init_key = Key::new(vec![0x61; key_len]);
        let final_key = Key::new(vec![0x31; key_len]);
        let data = vec![0x5au8; 64 * 1024];

        let mut group = c.benchmark_group("evhash");
        group.throughput(Throughput::Bytes(data.len() as u64));

        for (precalculation, name) in [
            (Precalculation::SingleStep, "single-step"),
            (Precalculation::TwoStep, "two-step"),
        ] {
            let id = benchid(
                KvPairs(&[KvPair("primitive", "evhash"), KvPair("bits", &bits)]),
                KvPairs(&[KvPair("precalculation", name), KvPair("length", "64KiB")]),
            );
            let proto = EvHash::new(&init_key, precalculation).unwrap();
            group.bench_function(&id, |bench| {
                bench.iter(|| {
                    let mut h = proto.clone();
                    h.add(black_box(&data));
                    h.finalize(&final_key)
                });
            });
        }
        group.finish();
    }
}

mod field {
    criterion::criterion_group!(benches, bench_multiply_96);

    use criterion::{black_box, Criterion};
    use qtunnel_ciphers::gf2::{Blob, FastAlpha, Precalculation, GF2_96};

    fn bench_multiply_96(c: &mut Criterion) {
        use crate::{benchid, KvPair, KvPairs};

        let base = [KvPair("primitive", "gf2"), KvPair("bits", "96")];
        let a = Blob::<3>([0x6162_6364; 3]);
        let b = Blob::<3>([0x3132_3334; 3]);

        c.bench_function(
            &benchid(KvPairs(&base), KvPairs(&[KvPair("operation", "multiply")])),
            |bench| bench.iter(|| GF2_96.multiply(black_box(&a), black_box(&b))),
        );

        let fast = FastAlpha::new(&*GF2_96, a, Precalculation::SingleStep);
        c.bench_function(
            &benchid(KvPairs(&base), KvPairs(&[KvPair("operation", "times_alpha")])),
            |bench| bench.iter(|| fast.times_alpha(black_box(&b))),
        );
    }
}
