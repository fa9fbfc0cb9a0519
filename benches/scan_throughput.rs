use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use multiscan::{literal_dfa, Absolute, Dfa, Offset, Scanner, State};

const BUF_LEN: usize = 1024 * 1024; // 1 MiB

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn fill_ascii(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            let v = (self.next_u64() & 0xff) as u8;
            *b = b'b' + (v % 24);
        }
    }
}

/// DFA for `.*[Aa]`: the shortcut-friendliest shape, one self-looping
/// state with two exit bytes.
fn dot_star_aa() -> Dfa {
    let mut dfa = Dfa::new(2, 0);
    for s in [0u32, 1] {
        dfa.set_all(s, 0);
        dfa.set_transition(s, b'A', 1);
        dfa.set_transition(s, b'a', 1);
    }
    dfa.mark_final(1);
    dfa
}

fn by_steps(s: &Scanner<'_, Offset>, bytes: &[u8]) -> State {
    let mut st = State::default();
    s.initialize(&mut st);
    for &b in bytes {
        s.step(&mut st, b);
    }
    st
}

fn bench_shortcut_skipping(c: &mut Criterion) {
    let scanner = Scanner::<Offset>::new(&dot_star_aa());
    // No 'a'/'A' anywhere: the whole buffer is skipped by mask checks.
    let mut rng = XorShift64::new(0x5eed);
    let mut data = vec![0u8; BUF_LEN];
    rng.fill_ascii(&mut data);

    let mut group = c.benchmark_group("shortcut_skipping");
    group.throughput(Throughput::Bytes(BUF_LEN as u64));
    group.bench_function("run", |b| {
        b.iter(|| black_box(scanner.run(scanner.initial(), black_box(&data))))
    });
    group.bench_function("step_baseline", |b| {
        b.iter(|| black_box(by_steps(&scanner, black_box(&data))))
    });
    group.finish();
}

/// Every state leaves itself on three letter classes, so no state gets
/// shortcut masks and the body stays in chunked stepping.
fn mod3_counter() -> Dfa {
    let mut dfa = Dfa::new(3, 0);
    for s in 0..3u32 {
        for b in 0..=255u8 {
            dfa.set_transition(s, b, (s + (b % 4) as u32) % 3);
        }
    }
    dfa.mark_final(1);
    dfa
}

fn bench_chunked_stepping(c: &mut Criterion) {
    let offset = Scanner::<Offset>::new(&mod3_counter());
    let absolute = Scanner::<Absolute>::new(&mod3_counter());
    let mut rng = XorShift64::new(0xfeed);
    let mut data = vec![0u8; BUF_LEN];
    rng.fill_ascii(&mut data);

    let mut group = c.benchmark_group("chunked_stepping");
    group.throughput(Throughput::Bytes(BUF_LEN as u64));
    group.bench_with_input(BenchmarkId::new("run", "offset"), &offset, |b, s| {
        b.iter(|| black_box(s.run(s.initial(), black_box(&data))))
    });
    group.bench_with_input(BenchmarkId::new("run", "absolute"), &absolute, |b, s| {
        b.iter(|| black_box(s.run(s.initial(), black_box(&data))))
    });
    group.finish();
}

fn bench_dead_state_exit(c: &mut Criterion) {
    let scanner = Scanner::<Offset>::new(&literal_dfa(b"prefix"));
    let mut rng = XorShift64::new(0xdead);
    let mut data = vec![0u8; BUF_LEN];
    rng.fill_ascii(&mut data);
    let mut dead = State::default();
    scanner.initialize(&mut dead);
    dead = scanner.run(dead, b"pr!");
    assert!(scanner.is_dead(&dead));

    let mut group = c.benchmark_group("dead_state_exit");
    group.throughput(Throughput::Bytes(BUF_LEN as u64));
    group.bench_function("run", |b| {
        b.iter(|| black_box(scanner.run(black_box(dead), black_box(&data))))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_shortcut_skipping,
    bench_chunked_stepping,
    bench_dead_state_exit
);
criterion_main!(benches);
