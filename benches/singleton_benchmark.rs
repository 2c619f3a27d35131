use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lazy_singleton::sync::RawMutex;
use lazy_singleton::{static_holder, Holder, InvalidState, Permit, Singleton};
use std::sync::{Mutex, OnceLock};
use std::thread;

struct Settings {
    retries: u32,
}

impl Singleton for Settings {
    type Error = InvalidState;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        Ok(Settings { retries: 3 })
    }

    static_holder!(Settings);
}

struct Registered {
    retries: u32,
}

impl Singleton for Registered {
    type Error = InvalidState;

    fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
        Ok(Registered { retries: 3 })
    }
}

fn bench_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("fast_path");

    group.bench_function("std_once_lock", |b| {
        static CELL: OnceLock<u32> = OnceLock::new();
        b.iter(|| black_box(*CELL.get_or_init(|| 3)))
    });

    group.bench_function("static_holder", |b| {
        b.iter(|| black_box(Settings::instance().map(|s| s.retries)))
    });

    group.bench_function("registry_holder", |b| {
        b.iter(|| black_box(Registered::instance().map(|s| s.retries)))
    });

    group.finish();
}

fn bench_first_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_access");

    group.bench_function("holder_get_or_init", |b| {
        b.iter(|| {
            let holder: Holder<u64> = Holder::new();
            black_box(holder.get_or_init(|| 7).copied())
        })
    });

    group.bench_function("std_once_lock", |b| {
        b.iter(|| {
            let cell: OnceLock<u64> = OnceLock::new();
            black_box(*cell.get_or_init(|| 7))
        })
    });

    group.finish();
}

fn bench_contended_lock(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_lock");
    const THREADS: usize = 4;
    const ITERS: usize = 1_000;

    group.bench_function("std_mutex", |b| {
        let mutex = Mutex::new(());
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..ITERS {
                            black_box(mutex.lock().map(|_| ()).is_ok());
                        }
                    });
                }
            });
        })
    });

    group.bench_function("raw_mutex", |b| {
        let mutex = RawMutex::new();
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..ITERS {
                            let _g = black_box(mutex.lock());
                        }
                    });
                }
            });
        })
    });

    group.finish();
}

criterion_group!(benches, bench_fast_path, bench_first_access, bench_contended_lock);
criterion_main!(benches);
