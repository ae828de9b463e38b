use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use coalesced_table::DefaultStrategy;
use coalesced_table::FnStrategy;
use coalesced_table::HashStrategy;
use coalesced_table::KeyType;
use coalesced_table::Scalar;
use coalesced_table::Table;
use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

/// Builds the table flavor under test.
trait TableFlavor {
    type Strategy: HashStrategy + Clone;

    fn build() -> Table<Self::Strategy>;
}

struct Foldhash;

impl TableFlavor for Foldhash {
    type Strategy = DefaultStrategy;

    fn build() -> Table<DefaultStrategy> {
        Table::new(KeyType::Int64)
    }
}

struct Sip;

fn sip_hash(_: KeyType, key: Scalar) -> u64 {
    let mut hasher = SipHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl TableFlavor for Sip {
    type Strategy = FnStrategy;

    fn build() -> Table<FnStrategy> {
        Table::with_functions(KeyType::Int64, Some(sip_hash), None)
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
    (1 << 17),
    (1 << 18),
];

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Find,
    Remove,
}

fn random_keys(count: usize) -> Vec<Scalar> {
    let mut rng = OsRng;
    (0..count).map(|_| rng.try_next_u64().unwrap()).collect()
}

fn filled<F: TableFlavor>(keys: &[Scalar]) -> Table<F::Strategy> {
    let mut table = F::build();
    for &key in keys {
        table.set(key, key).unwrap();
    }
    table
}

fn bench_insert_random<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<F>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = F::build();
                    for key in keys {
                        black_box(table.set(key, key).unwrap());
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = HashMap::new();
                    for key in keys {
                        black_box(table.insert(key, key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_insert_random_preallocated<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_preallocated_{}",
        core::any::type_name::<F>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = F::build();
                    table.try_reserve(size).unwrap();
                    for key in keys {
                        black_box(table.set(key, key).unwrap());
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = HashMap::with_capacity(size);
                    for key in keys {
                        black_box(table.insert(key, key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_find_hit_miss<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<F>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        let mut probes = keys[..size / 2].to_vec();
        probes.extend(random_keys(size / 2));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let table = filled::<F>(&keys);
        let model: HashMap<Scalar, Scalar> = keys.iter().map(|&key| (key, key)).collect();

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter(|| {
                for &key in &probes {
                    black_box(table.get(key));
                }
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(model.get(key));
                }
            })
        });
    }
    group.finish();
}

fn bench_remove<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<F>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        let table = filled::<F>(&keys);
        let model: HashMap<Scalar, Scalar> = keys.iter().map(|&key| (key, key)).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    (table.clone(), keys)
                },
                |(mut table, keys)| {
                    for key in keys {
                        black_box(table.delete(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    (model.clone(), keys)
                },
                |(mut model, keys)| {
                    for key in keys {
                        black_box(model.remove(&key));
                    }
                    black_box(model)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_mixed_probabilistic<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "mixed_probabilistic_{}",
        core::any::type_name::<F>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    const KEY_SPACE_MULTIPLIER: u64 = 2;

    for &size in SIZES[..=MAX_SIZE].iter() {
        let mut rng = SmallRng::from_os_rng();
        let operations = (0..size * 3)
            .map(|_| {
                let op_choice: f64 = rng.sample(distr::Uniform::new(0.0, 1.0).unwrap());
                if op_choice < 0.5 {
                    Operation::Find
                } else if op_choice < 0.75 {
                    Operation::Insert
                } else {
                    Operation::Remove
                }
            })
            .collect::<Vec<Operation>>();

        let insert_distr = Zipf::new(size as f32 - 1.0, 1.0).unwrap();
        let find_remove_distr =
            Zipf::new(size as f32 * KEY_SPACE_MULTIPLIER as f32 - 1.0, 1.0).unwrap();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter_batched(
                || {
                    let mut operations = operations.clone();
                    operations.shuffle(&mut SmallRng::from_os_rng());
                    operations
                },
                |operations| {
                    let mut table = F::build();
                    for operation in operations {
                        match operation {
                            Operation::Insert => {
                                let key = rng.sample(insert_distr) as u64;
                                black_box(table.set(key, key).unwrap());
                            }
                            Operation::Remove => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.delete(key));
                            }
                            Operation::Find => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.get(key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut operations = operations.clone();
                    operations.shuffle(&mut SmallRng::from_os_rng());
                    operations
                },
                |operations| {
                    let mut table = HashMap::new();
                    for operation in operations {
                        match operation {
                            Operation::Insert => {
                                let key = rng.sample(insert_distr) as u64;
                                black_box(table.insert(key, key));
                            }
                            Operation::Remove => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.remove(&key));
                            }
                            Operation::Find => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.get(&key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_churn<F: TableFlavor, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<F>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let insertions_and_removals = (0..size as u64)
            .flat_map(|key| [key, key])
            .collect::<Vec<Scalar>>();

        group.throughput(Throughput::Elements(insertions_and_removals.len() as u64));
        group.bench_function("coalesced_table", |b| {
            b.iter_batched(
                || {
                    let mut keys = insertions_and_removals.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = F::build();
                    for key in keys {
                        if table.delete(key).is_none() {
                            black_box(table.set(key, key).unwrap());
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut keys = insertions_and_removals.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = HashMap::new();
                    for key in keys {
                        if table.remove(&key).is_none() {
                            black_box(table.insert(key, key));
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<Foldhash, 8>,
    bench_insert_random::<Sip, 8>,
    bench_insert_random_preallocated::<Foldhash, 8>,
    bench_insert_random_preallocated::<Sip, 8>,
    bench_find_hit_miss::<Foldhash, 8>,
    bench_find_hit_miss::<Sip, 8>,
    bench_remove::<Foldhash, 8>,
    bench_remove::<Sip, 8>,
    bench_mixed_probabilistic::<Foldhash, 8>,
    bench_mixed_probabilistic::<Sip, 8>,
    bench_churn::<Foldhash, 8>,
    bench_churn::<Sip, 8>,
);

criterion_main!(benches);
