use clap::Parser;
use coalesced_table::KeyType;
use coalesced_table::Table;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the inserted keys to delete again before reporting.
    #[arg(short = 'd', long = "delete_fraction", default_value_t = 0.25)]
    delete_fraction: f64,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating Table with target capacity: {}",
        args.target_capacity
    );

    let mut table = Table::new(KeyType::Int64);
    if let Err(err) = table.try_reserve(args.target_capacity) {
        eprintln!("Failed to reserve: {err}");
        return;
    }

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table with u64 keys...");

    let num_values = table.capacity();
    for i in 0..num_values {
        let key = i as u64;
        if let Err(err) = table.set(key, key * 2) {
            eprintln!("Insert of {key} failed: {err}");
            return;
        }
    }

    println!("Inserted {} values into table", table.len());
    assert_eq!(table.capacity(), num_values, "filling to capacity must not grow");

    let deletions = (num_values as f64 * args.delete_fraction.clamp(0.0, 1.0)) as usize;
    for i in (0..num_values).step_by(2).take(deletions) {
        table.delete(i as u64);
    }
    println!("Deleted {} values", num_values - table.len());

    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    let histogram = table.chain_histogram();
    println!("=== Chain Length Histogram ===");
    for (index, count) in histogram.iter().enumerate() {
        if *count > 0 {
            println!("{:>4}: {}", index + 1, count);
        }
    }

    table.debug_stats().print();
}
