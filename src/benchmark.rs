use anyhow::{Context, ensure};
use bstree::{OrderedTree, TreeOps, Value};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use std::time::Instant;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "tree-benchmark")]
#[command(about = "A binary search tree performance testing tool")]
struct Args {
    #[arg(long, default_value = "100000")]
    size: usize,

    /// Order in which values are inserted; sorted orders build a chain.
    #[arg(long, value_enum, default_value_t = Order::Shuffled)]
    order: Order,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Check every tree invariant after each phase.
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    Ascending,
    Descending,
    Shuffled,
}

impl Order {
    fn values(self, size: usize, seed: u64) -> Vec<Value> {
        let mut values: Vec<Value> = (0..size as Value).collect();
        match self {
            Order::Ascending => {}
            Order::Descending => values.reverse(),
            Order::Shuffled => {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                values.shuffle(&mut rng);
            }
        }
        values
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let values = args.order.values(args.size, args.seed);
    let mut tree = OrderedTree::new();

    println!(
        "Running with {} nodes inserted in {:?} order",
        args.size, args.order
    );

    let start = Instant::now();
    for (i, &value) in values.iter().enumerate() {
        ensure!(tree.len() == i, "tree holds {} nodes, expected {i}", tree.len());
        tree.insert(value);
    }
    let inserted = Instant::now();
    if args.validate {
        tree.validate().context("tree broken after inserts")?;
    }

    for &value in &values {
        ensure!(tree.search(value), "inserted value {value} not found");
    }
    let checked_search = Instant::now();

    println!(
        "Height after inserts: {}, min {:?}, max {:?}",
        tree.height().unwrap_or(0),
        tree.min(),
        tree.max(),
    );

    for &value in &values {
        ensure!(tree.remove(value), "inserted value {value} could not be removed");
    }
    let end = Instant::now();
    if args.validate {
        tree.validate().context("tree broken after removals")?;
    }
    ensure!(tree.is_empty(), "tree still holds {} nodes", tree.len());

    println!(
        "Inserts took {} seconds",
        inserted.saturating_duration_since(start).as_secs_f32()
    );
    println!(
        "Searches took {} seconds",
        checked_search
            .saturating_duration_since(inserted)
            .as_secs_f32()
    );
    println!(
        "Removals took {} seconds",
        end.saturating_duration_since(checked_search)
            .as_secs_f32()
    );
    println!(
        "Total {} seconds",
        end.saturating_duration_since(start).as_secs_f32()
    );
    Ok(())
}
