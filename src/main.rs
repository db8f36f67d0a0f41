use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use instant::{Duration, Instant};
use log::info;

use gridsolve::dictionary::{parse_words, parse_words_lenient};
use gridsolve::{BranchingTable, Grid, GridConfig, OrderStrategy, SolveConfig, SolveMode, Trie};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    /// Slots in grid order, across before down.
    Given,
    /// Slots with the most crossings first.
    Constrained,
    /// Slots with the fewest expected candidates first.
    Greedy,
    /// Best-rated permutation; small grids only.
    Exhaustive,
}

/// Fill a crossword grid with words from a word list.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Word list: whitespace-separated words.
    #[arg(short, long)]
    dictionary: PathBuf,

    /// File holding the grid template.
    #[arg(short, long, conflicts_with = "template")]
    grid: Option<PathBuf>,

    /// Grid template: '#' blocked, '.' empty, letters pre-filled. Rows are separated by newlines
    /// or '/'.
    template: Option<String>,

    /// Look for every fill instead of stopping at the first.
    #[arg(short, long)]
    all: bool,

    /// Print at most this many fills.
    #[arg(short, long, default_value_t = 1)]
    limit: usize,

    #[arg(short, long, value_enum, default_value_t = Order::Greedy)]
    order: Order,

    /// Give up after this many seconds.
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Skip dictionary tokens that are not words instead of failing.
    #[arg(long)]
    lenient: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.dictionary)
        .with_context(|| format!("reading dictionary {}", args.dictionary.display()))?;
    let words = if args.lenient {
        parse_words_lenient(&text)
    } else {
        parse_words(&text)?
    };
    let trie = Trie::from_words(&words)?;
    info!("{} words, {} trie nodes", trie.word_count(), trie.node_count());

    let template = match (&args.grid, &args.template) {
        (Some(path), _) => {
            fs::read_to_string(path).with_context(|| format!("reading grid {}", path.display()))?
        }
        (None, Some(template)) => template.replace('/', "\n"),
        (None, None) => bail!("no grid given; pass a template or --grid FILE"),
    };
    let mut config = GridConfig::new(Grid::parse(&template)?)?;

    let timeout = args
        .timeout
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--timeout must be a non-negative number of seconds")?;

    // The timeout covers building the branching table as well as the search.
    let started = Instant::now();
    let order = match args.order {
        Order::Given => OrderStrategy::AsGiven,
        Order::Constrained => OrderStrategy::MostConstrained,
        Order::Greedy => OrderStrategy::Greedy(BranchingTable::for_network(&words, &config.network)),
        Order::Exhaustive => OrderStrategy::Exhaustive(BranchingTable::for_network(&words, &config.network)),
    };
    let deadline = timeout.map(|timeout| timeout.saturating_sub(started.elapsed()));
    let solve_config = SolveConfig {
        mode: if args.all { SolveMode::AllSolutions } else { SolveMode::FirstSolution },
        order,
        deadline,
    };

    let outcome = config.solve(&trie, &solve_config)?;

    println!("{:?}", outcome.statistics);
    if outcome.solutions.is_empty() {
        if outcome.statistics.timed_out {
            bail!("timed out before finding a fill");
        }
        bail!("no fill exists for this grid");
    }

    println!("{} fill(s) found", outcome.solutions.len());
    for solution in outcome.solutions.iter().take(args.limit) {
        println!("{}", config.render(solution));
        for (placement, word) in config.placements.iter().zip(solution.words()) {
            println!("{:>10}  {}", placement.to_string(), word);
        }
    }

    Ok(())
}
