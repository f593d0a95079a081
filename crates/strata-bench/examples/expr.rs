//! Expression calculator demo.
//!
//! Demonstrates: parse each line into a scratch arena → evaluate → bind the
//! result under a name interned in a long-lived arena → reset the scratch
//! arena. Run with `RUST_LOG=strata_arena=trace` to watch page reuse.
//!
//! ```text
//! cargo run -p strata-bench --example expr -- "r = 2" "area = 3.14159 * r * r"
//! ```

use strata_arena::{with_temp, Arena, ArenaConfig};
use strata_bench::expr::{parse, Env, ExprError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SCRIPT: &[&str] = &[
    "width = 12",
    "height = width / 3",
    "area = width * height",
    "-(area - 2 * (width + height)) / 4",
    "area * missing",
    "(1 + 2",
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let lines: Vec<&str> = if args.is_empty() {
        SCRIPT.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    println!("=== Strata Expression Demo ===\n");

    let names = Arena::new(ArenaConfig::default()).unwrap();
    let mut scratch = Arena::new(ArenaConfig::new().with_page_size(1024)).unwrap();
    let mut env = Env::new_in(&names);

    for line in lines {
        let (target, src) = match line.split_once('=') {
            Some((name, rhs)) => (Some(name.trim()), rhs),
            None => (None, line),
        };

        let result = parse(&scratch, src).and_then(|tree| {
            info!(nodes = tree.node_count(), bytes = scratch.allocated(), "parsed");
            tree.eval(&env)
        });

        match result {
            Ok(value) => {
                let label = target.unwrap_or("_");
                with_temp(|temp| {
                    if let Ok(shown) = temp.alloc_fmt(format_args!("{label:<8} = {value:.3}")) {
                        println!("  {shown}");
                    }
                    temp.reset();
                });
                if let Some(name) = target {
                    let key: &str = names.alloc_str(name).unwrap();
                    env.put(key, value).unwrap();
                }
            }
            Err(ExprError::UnknownVariable(name)) => {
                warn!(%name, "unbound variable");
                println!("  error: unknown variable '{name}' in '{line}'");
            }
            Err(err) => println!("  error: {err} in '{line}'"),
        }
        scratch.reset();
    }

    let stats = names.stats();
    println!(
        "\nbindings={}, name arena: allocated={} pages={}",
        env.len(),
        stats.allocated,
        stats.page_count
    );
}
