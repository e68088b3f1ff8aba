//! Text-corpus compression demo.
//!
//! Feeds the characters of one or more text files through a chronicle backed
//! by an in-memory pattern storage, compacting periodically, and reports the
//! resulting compression statistics and the longest discovered patterns.
//!
//! ```bash
//! cargo run --example compress -- book1.txt book2.txt
//! ```

use std::env;
use std::fs;
use std::process;

use chronicle::{Chronicle, MemoryStore, PatternStore};

/// Sequence capacity.
const CAPACITY: usize = 64 * 1024;
/// Holes tolerated before a compaction pass.
const COMPACT_THRESHOLD: u32 = 4 * 1024;
/// How many of the longest patterns to print.
const TOP: usize = 20;

fn main() {
    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: compress <text file>...");
        process::exit(2);
    }

    let mut store = MemoryStore::new();
    for symbol in [' ', '.', ':', ',', '!', '?', '\'', '"'] {
        store.frozen_atom(symbol);
    }
    let mut chronicle = Chronicle::new(CAPACITY, store);

    let mut total: u64 = 0;
    let mut continuations: u64 = 0;
    let mut compactions: u32 = 0;

    for path in &paths {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("cannot read `{}`: {}", path, e);
                process::exit(1);
            }
        };
        eprintln!("processing `{}` ({} bytes)", path, bytes.len());

        let mut prev = b' ';
        for mut byte in bytes {
            if byte == b'\r' {
                continue;
            }
            if byte < 32 || byte >= 127 {
                byte = b' ';
            }
            if byte == b' ' && prev == b' ' {
                continue;
            }
            prev = byte;
            let symbol = (byte as char).to_ascii_lowercase();
            total += 1;

            let id = chronicle.store_mut().atom(symbol);
            assert!(chronicle.incl(id));
            if chronicle.store().composite(chronicle.last_id()) {
                continuations += 1;
            }
            if chronicle.gap() >= COMPACT_THRESHOLD {
                chronicle.compact();
                compactions += 1;
            }
        }
    }

    if total == 0 {
        eprintln!("nothing to process");
        return;
    }

    let fraction = chronicle.len() as f64 / CAPACITY as f64;
    println!("total symbols processed     {:>10}", total);
    println!(
        "sequence length             {:>10} ~ {:.2} % of capacity",
        chronicle.len(),
        100.0 * fraction
    );
    println!("compacted                   {:>10} times", compactions);
    println!("gap                         {:>10}", chronicle.gap());
    println!("patterns minted             {:>10}", chronicle.store().pattern_count());
    println!("pair views cached           {:>10}", chronicle.store().view_count());
    println!("distinct elements resident  {:>10}", chronicle.distinct());
    println!(
        "cases with continuation     {:>12.2} %",
        100.0 * continuations as f64 / total as f64
    );
    println!(
        "sequence compression ratio  {:>12.2}",
        total as f64 / chronicle.len().max(1) as f64
    );

    let mut rendered: Vec<String> = chronicle
        .store()
        .patterns()
        .map(|(id, _)| chronicle.store().lex(id))
        .collect();
    rendered.sort_by(|l, r| r.len().cmp(&l.len()).then_with(|| l.cmp(r)));
    println!("\ntop {} longest patterns:", TOP.min(rendered.len()));
    for (ord, pattern) in rendered.iter().take(TOP).enumerate() {
        println!("{:>4}  `{}`", ord + 1, pattern);
    }
}
