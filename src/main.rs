//! catx - an enhanced cat
//!
//! catx provides:
//! - An argument-driven line pipeline (numbering, truncation, cut/replace,
//!   filters, case and numeric transforms)
//! - Keyword/pattern search with merged highlight intervals
//! - An interactive pager with a small command language
//! - Space-filling-curve and entropy visualizations of file bytes

use anyhow::Result;

mod args;
mod backends;
mod cache;
mod cli;
mod core;
mod pager;
mod search;
mod viz;

fn main() -> Result<()> {
    let tokens: Vec<String> = std::env::args().skip(1).collect();
    cli::run(tokens)
}
