use std::fs;

use anyhow::{Context, Result};
use clap::{App, Arg};
use gridfill::{find_fill, render_grid, FillOptions, GridConfig};
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("generate")
        .about("Fill a crossword structure with words from a word list")
        .arg(
            Arg::with_name("structure")
                .value_name("STRUCTURE")
                .help("Grid structure file: '_' for open cells, '#' for blocked cells")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .help("Word list file, one word per line")
                .index(2)
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .value_name("OUTPUT")
                .help("Write the filled grid to this file")
                .index(3),
        )
        .arg(
            Arg::with_name("forward-checking")
                .long("forward-checking")
                .help("Re-run arc consistency after every choice")
                .takes_value(false),
        )
        .get_matches();

    // Both positional arguments are required, so clap has already rejected anything missing.
    let structure = matches.value_of("structure").unwrap_or_default();
    let words = matches.value_of("words").unwrap_or_default();

    let grid_config = GridConfig::from_files(structure, words)
        .with_context(|| format!("Failed to load crossword from {} and {}", structure, words))?;

    let options = FillOptions {
        forward_checking: matches.is_present("forward-checking"),
    };

    let result = match find_fill(&grid_config, &options) {
        Ok(result) => result,
        Err(_) => {
            println!("No solution.");
            return Ok(());
        }
    };

    let display_grid = render_grid(&grid_config, &result.assignment);
    println!("{}", display_grid);

    if let Some(output) = matches.value_of("output") {
        fs::write(output, format!("{}\n", display_grid))
            .with_context(|| format!("Unable to write {}", output))?;
        info!("Wrote filled grid to {}", output);
    }

    Ok(())
}
