use anyhow::Result;
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::commands::{compile, disassemble, run};
use cli::repl;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { path, tree_walk } => run::run_file(path, *tree_walk),
        Commands::Compile { path, output } => compile::compile_file(path, output.as_deref()),
        Commands::Disassemble { path } => disassemble::disassemble_file(path),
        Commands::Repl => repl::run_repl(),
    }
}
