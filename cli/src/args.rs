use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stilt")]
#[command(about = "The Stilt language toolchain", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a source file (.stl) or a compiled chunk (.stlb)
    Run {
        /// Path to the file
        path: String,
        /// Evaluate the AST directly instead of compiling to bytecode
        #[arg(long)]
        tree_walk: bool,
    },
    /// Compile a source file to a binary chunk
    Compile {
        /// Input source file
        path: String,
        /// Output chunk file (optional)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the decoded instruction listing of a source file
    Disassemble {
        /// Path to the source file
        path: String,
    },
    /// Start the interactive prompt
    Repl,
}
