use std::io::{self, BufRead, Write};

use anyhow::Result;
use compiler::Compiler;
use stilt_parser::parse_program;
use vm::Vm;

/// Line-oriented prompt. The compiler and the VM globals persist across
/// entries; each line compiles to a fresh chunk executed on reset frames.
/// Prompts and errors go to stderr so program output stays clean.
pub fn run_repl() -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut compiler = Compiler::new();
    let mut vm = Vm::new(Vec::new(), Vec::new(), 0, &mut stdout);

    eprintln!("stilt repl (ctrl-d to exit)");
    loop {
        eprint!("> ");
        io::stderr().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let program = match parse_program(line) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let script = match compiler.compile(&program) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        vm.reload(script.code, script.constants, script.global_count);
        if let Err(e) = vm.run() {
            let offset = vm.current_offset().unwrap_or(0);
            eprintln!("runtime error at instruction offset {offset}: {e}");
        }
    }
    Ok(())
}
