use std::fs;
use std::io::{self, BufReader};

use anyhow::{anyhow, Context, Result};
use compiler::{CompiledScript, Compiler};
use memory::Value;
use stilt_parser::parse_program;
use vm::Vm;

pub fn run_file(path: &str, tree_walk: bool) -> Result<()> {
    if path.ends_with(".stlb") {
        if tree_walk {
            return Err(anyhow!("--tree-walk needs source input, not a compiled chunk"));
        }
        let file = fs::File::open(path).with_context(|| format!("failed to open {path}"))?;
        let chunk = vm::loader::load_chunk(&mut BufReader::new(file))?;
        execute(chunk.code, chunk.constants, chunk.global_count)
    } else {
        let source =
            fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        if tree_walk {
            return evaluate(&source);
        }
        let script = compile_source(&source)?;
        execute(script.code, script.constants, script.global_count)
    }
}

fn evaluate(source: &str) -> Result<()> {
    let program = parse_program(source)?;
    let mut stdout = io::stdout();
    let mut interp = interpreter::Interpreter::new(&mut stdout);
    interp.interpret(&program)?;
    Ok(())
}

pub fn compile_source(source: &str) -> Result<CompiledScript> {
    let program = parse_program(source)?;
    let script = Compiler::new().compile(&program)?;
    Ok(script)
}

fn execute(code: Vec<u8>, constants: Vec<Value>, global_count: usize) -> Result<()> {
    let mut stdout = io::stdout();
    let mut vm = Vm::new(code, constants, global_count, &mut stdout);
    let result = vm.run();
    if let Err(e) = result {
        let offset = vm.current_offset().unwrap_or(0);
        return Err(anyhow!("runtime error at instruction offset {offset}: {e}"));
    }
    Ok(())
}
