use std::fs;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use super::run::compile_source;

pub fn compile_file(path: &str, output: Option<&str>) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let script = compile_source(&source)?;

    println!(
        "Compiled {} bytes of bytecode, {} constants, {} globals.",
        script.code.len(),
        script.constants.len(),
        script.global_count
    );

    if let Some(out_path) = output {
        let file =
            fs::File::create(out_path).with_context(|| format!("failed to create {out_path}"))?;
        let mut writer = BufWriter::new(file);
        vm::loader::save_chunk(
            &mut writer,
            &script.code,
            &script.constants,
            script.global_count,
        )?;
        writer.flush().context("failed to flush chunk")?;
        println!("Saved chunk to {out_path}");
    }
    Ok(())
}
