use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{bail, Context, Result};

use zemax_to_cad::{filter, MultiConfigSystem};

/// Thin driver: load each input export as one configuration (numbered 1..N)
/// and write every surface's pose as CAD variable lines. Transforms and
/// filtering are library concerns; see the crate docs.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: zemax-to-cad <output.txt> <input.txt>...");
    }
    let output = &args[0];
    let inputs = &args[1..];

    let system = MultiConfigSystem::load_from_multiple_configs(inputs, None)?;

    let file = File::create(output).with_context(|| format!("creating {output}"))?;
    let mut out = BufWriter::new(file);
    system.file_write(&mut out, filter::include_all, filter::all_components)?;
    out.flush().with_context(|| format!("flushing {output}"))?;

    println!(
        "wrote {} configuration(s) to {output}",
        system.configs.len()
    );
    Ok(())
}
