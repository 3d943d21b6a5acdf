// g2p-compile: Compile an OpenFst text model into the binary model format.
//
// Usage:
//   g2p-compile --isymbols INPUT.syms --osymbols OUTPUT.syms MODEL.fst.txt OUT.g2p

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use g2p_fst::text;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "g2p-compile",
    about = "Compile a text-format FST and its symbol tables into a binary G2P model"
)]
struct Args {
    /// Input (grapheme) symbol table: `symbol label` per line.
    #[arg(long, value_name = "FILE")]
    isymbols: PathBuf,

    /// Output (phoneme) symbol table: `symbol label` per line.
    #[arg(long, value_name = "FILE")]
    osymbols: PathBuf,

    /// FST in OpenFst text format.
    fst: PathBuf,

    /// Binary model to write.
    output: PathBuf,
}

fn main() {
    g2p_cli::init_logging();
    if let Err(e) = run(Args::parse()) {
        g2p_cli::fatal(format!("{e:#}"));
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let model = text::compile_files(&args.fst, &args.isymbols, &args.osymbols)
        .with_context(|| format!("failed to compile {}", args.fst.display()))?;
    model
        .write(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let fst = model.fst();
    info!(
        output = %args.output.display(),
        states = fst.num_states(),
        arcs = fst.num_arcs(),
        "compiled model"
    );
    println!(
        "{}: {} states, {} arcs, {} input symbols, {} output symbols",
        args.output.display(),
        fst.num_states(),
        fst.num_arcs(),
        model.input_symbols().len(),
        model.output_symbols().len()
    );
    Ok(())
}
