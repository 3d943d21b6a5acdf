// g2p-inspect: Print statistics about a binary G2P model.
//
// Usage:
//   g2p-inspect [OPTIONS] [MODEL]
//
// The model is found the same way as in g2p-phonemize: --model, then MODEL,
// then G2P_MODEL.
//
// Options:
//   -m, --model Model file
//   --symbols   Also print both symbol tables
//   --text      Print the FST in OpenFst text format instead of statistics

use std::path::PathBuf;

use clap::Parser;
use g2p_fst::text;

#[derive(Parser, Debug)]
#[command(name = "g2p-inspect", about = "Show the contents of a binary G2P model")]
struct Args {
    /// Model file (overrides MODEL and G2P_MODEL).
    #[arg(long = "model", short = 'm', value_name = "FILE")]
    model_flag: Option<PathBuf>,

    /// Model file (defaults to G2P_MODEL).
    #[arg(value_name = "MODEL")]
    model: Option<String>,

    /// Print both symbol tables.
    #[arg(long)]
    symbols: bool,

    /// Print the FST in text form.
    #[arg(long)]
    text: bool,
}

fn main() {
    g2p_cli::init_logging();
    if let Err(e) = run(Args::parse()) {
        g2p_cli::fatal(format!("{e:#}"));
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let path = g2p_cli::resolve_model_only(
        args.model_flag,
        std::env::var_os(g2p_cli::MODEL_ENV),
        args.model,
    )?;
    let model = g2p_cli::load_model(&path)?;
    let fst = model.fst_model().fst();

    if args.text {
        print!("{}", text::print_fst(model.fst_model()));
        return Ok(());
    }

    let epsilon_arcs = fst.all_arcs().iter().filter(|a| a.is_input_epsilon()).count();
    let max_fanout = fst.states().map(|s| fst.arcs(s).len()).max().unwrap_or(0);

    println!("model:            {}", path.display());
    println!("input symbols:    {}", model.fst_model().input_symbols().len());
    println!("output symbols:   {}", model.fst_model().output_symbols().len());
    println!("graphemes:        {}", model.segmenter().grapheme_count());
    println!("longest grapheme: {}", model.segmenter().longest_grapheme());
    println!("states:           {}", fst.num_states());
    println!("final states:     {}", fst.num_final_states());
    println!("start state:      {}", fst.start_state());
    println!("arcs:             {}", fst.num_arcs());
    println!("epsilon arcs:     {epsilon_arcs}");
    println!("max fan-out:      {max_fanout}");

    if args.symbols {
        println!();
        println!("# input symbols");
        print!("{}", text::print_symbols(model.fst_model().input_symbols()));
        println!();
        println!("# output symbols");
        print!("{}", text::print_symbols(model.fst_model().output_symbols()));
    }
    Ok(())
}
