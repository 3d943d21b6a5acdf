// g2p-phonemize: Convert words to phoneme sequences.
//
// Decodes the words given on the command line, or one word per line from
// stdin when none are given. Prints one line per pronunciation:
//   word<TAB>phonemes<TAB>score
// or, with --json, one JSON object per word:
//   {"word":"cat","results":[{"phonemes":["K","AE","T"],"score":1.1}]}
//
// Usage:
//   g2p-phonemize [OPTIONS] <MODEL> [WORD...]
//   G2P_MODEL=model.g2p g2p-phonemize [OPTIONS] [WORD...]
//
// With G2P_MODEL set, the first argument is still the model if it names an
// existing file.
//
// Exit code 0 when every word was pronounced, 1 otherwise.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use g2p_cli::{DecodeArgs, WordResults};
use g2p_core::DecodeOptions;
use g2p_engine::Model;

#[derive(Parser, Debug)]
#[command(
    name = "g2p-phonemize",
    about = "Grapheme-to-phoneme conversion with a weighted FST model",
    long_about = "Convert words to phoneme sequences.\n\
                  The model is --model if given, else the first positional argument. \
                  When G2P_MODEL is set, that argument is only the model if it is an \
                  existing file. Words are read from stdin when none are given."
)]
struct Args {
    /// Model file (overrides G2P_MODEL).
    #[arg(long, short = 'm')]
    model: Option<PathBuf>,

    #[command(flatten)]
    decode: DecodeArgs,

    /// Print one JSON object per word.
    #[arg(long)]
    json: bool,

    /// [MODEL] followed by the words to convert.
    #[arg(value_name = "ARGS")]
    args: Vec<String>,
}

fn main() {
    g2p_cli::init_logging();
    match run(Args::parse()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => g2p_cli::fatal(format!("{e:#}")),
    }
}

/// Returns whether every word produced at least one pronunciation.
fn run(args: Args) -> anyhow::Result<bool> {
    let (model_path, words) = g2p_cli::resolve_model_from_env(args.model, args.args)?;
    let options = args.decode.resolve()?;
    let model = g2p_cli::load_model(&model_path)?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut all_ok = true;

    if words.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("error reading stdin")?;
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            all_ok &= decode(&model, word, &options, args.json, &mut out)?;
        }
    } else {
        for word in &words {
            all_ok &= decode(&model, word, &options, args.json, &mut out)?;
        }
    }

    out.flush()?;
    Ok(all_ok)
}

/// Decode and print one word. Decode failures are reported on stderr and
/// returned as `false`; only output errors abort.
fn decode(
    model: &Model,
    word: &str,
    options: &DecodeOptions,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let results = match model.phonemize_word(word, options) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("error: {word}: {e}");
            return Ok(false);
        }
    };

    if json {
        let record = WordResults {
            word,
            results: &results,
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
    } else {
        for result in &results {
            writeln!(out, "{}", g2p_cli::format_result(word, result))?;
        }
    }

    if results.is_empty() {
        eprintln!("error: {word}: no pronunciation found");
        return Ok(false);
    }
    Ok(true)
}
