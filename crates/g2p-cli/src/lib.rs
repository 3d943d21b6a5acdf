// g2p-cli: shared utilities for the command-line tools.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use g2p_core::{DecodeOptions, PhonemizationResult};
use serde::Serialize;

/// Environment variable naming the default model file.
pub const MODEL_ENV: &str = "G2P_MODEL";

/// Install the stderr log subscriber. `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Pick the model path and the remaining positional arguments.
///
/// Order: the explicit `--model` value, then the first positional argument,
/// then `env_model` (the `G2P_MODEL` value). While `env_model` is set, the
/// first positional only counts as the model if it names an existing file, so
/// `tool WORD...` decodes every word and `tool MODEL WORD...` still works.
pub fn resolve_model(
    flag: Option<PathBuf>,
    env_model: Option<OsString>,
    mut positionals: Vec<String>,
) -> anyhow::Result<(PathBuf, Vec<String>)> {
    if let Some(path) = flag {
        return Ok((path, positionals));
    }
    let env_model = env_model.filter(|p| !p.is_empty());
    let positional_is_model = match positionals.first() {
        None => false,
        Some(first) => env_model.is_none() || Path::new(first).is_file(),
    };
    if positional_is_model {
        let model = PathBuf::from(positionals.remove(0));
        return Ok((model, positionals));
    }
    match env_model {
        Some(path) => Ok((PathBuf::from(path), positionals)),
        None => anyhow::bail!("no model given: pass MODEL or set {MODEL_ENV}"),
    }
}

/// [`resolve_model`] with the process environment.
pub fn resolve_model_from_env(
    flag: Option<PathBuf>,
    positionals: Vec<String>,
) -> anyhow::Result<(PathBuf, Vec<String>)> {
    resolve_model(flag, std::env::var_os(MODEL_ENV), positionals)
}

/// Model path for tools that take no words, under the same rules as
/// [`resolve_model`]. A positional that is not the model is an error.
pub fn resolve_model_only(
    flag: Option<PathBuf>,
    env_model: Option<OsString>,
    positional: Option<String>,
) -> anyhow::Result<PathBuf> {
    let (model, rest) = resolve_model(flag, env_model, positional.into_iter().collect())?;
    if let Some(extra) = rest.first() {
        anyhow::bail!("model file not found: {extra}");
    }
    Ok(model)
}

/// Load and validate a model, naming the path on failure.
pub fn load_model(path: &Path) -> anyhow::Result<g2p_engine::Model> {
    g2p_engine::load_model(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Read decode options from a JSON file. Missing keys take their defaults.
pub fn load_options(path: &Path) -> anyhow::Result<DecodeOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid options in {}", path.display()))
}

/// Decode flags shared by tools that run the decoder. Each set flag overrides
/// the value from `--options`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DecodeArgs {
    /// JSON file with decode options.
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Number of pronunciations per word.
    #[arg(long, short = 'n')]
    pub nbest: Option<usize>,

    /// Hypotheses expanded per input position.
    #[arg(long)]
    pub beam: Option<usize>,

    /// Longest run of epsilon-input arcs on a path.
    #[arg(long)]
    pub max_epsilon_depth: Option<usize>,

    /// Longest grapheme cluster tried, in characters.
    #[arg(long)]
    pub max_grapheme_len: Option<usize>,

    /// Per-word decode deadline in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl DecodeArgs {
    /// Options file (if any) with the command-line overrides applied, validated.
    pub fn resolve(&self) -> anyhow::Result<DecodeOptions> {
        let base = match &self.options {
            Some(path) => load_options(path)?,
            None => DecodeOptions::default(),
        };
        let options = self.apply(base);
        options.validate()?;
        Ok(options)
    }

    pub fn apply(&self, mut options: DecodeOptions) -> DecodeOptions {
        if let Some(n) = self.nbest {
            options.n_best = n;
        }
        if let Some(beam) = self.beam {
            options.beam_width = beam;
        }
        if let Some(depth) = self.max_epsilon_depth {
            options.max_epsilon_depth = depth;
        }
        if let Some(len) = self.max_grapheme_len {
            options.max_grapheme_len = len;
        }
        if self.timeout_ms.is_some() {
            options.timeout_ms = self.timeout_ms;
        }
        options
    }
}

/// One `word<TAB>phonemes<TAB>score` line.
pub fn format_result(word: &str, result: &PhonemizationResult) -> String {
    format!("{word}\t{result}")
}

/// JSON record for one decoded word.
#[derive(Debug, Serialize)]
pub struct WordResults<'a> {
    pub word: &'a str,
    pub results: &'a [PhonemizationResult],
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: impl Display) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn model_flag_wins() {
        let (model, rest) = resolve_model(
            Some(PathBuf::from("flag.g2p")),
            Some(OsString::from("env.g2p")),
            words(&["hello"]),
        )
        .unwrap();
        assert_eq!(model, PathBuf::from("flag.g2p"));
        assert_eq!(rest, words(&["hello"]));
    }

    #[test]
    fn env_model_when_positionals_are_words() {
        let (model, rest) =
            resolve_model(None, Some(OsString::from("env.g2p")), words(&["hello", "world"])).unwrap();
        assert_eq!(model, PathBuf::from("env.g2p"));
        assert_eq!(rest, words(&["hello", "world"]));

        let (model, rest) = resolve_model(None, Some(OsString::from("env.g2p")), Vec::new()).unwrap();
        assert_eq!(model, PathBuf::from("env.g2p"));
        assert!(rest.is_empty());
    }

    #[test]
    fn existing_file_positional_beats_env() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let (model, rest) =
            resolve_model(None, Some(OsString::from("env.g2p")), vec![path.clone(), "hello".into()])
                .unwrap();
        assert_eq!(model, PathBuf::from(path));
        assert_eq!(rest, words(&["hello"]));
    }

    #[test]
    fn model_only_tools_follow_the_same_order() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let env = || Some(OsString::from("env.g2p"));

        let model = resolve_model_only(None, env(), Some(path.clone())).unwrap();
        assert_eq!(model, PathBuf::from(&path));
        assert_eq!(resolve_model_only(None, env(), None).unwrap(), PathBuf::from("env.g2p"));
        assert_eq!(
            resolve_model_only(Some(PathBuf::from("flag.g2p")), env(), None).unwrap(),
            PathBuf::from("flag.g2p")
        );
        // Without G2P_MODEL the positional is taken as given.
        assert_eq!(
            resolve_model_only(None, None, Some("m.g2p".into())).unwrap(),
            PathBuf::from("m.g2p")
        );

        let err = resolve_model_only(None, env(), Some("missing.g2p".into())).unwrap_err();
        assert!(err.to_string().contains("missing.g2p"));
    }

    #[test]
    fn first_positional_is_model() {
        let (model, rest) = resolve_model(None, None, words(&["m.g2p", "hello"])).unwrap();
        assert_eq!(model, PathBuf::from("m.g2p"));
        assert_eq!(rest, words(&["hello"]));

        // Empty env value is ignored.
        let (model, _) = resolve_model(None, Some(OsString::new()), words(&["m.g2p"])).unwrap();
        assert_eq!(model, PathBuf::from("m.g2p"));
    }

    #[test]
    fn no_model_is_an_error() {
        let err = resolve_model(None, None, Vec::new()).unwrap_err();
        assert!(err.to_string().contains(MODEL_ENV));
    }

    #[test]
    fn flags_override_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opts.json");
        std::fs::write(&path, r#"{"n_best": 4, "beam_width": 20}"#).unwrap();

        let args = DecodeArgs {
            options: Some(path),
            beam: Some(7),
            timeout_ms: Some(250),
            ..DecodeArgs::default()
        };
        let options = args.resolve().unwrap();
        assert_eq!(options.n_best, 4);
        assert_eq!(options.beam_width, 7);
        assert_eq!(options.timeout_ms, Some(250));
        assert_eq!(options.max_grapheme_len, g2p_core::options::DEFAULT_MAX_GRAPHEME_LEN);
    }

    #[test]
    fn invalid_options_rejected() {
        let args = DecodeArgs {
            nbest: Some(0),
            ..DecodeArgs::default()
        };
        assert!(args.resolve().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"nbest": 2}"#).unwrap();
        let err = load_options(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }

    #[test]
    fn result_line() {
        let r = PhonemizationResult::new(vec!["HH".into(), "AH".into()], 1.5);
        assert_eq!(format_result("ha", &r), "ha\tHH AH\t1.5");
    }

    #[test]
    fn json_record() {
        let results = vec![PhonemizationResult::new(vec!["AH".into()], 0.25)];
        let record = WordResults {
            word: "a",
            results: &results,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"word":"a","results":[{"phonemes":["AH"],"score":0.25}]}"#);
    }
}
