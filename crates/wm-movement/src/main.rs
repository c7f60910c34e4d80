use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use wm_common::config::{
    DEFAULT_DATA_DIR, DEFAULT_EMBEDDINGS_OUTPUT, DEFAULT_FILE_SUFFIX, DEFAULT_MODEL_PATH,
    DEFAULT_MOVEMENT_OUTPUT,
};
use wm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use wm_common::pipeline::run_from_config;
use wm_common::{HeaderPolicy, MovementConfig, VectorFormat, WordLayout};

const APP_NAME: &str = "wm-movement";

#[derive(Debug, Parser)]
#[command(
    name = "wm-movement",
    version,
    about = "Write word-embedding movement tables for participant response files"
)]
struct Cli {
    /// Directory with one response file per participant
    #[arg(long, env = "WM_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Only files whose name ends with this suffix are read
    #[arg(long, env = "WM_FILE_SUFFIX", default_value = DEFAULT_FILE_SUFFIX)]
    file_suffix: String,

    /// Where the words sit inside a participant file
    #[arg(long, env = "WM_WORD_LAYOUT", default_value = "first-row", value_enum)]
    word_layout: WordLayout,

    /// Pretrained word2vec vectors
    #[arg(long, env = "WM_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model_path: PathBuf,

    #[arg(long, env = "WM_MODEL_FORMAT", default_value = "binary", value_enum)]
    model_format: VectorFormat,

    /// Read at most this many vectors from the model file
    #[arg(long, env = "WM_MODEL_LIMIT")]
    model_limit: Option<usize>,

    #[arg(long, env = "WM_MOVEMENT_OUTPUT", default_value = DEFAULT_MOVEMENT_OUTPUT)]
    movement_output: PathBuf,

    #[arg(long, env = "WM_EMBEDDINGS_OUTPUT", default_value = DEFAULT_EMBEDDINGS_OUTPUT)]
    embeddings_output: PathBuf,

    /// Do not write the per-word embeddings table
    #[arg(long, env = "WM_SKIP_ALL_EMBEDDINGS")]
    skip_all_embeddings: bool,

    /// trust: append blindly | verify: fail if an existing table's header differs
    #[arg(long, env = "WM_HEADER_POLICY", default_value = "trust", value_enum)]
    header_policy: HeaderPolicy,

    /// Verbosity (-v debug, -vv trace); otherwise RUST_LOG, default info
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> MovementConfig {
        MovementConfig {
            data_dir: self.data_dir,
            file_suffix: self.file_suffix,
            word_layout: self.word_layout,
            model_path: self.model_path,
            model_format: self.model_format,
            model_limit: self.model_limit,
            movement_output: self.movement_output,
            embeddings_output: (!self.skip_all_embeddings).then_some(self.embeddings_output),
            header_policy: self.header_policy,
        }
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    init_tracing_subscriber(APP_NAME, cli.verbose);
    install_tracing_panic_hook(APP_NAME);

    let config = cli.into_config();
    info!(
        model = %config.model_path.display(),
        movement_output = %config.movement_output.display(),
        "starting movement run"
    );

    match run_from_config(&config) {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(err) => error!(error = %err, "failed to serialize run summary"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "movement run failed");
            eprintln!("{APP_NAME}: {err}");
            ExitCode::FAILURE
        }
    }
}
