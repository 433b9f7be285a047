#![forbid(unsafe_code)]

//! `ai-cookbook`: AI API recipes from the command line.
//!
//! Loads configuration, opens the embedded store and step log, then runs
//! one recipe: natural-language SQL, image generation, or transcription.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use ai_cookbook::config::GlobalConfig;
use ai_cookbook::llm::OpenAiClient;
use ai_cookbook::persistence::executor::SqliteExecutor;
use ai_cookbook::persistence::{db, schema, seed};
use ai_cookbook::recipes::{ImageRecipe, TranscriptionRecipe};
use ai_cookbook::resolver::Resolver;
use ai_cookbook::trace::{JsonlStepWriter, StepRecorder};
use ai_cookbook::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "ai-cookbook", about = "AI API recipes with step tracing", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate a request into SQL, run it, and print the result as JSON.
    Query {
        /// Natural-language request.
        request: String,
        /// Expected output column names, comma separated.
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
    },

    /// Interactively generate images from prompts read on stdin.
    Image,

    /// Transcribe an audio file.
    Transcribe {
        /// Path to the audio file.
        file: PathBuf,
        /// Run identifier to record the transcription under.
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Create the database schema.
    InitDb {
        /// Also insert the demo data set.
        #[arg(long)]
        seed: bool,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    info!(workspace = %config.workspace_root.display(), "configuration loaded");

    if let Command::InitDb { seed } = args.command {
        return init_db(&config, seed).await;
    }

    config.load_credentials().await?;
    let recorder: Arc<dyn StepRecorder> = Arc::new(JsonlStepWriter::new(config.trace_dir())?);
    let client = OpenAiClient::from_config(&config.openai);

    match args.command {
        Command::Query { request, columns } => {
            run_query(&config, client, recorder, &request, columns.as_deref()).await
        }
        Command::Image => run_image(&config, client, recorder).await,
        Command::Transcribe { file, run_id } => {
            let recipe = TranscriptionRecipe::new(client, config.transcription.clone())
                .with_recorder(recorder);
            let text = recipe.transcribe(&file, run_id).await?;
            print_json(&serde_json::json!({ "transcribedText": text }))
        }
        Command::InitDb { .. } => Ok(()),
    }
}

async fn init_db(config: &GlobalConfig, with_seed: bool) -> Result<()> {
    let pool = db::connect(&config.db_path()).await?;
    info!(path = %config.db_path().display(), "schema applied");
    if with_seed {
        seed::seed_demo_data(&pool).await?;
    }
    pool.close().await;
    Ok(())
}

async fn run_query(
    config: &GlobalConfig,
    client: OpenAiClient,
    recorder: Arc<dyn StepRecorder>,
    request: &str,
    columns: Option<&[String]>,
) -> Result<()> {
    let pool = Arc::new(db::connect(&config.db_path()).await?);
    let schema_text = schema::sql_schema(&pool, &config.resolver.schema_tables).await?;

    let resolver = Resolver::new(
        Arc::new(client),
        Arc::new(SqliteExecutor::new(Arc::clone(&pool))),
        schema_text,
    )
    .with_model_settings(config.openai.chat_model.clone(), config.resolver.temperature)
    .with_recorder(recorder);

    let outcome = resolver.resolve(request, columns).await;
    pool.close().await;
    print_json(&outcome?)
}

/// Prompt loop; any failure ends the session after closing the run.
async fn run_image(
    config: &GlobalConfig,
    client: OpenAiClient,
    recorder: Arc<dyn StepRecorder>,
) -> Result<()> {
    let recipe = ImageRecipe::new(client, config.image.size.clone(), config.images_dir())
        .with_recorder(recorder);
    let run = recipe.start_run();
    let mut generated = 0usize;

    let outcome = prompt_loop(&recipe, &run.id, &mut generated).await;

    recipe.finish_run(run, generated);
    if let Err(ref err) = outcome {
        error!(%err, "image session ended");
    }
    outcome
}

async fn prompt_loop(recipe: &ImageRecipe, run_id: &str, generated: &mut usize) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Prompt: ").await?;
        stdout.flush().await?;
        let Some(prompt) = lines.next_line().await? else {
            return Ok(());
        };
        let path = recipe.generate(&prompt, Some(run_id)).await?;
        *generated += 1;
        print_json(&serde_json::json!({ "query": prompt, "path": path.display().to_string() }))?;
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(format!("failed to render output: {err}")))?;
    println!("{text}");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
