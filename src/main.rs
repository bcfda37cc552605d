use clap::{Parser, Subcommand};
use colored::*;
use lora_compare::{
    logger::{self, LogLevel, LoggerConfig},
    output, CompareConfig, CompareError, ComparisonSession, FailureNotifier,
    ImageBackend, ImageClient, ParamUpdate, Sampler, WireFormat, CFG_SCALE_RANGE,
    LORA_SCALE_RANGE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lora-compare")]
#[command(version)]
#[command(about = "Compare a base image model against its LoRA-trained version", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Backend root url (overrides COMPARE_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Trained payload field naming: ui or diffusers (overrides COMPARE_WIRE_FORMAT)
    #[arg(long, global = true)]
    wire_format: Option<WireFormat>,

    /// Per-request timeout in seconds; no timeout when unset
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log JSON lines instead of colored text
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also append log lines to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the same prompt with the base and the trained model
    Compare {
        /// Text prompt sent to both models
        prompt: String,

        /// Base model endpoint path (overrides COMPARE_BASE_PATH)
        #[arg(long)]
        base_path: Option<String>,

        /// Trained model endpoint path (overrides COMPARE_TRAINED_PATH)
        #[arg(long)]
        trained_path: Option<String>,

        /// Attributes to steer away from
        #[arg(short, long)]
        negative_prompt: Option<String>,

        /// Inference steps (10-80)
        #[arg(long, value_parser = clap::value_parser!(u32).range(10..=80))]
        steps: Option<u32>,

        /// CFG / guidance scale (1-20)
        #[arg(long, value_parser = parse_cfg_scale)]
        cfg_scale: Option<f32>,

        /// Seed, -1 for random
        #[arg(long, allow_negative_numbers = true)]
        seed: Option<i64>,

        /// DPM++ 2M, Euler, Euler a or DDIM
        #[arg(long, value_parser = parse_sampler)]
        sampler: Option<Sampler>,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// LoRA strength (0-2)
        #[arg(short, long, value_parser = parse_lora_scale)]
        lora_scale: Option<f32>,

        /// Extra parameter as key=value, may be repeated
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_update)]
        set: Vec<ParamUpdate>,

        /// Directory the two images are written to
        #[arg(short, long, default_value = "comparison")]
        out_dir: PathBuf,
    },

    /// Check that the backend answers its health route
    Health,
}

/// Prints the failure notice once per failed comparison.
struct CliNotifier;

impl FailureNotifier for CliNotifier {
    fn notify_failure(&self, message: &str, error: &CompareError) {
        eprintln!("{} {}", message.red().bold(), format!("({})", error).bright_black());
    }
}

fn parse_cfg_scale(s: &str) -> Result<f32, String> {
    parse_in_range(s, CFG_SCALE_RANGE)
}

fn parse_lora_scale(s: &str) -> Result<f32, String> {
    parse_in_range(s, LORA_SCALE_RANGE)
}

fn parse_in_range(s: &str, range: std::ops::RangeInclusive<f32>) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} is outside {}-{}",
            value,
            range.start(),
            range.end()
        ))
    }
}

fn parse_sampler(s: &str) -> Result<Sampler, String> {
    s.parse().map_err(|e: CompareError| e.to_string())
}

fn parse_update(s: &str) -> Result<ParamUpdate, String> {
    s.parse().map_err(|e: CompareError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_loaded = dotenv::dotenv().is_ok();

    let cli = Cli::parse();

    let preset = if cli.json_logs {
        LoggerConfig::production()
    } else if cli.verbose > 0 {
        LoggerConfig::development()
    } else {
        LoggerConfig::default()
    };
    let mut logger_config = preset.with_level(LogLevel::from_verbosity(cli.verbose));
    if let Some(path) = &cli.log_file {
        logger_config = logger_config.with_file_output(path);
    }
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    if env_loaded {
        log::debug!("✅ .env file loaded");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> lora_compare::Result<ExitCode> {
    let mut config = CompareConfig::from_env()?;
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(format) = cli.wire_format {
        config = config.with_wire_format(format);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    match cli.command {
        Commands::Health => {
            let client = ImageClient::new(config)?;
            if client.health_check().await? {
                println!("{} {}", "✓".green().bold(), client.config().health_url());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{} {}", "✗".red().bold(), client.config().health_url());
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Compare {
            prompt,
            base_path,
            trained_path,
            negative_prompt,
            steps,
            cfg_scale,
            seed,
            sampler,
            width,
            height,
            lora_scale,
            set,
            out_dir,
        } => {
            if let Some(path) = base_path {
                config.base_path = path;
            }
            if let Some(path) = trained_path {
                config.trained_path = path;
            }
            logger::log_config_info(&config);

            let client = ImageClient::new(config.clone())?;
            let session =
                ComparisonSession::new(client, config.wire_format).with_notifier(CliNotifier);

            let flags = [
                negative_prompt.map(ParamUpdate::NegativePrompt),
                steps.map(ParamUpdate::Steps),
                cfg_scale.map(ParamUpdate::CfgScale),
                seed.map(ParamUpdate::Seed),
                sampler.map(ParamUpdate::Sampler),
                width.map(ParamUpdate::Width),
                height.map(ParamUpdate::Height),
                lora_scale.map(ParamUpdate::LoraScale),
            ];
            for update in flags.into_iter().flatten().chain(set) {
                session.update_param(update);
            }
            log::debug!("Trained model parameters: {:?}", session.params());

            // Busy may already be current by the time the task is polled.
            let mut state = session.subscribe();
            let indicator = tokio::spawn(async move {
                loop {
                    if state.borrow_and_update().is_busy() {
                        eprintln!("{}", "Generating…".yellow().bold());
                    }
                    if state.changed().await.is_err() {
                        break;
                    }
                }
            });

            let result = session.submit(&prompt).await;
            indicator.abort();

            let pair = match result {
                Ok(Some(pair)) => pair,
                Ok(None) => {
                    eprintln!("{}", "Prompt is empty, nothing to generate".yellow());
                    return Ok(ExitCode::SUCCESS);
                }
                // The notifier has already reported it.
                Err(_) => return Ok(ExitCode::FAILURE),
            };

            let saved = output::save_pair(session.backend(), &pair, &out_dir).await?;

            println!();
            println!("{}", "Comparison ready, open side by side:".green().bold());
            println!("  Base model:    {}", saved.base_path.display());
            println!("  Trained model: {}", saved.trained_path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
