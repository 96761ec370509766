//! harmonyhub - exercise generation server and CLI
//!
//! Subcommands:
//! - `harmonyhub serve` - Run the HTTP API
//! - `harmonyhub generate --out <dir>` - Write one exercise to disk
//! - `harmonyhub convert <in.musicxml> <out.mid>` - MusicXML to MIDI
//! - `harmonyhub samples <dir>` - Write the bundled scale samples
//! - `harmonyhub validate-token` - Check an inference token
//! - `harmonyhub config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use harmonyhub::assistant::validate_token;
use harmonyhub::config::Config;
use harmonyhub::exercise::ExerciseParameters;
use harmonyhub::inference::{ApiToken, InferenceClient};
use harmonyhub::midi::{musicxml_to_midi, samples, summarize, MidiExportOptions};
use harmonyhub::server::{self, AppState};
use harmonyhub::theory::TimeSignature;

#[derive(Parser)]
#[command(name = "harmonyhub")]
#[command(about = "Practice exercise generation and AI music assistant")]
#[command(version)]
struct Cli {
    /// Config file, layered over the discovered ones
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate one procedural exercise into a directory
    Generate {
        #[arg(long)]
        instrument: Option<String>,

        #[arg(long)]
        key: Option<String>,

        /// beginner, intermediate or advanced
        #[arg(long)]
        level: Option<String>,

        /// scale, arpeggio, interval or rhythm
        #[arg(long)]
        focus_type: Option<String>,

        #[arg(long)]
        focus_value: Option<String>,

        #[arg(long)]
        bars: Option<u32>,

        /// Time signature such as 3/4
        #[arg(long)]
        meter: Option<String>,

        #[arg(long)]
        tempo: Option<u16>,

        #[arg(long)]
        seed: Option<u64>,

        /// Also store the exercise in the data directory
        #[arg(long)]
        save: bool,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Convert a MusicXML file to MIDI
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Time signature written to the MIDI file (defaults to the document's, then 4/4)
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Write the bundled instrument scale samples
    Samples { dir: PathBuf },

    /// Check an inference token against the model
    ValidateToken {
        /// Token to check (defaults to inference.default_token)
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, sources) =
        Config::load_with_sources(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging.level);

    for file in &sources.files {
        log::debug!("Loaded config layer {}", file.display());
    }
    for key in &sources.env_overrides {
        log::debug!("Config override from environment: {}", key);
    }

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = AppState::open(config)?;
            server::run(state, &bind).await
        }
        Commands::Generate {
            instrument,
            key,
            level,
            focus_type,
            focus_value,
            bars,
            meter,
            tempo,
            seed,
            save,
            out,
        } => {
            let (numerator, denominator) = match meter.as_deref() {
                Some(text) => {
                    let time = TimeSignature::parse(text)?;
                    (Some(time.numerator.to_string()), Some(time.denominator.to_string()))
                }
                None => (None, None),
            };
            let params = ExerciseParameters {
                instrument,
                level,
                key,
                meter_numerator: numerator,
                meter_denominator: denominator,
                focus_type,
                focus_value,
                bars: bars.map(|b| b.to_string()),
                tempo: tempo.map(|t| t.to_string()),
                seed,
            };
            generate(config, &params, save, &out)
        }
        Commands::Convert { input, output, time } => convert(&config, &input, &output, time.as_deref()),
        Commands::Samples { dir } => {
            let written = samples::write_samples(&dir)?;
            println!("Wrote {} sample files to {}", written.len(), dir.display());
            Ok(())
        }
        Commands::ValidateToken { token } => {
            let token = token
                .or_else(|| config.inference.default_token.clone())
                .as_deref()
                .and_then(ApiToken::new)
                .context("No token given and inference.default_token is not set")?;
            let client = InferenceClient::new(&config.inference)?;
            let result = validate_token(&client, &token, config.inference.temperature).await;
            println!("{}", result.message);
            if !result.valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn generate(config: Config, params: &ExerciseParameters, save: bool, out: &Path) -> Result<()> {
    let state = AppState::open(config)?;
    let bundle = state.pipeline.build(params)?;
    let id = bundle.exercise.exercise_id.clone();

    let written = bundle.write_to_dir(out, &id)?;
    for path in &written {
        println!("  {}", path.display());
    }

    if save {
        state.pipeline.persist(bundle)?;
        println!("Stored exercise {}", id);
    }
    Ok(())
}

fn convert(config: &Config, input: &Path, output: &Path, time: Option<&str>) -> Result<()> {
    let xml = std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let time = time.map(TimeSignature::parse).transpose()?;
    let options = MidiExportOptions {
        ppq: config.midi.ppq,
        tempo_bpm: config.midi.tempo_bpm as f64,
        velocity: config.midi.velocity,
        ..MidiExportOptions::default()
    };

    let conversion = musicxml_to_midi(&xml, time, &options)?;
    std::fs::write(output, &conversion.bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    let summary = summarize(&conversion.bytes)?;
    log::debug!("MIDI summary: {:?}", summary);
    println!(
        "Wrote {} ({} notes, {} dropped, {}, {} ticks at {} ppq)",
        output.display(),
        conversion.notes,
        conversion.dropped,
        conversion.time,
        summary.length_ticks,
        summary.ppq
    );
    Ok(())
}
