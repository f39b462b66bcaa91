use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, info_span, Instrument, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use dyadic::models::FileTopicStats;
use dyadic::stages::build_record;
use dyadic::{
    execute_stage4, load_chunks, load_corpus, load_transcript, process_file, run_pipeline,
    PipelineConfig, RecordView, Stage4Config,
};

#[derive(Parser)]
#[command(name = "dyadic")]
#[command(author, version, about = "Caregiver/PLWD conversation metrics pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a directory of transcripts into per-file records
    Process {
        /// Directory of .txt transcripts (searched recursively)
        #[arg(short, long)]
        input: PathBuf,

        /// Chunk file with embeddings for topic clustering (JSON array)
        #[arg(long)]
        chunks: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Pipeline config (JSON); built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of topic clusters
        #[arg(long)]
        k: Option<usize>,

        /// Topics reported per file
        #[arg(long)]
        top_n: Option<usize>,

        /// Clustering seed
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the plain-text summary
        #[arg(long)]
        no_summary: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze a single transcript and print its metrics
    Analyze {
        /// Input transcript file
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the record as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            chunks,
            output,
            config,
            k,
            top_n,
            seed,
            no_summary,
            verbose,
        } => {
            setup_logging(verbose);
            let mut config = PipelineConfig::load_or_default(config.as_deref())?;
            if let Some(k) = k {
                config.topics.k = k;
            }
            if let Some(top_n) = top_n {
                config.topics.top_n = top_n;
            }
            if let Some(seed) = seed {
                config.topics.seed = seed;
            }
            process_corpus(input, chunks, output, config, no_summary).await
        }
        Commands::Analyze {
            input,
            config,
            json,
            verbose,
        } => {
            setup_logging(verbose);
            let config = PipelineConfig::load_or_default(config.as_deref())?;
            analyze_transcript(input, config, json)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn process_corpus(
    input: PathBuf,
    chunks: Option<PathBuf>,
    output: PathBuf,
    config: PipelineConfig,
    no_summary: bool,
) -> Result<()> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);

    async move {
        let context = Arc::new(config.compile().context("Invalid pipeline config")?);

        info!("Loading transcripts from {:?}", input);
        let corpus = load_corpus(&input)?;

        let chunks = match &chunks {
            Some(path) => load_chunks(path)?,
            None => {
                info!("No chunk file given, skipping topic clustering");
                Vec::new()
            }
        };

        let result = run_pipeline(corpus, chunks, context).await;

        let stage4_config = Stage4Config {
            generate_summary: !no_summary,
        };
        let rendered = execute_stage4(&result, &result.manifest(run_id), &output, &stage4_config)?;

        info!("Records written to {:?}", rendered.records_path);
        if let Some(summary_path) = rendered.summary_path {
            info!("Summary written to {:?}", summary_path);
        }
        info!(
            "Complete: {} of {} files, {} participants, {} topics",
            result.records.len(),
            result.files_seen,
            result.participants.len(),
            result.catalog.len()
        );

        Ok(())
    }
    .instrument(span)
    .await
}

fn analyze_transcript(input: PathBuf, config: PipelineConfig, json: bool) -> Result<()> {
    info!("Analyzing transcript from {:?}", input);
    let context = config.compile().context("Invalid pipeline config")?;
    let file = load_transcript(&input)?;
    let analysis =
        process_file(&file, &context).with_context(|| format!("Failed to analyze {:?}", input))?;
    let record = build_record(&analysis, &FileTopicStats::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&RecordView::new(&record))?);
        return Ok(());
    }

    let rates = record.rates();
    println!("Transcript Analysis");
    println!("==================");
    println!("File: {}", record.filename);
    println!("Participant: {} ({})", record.patient_id, record.condition);
    println!("Session: {} / {}", record.week_label, record.session_type);
    if !record.metadata_fallbacks.is_empty() {
        println!("Fallback fields: {}", record.metadata_fallbacks.join(", "));
    }
    println!();

    println!("Speaker Statistics");
    println!("------------------");
    println!(
        "Caregiver: {} turns, {} words, {} questions, {} disfluencies, {} repeats, {} cues",
        record.caregiver_turns,
        record.caregiver_words,
        record.caregiver_questions,
        record.caregiver_disfluencies,
        record.caregiver_repeats,
        record.caregiver_nonverbal
    );
    println!(
        "PLWD: {} turns, {} words, {} questions, {} disfluencies, {} repeats, {} cues",
        record.plwd_turns,
        record.plwd_words,
        record.plwd_questions,
        record.plwd_disfluencies,
        record.plwd_repeats,
        record.plwd_nonverbal
    );
    if record.other_turns > 0 {
        println!(
            "Other: {} turns, {} words, {} questions, {} disfluencies, {} repeats, {} cues",
            record.other_turns,
            record.other_words,
            record.other_questions,
            record.other_disfluencies,
            record.other_repeats,
            record.other_nonverbal
        );
    }
    println!("Overlapping speech marks: {}", record.overlapping_speech);
    println!();

    println!("Rates");
    println!("-----");
    println!("Words per turn: {:.2}", rates.words_per_turn);
    println!("Questions per 100 words: {:.2}", rates.question_rate_per_100_words);
    println!("Disfluencies per 100 words: {:.2}", rates.disfluency_rate);
    println!("Repeats per 100 words: {:.2}", rates.repeat_rate);
    println!("Nonverbal cues per 100 words: {:.2}", rates.nonverbal_rate);
    println!("Answer ratio: {:.2}", rates.answer_ratio);
    println!("Dominance ratio: {:.2}", rates.dominance_ratio);
    println!();

    println!("Lexicons");
    println!("--------");
    println!("Pain mentions: {}", record.pain_mentions);
    println!("Comfort mentions: {}", record.comfort_mentions);

    if !record.cue_counts.is_empty() {
        println!();
        println!("Nonverbal Cues");
        println!("--------------");
        for (label, count) in &record.cue_counts {
            println!("{}: {}", label, count);
        }
    }

    Ok(())
}
