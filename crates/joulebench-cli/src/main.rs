use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use joulebench_benchmark::{
    ArtifactHandle, BenchmarkEvent, BenchmarkRunner, Comparison, ComparisonDataset,
    CumulativeMeter, EnergyMeter, PowercapTracker, QuerySource, ResultWriter, RunConfig,
    TraceMeter, TraceSampler,
};
use joulebench_core::{BenchmarkResult, EnergyBackend, JouleBenchConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "joulebench")]
#[command(about = "JouleBench - LLM inference energy benchmarking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark a model, measuring energy with the cumulative tracker
    Cumulative(RunArgs),

    /// Benchmark a model, measuring energy with the sample-trace meter
    Trace(RunArgs),

    /// Compare per-model energy totals of both backends in a chart
    Compare(CompareArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Experiment label
    #[arg(long)]
    experiment: Option<String>,

    /// Model ID to benchmark (defaults depend on the backend)
    #[arg(long)]
    model: Option<String>,

    /// Temperature for generation
    #[arg(long)]
    temperature: Option<f32>,

    /// Label the run as CPU-only (1) or GPU (0)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=1))]
    nogpu: u8,

    /// Time budget in seconds for the measured queries, 0 processes the whole corpus
    #[arg(long)]
    seconds: Option<u64>,

    /// Shuffle the corpus before running
    #[arg(long)]
    randomize: bool,

    /// Conversation corpus (JSON lines)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Directory result files are written to
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Ollama host URL
    #[arg(long)]
    ollama_host: Option<String>,

    /// Powercap sysfs root used to find RAPL counters
    #[arg(long, default_value = "/sys/class/powercap")]
    powercap_root: PathBuf,
}

#[derive(Args)]
struct CompareArgs {
    /// Results of the cumulative backend
    #[arg(long)]
    cumulative_dir: Option<PathBuf>,

    /// Results of the sample-trace backend
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Chart output file
    #[arg(short, long, default_value = "comparison.html")]
    output: PathBuf,

    /// Open the chart in the default browser
    #[arg(long)]
    show: bool,

    /// Memory modules assumed for the idle-memory correction
    #[arg(long)]
    ram_sticks: Option<u32>,

    /// Idle draw per memory module in watts
    #[arg(long)]
    ram_watts: Option<f64>,

    /// Run length in seconds the correction is computed over
    #[arg(long)]
    run_secs: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = JouleBenchConfig::from_env()?;

    match cli.command {
        Commands::Cumulative(args) => cmd_run(EnergyBackend::Cumulative, args, &config).await?,
        Commands::Trace(args) => cmd_run(EnergyBackend::SampleTrace, args, &config).await?,
        Commands::Compare(args) => cmd_compare(args, &config)?,
    }

    Ok(())
}

fn build_meter(
    backend: EnergyBackend,
    args: &RunArgs,
    config: &JouleBenchConfig,
) -> Box<dyn EnergyMeter> {
    match backend {
        EnergyBackend::Cumulative => {
            let tracker = PowercapTracker::detect(&args.powercap_root, config.energy.ram_watts());
            let artifact = ArtifactHandle::new(config.energy.artifact_path.clone());
            Box::new(CumulativeMeter::new(tracker, artifact))
        }
        EnergyBackend::SampleTrace => {
            let sampler = TraceSampler::detect(&args.powercap_root);
            if sampler.is_empty() {
                tracing::warn!("No energy domains found; the trace will report zero energy");
            }
            let units = sampler.units();
            Box::new(TraceMeter::new(sampler, units))
        }
    }
}

async fn cmd_run(backend: EnergyBackend, args: RunArgs, config: &JouleBenchConfig) -> Result<()> {
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.defaults.model_for(backend).to_string());
    let temperature = args.temperature.unwrap_or(config.defaults.temperature);
    let host = args
        .ollama_host
        .clone()
        .unwrap_or_else(|| config.ollama.host.clone());
    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| config.dataset.path.clone());
    let results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| config.results.dir_for(backend).clone());
    let device = if args.nogpu == 1 { "CPU" } else { "GPU" };

    if let Some(experiment) = &args.experiment {
        tracing::info!("Experiment: {}", experiment);
    }

    let source = QuerySource::new(dataset);
    let prompts = source.load(args.randomize)?;

    let run_config = RunConfig {
        model: model.clone(),
        temperature,
        budget: args.seconds.map(Duration::from_secs),
        warmup_prompt: config.defaults.warmup_prompt.clone(),
    };

    let mut meter = build_meter(backend, &args, config);
    let runner = BenchmarkRunner::new(&host);

    let run = runner
        .run(&run_config, &prompts, meter.as_mut(), |event| match event {
            BenchmarkEvent::Pulling { model } => println!("Pulling {}", model),
            BenchmarkEvent::WarmedUp { model } => tracing::info!("{} loaded", model),
            BenchmarkEvent::MeasurementStarted { model, .. } => print_banner(
                &format!(
                    "STARTING ENERGY PROFILING FOR   {}   temperature {} on   {}",
                    model.to_uppercase(),
                    temperature,
                    device
                ),
                true,
            ),
            BenchmarkEvent::Progress {
                processed,
                remaining_secs,
            } => {
                if let Err(e) = write_progress(&mut io::stdout(), processed, remaining_secs) {
                    tracing::debug!("Failed to write progress line: {}", e);
                }
            }
            BenchmarkEvent::MeasurementStopped { .. } => {
                println!();
                print_banner(
                    &format!(
                        "STOPPING ENERGY PROFILING FOR   {}  temperature {} on   {}",
                        model.to_uppercase(),
                        temperature,
                        device
                    ),
                    false,
                );
            }
        })
        .await?;

    let n_samples = run.n_samples();
    let result = run.into_result()?;
    let path = ResultWriter::new(results_dir).write(&result)?;

    print_result(&result);
    println!("n_samples {}", n_samples);
    println!("Saved to {}", path.display());
    Ok(())
}

fn cmd_compare(args: CompareArgs, config: &JouleBenchConfig) -> Result<()> {
    let mut energy = config.energy.clone();
    if let Some(sticks) = args.ram_sticks {
        energy.ram_sticks = sticks;
    }
    if let Some(watts) = args.ram_watts {
        energy.ram_watts_per_stick = watts;
    }
    if let Some(secs) = args.run_secs {
        energy.reference_run_secs = secs;
    }
    let correction = energy.idle_memory_correction();

    let cumulative_dir = args
        .cumulative_dir
        .unwrap_or_else(|| config.results.cumulative_dir.clone());
    let trace_dir = args
        .trace_dir
        .unwrap_or_else(|| config.results.trace_dir.clone());

    let datasets = [
        ComparisonDataset::load(EnergyBackend::Cumulative, &cumulative_dir, correction),
        ComparisonDataset::load(EnergyBackend::SampleTrace, &trace_dir, correction),
    ];

    for dataset in &datasets {
        println!("{} ({} models):", dataset.backend, dataset.totals.len());
        for (model, total) in &dataset.totals {
            println!("  {:<30} {:>14.2} J", model, total);
        }
    }
    println!("Idle-memory correction for sample-trace results: {:.0} J", correction);

    let comparison = Comparison::new(&datasets);
    if comparison.is_empty() {
        println!("No results to compare");
        return Ok(());
    }

    comparison.write_html(&args.output)?;
    println!("Chart written to {}", args.output.display());

    if args.show {
        if let Err(e) = open::that(&args.output) {
            tracing::warn!("Could not open {}: {}", args.output.display(), e);
        }
    }

    Ok(())
}

fn write_progress(out: &mut impl Write, processed: usize, remaining_secs: f64) -> io::Result<()> {
    write!(
        out,
        "\rProcessed queries: {} | Remaining time: {:.1}s",
        processed, remaining_secs
    )?;
    out.flush()?;
    Ok(())
}

fn print_banner(message: &str, ok: bool) {
    let color = if ok { "\x1b[1;30;42m" } else { "\x1b[1;37;41m" };
    let pad = " ".repeat(message.chars().count() + 4);
    println!();
    println!("{}{}\x1b[0m", color, pad);
    println!("{}  {}  \x1b[0m", color, message);
    println!("{}{}\x1b[0m", color, pad);
    println!();
}

fn print_result(result: &BenchmarkResult) {
    println!("Results:");
    println!("{:-<40}", "");
    println!("  Model:            {}", result.model);
    println!("  Backend:          {}", result.backend);
    println!("  Running time:     {:.2} s", result.running_time_total);
    println!("  Energy:           {:.2} J", result.power_draw_total);
    println!("  Tokens in/out:    {:.0} / {:.0}", result.n_tokens_in, result.n_tokens_out);
    println!("  Per query:        {:.2} s, {:.2} J", result.running_time(), result.power_draw());
    for (component, energy) in &result.components {
        println!("  {:<17} {:.2} J", format!("{} energy:", component), energy);
    }
    println!();
}
