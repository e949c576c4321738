use anyhow::{Context, Result};
use cadgen_engine::config::Settings;
use cadgen_engine::director::{Director, RunOutcome};
use cadgen_engine::export::export_solid;
use cadgen_engine::geometry::ExportFormat;
use cadgen_engine::geometry::cadquery::CadQueryBackend;
use cadgen_engine::llm::openrouter::OpenRouterClient;
use cadgen_engine::logging::RunLogger;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Generate CAD models from text prompts", long_about = None)]
struct Args {
    /// Text description of the CAD model to generate
    prompt: String,

    /// Output directory for generated files
    #[arg(short, long, default_value = "outputs/models")]
    output: PathBuf,

    /// Output file format
    #[arg(short, long, default_value = "step", value_parser = ["step", "stl"])]
    format: String,

    /// Custom base filename (timestamped name when omitted)
    #[arg(long)]
    name: Option<String>,

    /// Skip exporting the generated model to disk
    #[arg(long)]
    no_export: bool,

    /// Model identifier (overrides DEFAULT_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Maximum generate/validate attempts (overrides MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn setup_logging(debug: bool, base_level: &str) {
    let filter = if debug {
        EnvFilter::new("info,cadgen_cli=debug,cadgen_engine=debug")
    } else {
        EnvFilter::new(format!(
            "warn,cadgen_cli={base_level},cadgen_engine={base_level}"
        ))
    };

    fmt::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_env().context("failed to load configuration")?;
    setup_logging(args.debug, &settings.log_level);

    let format: ExportFormat = args.format.parse()?;
    let max_iterations = args.max_iterations.unwrap_or(settings.max_iterations);

    let mut client =
        OpenRouterClient::from_settings(&settings).context("failed to build model client")?;
    if let Some(ref model) = args.model {
        client = client.with_model(model.clone());
    }
    info!(model = client.model(), max_iterations, "starting generation");

    // Ctrl-C cancels the run at the next checkpoint instead of tearing
    // the process down mid-call.
    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, cancelling run...");
            ctrlc_token.cancel();
        }
    });

    let logger = RunLogger::new(&args.output)
        .await
        .context("failed to create run log")?;

    let backend = CadQueryBackend::new();
    let director = Director::new(client, backend.clone())
        .with_max_iterations(max_iterations)
        .with_cancellation(cancel)
        .with_run_logger(logger);

    let outcome = match director.run(&args.prompt).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("{} CAD generation failed", style("✗").red().bold());
            println!("   Error: {err}");
            std::process::exit(1);
        }
    };

    match outcome {
        RunOutcome::Success {
            solid,
            specification,
            iterations,
            ..
        } => {
            println!(
                "{} CAD model generated successfully!",
                style("✓").green().bold()
            );
            println!("   Part: {}", style(&specification.part_name).cyan());
            println!("   Iterations: {iterations}");

            if args.no_export {
                println!("   Export skipped (--no-export)");
                return Ok(());
            }

            match export_solid(
                &backend,
                &solid,
                &args.output,
                format,
                args.name.as_deref(),
            )
            .await
            {
                Ok(path) => println!("   Exported to: {}", style(path.display()).green()),
                Err(err) => {
                    println!("   {} Export failed: {err}", style("✗").red());
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        RunOutcome::Exhausted {
            specification,
            last_error,
            attempts,
        } => {
            println!("{} CAD generation failed", style("✗").red().bold());
            println!("   Part: {}", specification.part_name);
            println!("   Attempts: {attempts}");
            println!("   Last error: {last_error}");
            std::process::exit(1);
        }
        RunOutcome::Cancelled { attempts } => {
            println!(
                "{} Run cancelled after {attempts} attempt(s)",
                style("∅").yellow().bold()
            );
            std::process::exit(1);
        }
    }
}
