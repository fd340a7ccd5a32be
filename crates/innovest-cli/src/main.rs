mod batch;
mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use innovest_ai::{Advisor, Classifier, CommandClassifier, apply_suggestion};
use innovest_core::{
    Coefficients, Engine, EngineInput, ProjectEstimate, RawInput, Report, ScenarioName, estimate_batch,
    staged_funding,
};
use innovest_import::{InputMapper, import_paths};
use innovest_store::{CalculationStore, FileStore};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "innovest", about = "Investment estimation for innovation projects", version)]
struct Cli {
    /// JSON coefficient tables replacing the built-in set
    #[arg(long, global = true, env = "INNOVEST_COEFFICIENTS")]
    coefficients: Option<PathBuf>,

    /// Directory holding saved calculations and the advisor cache
    #[arg(long, global = true, env = "INNOVEST_STORE_DIR", default_value = ".innovest")]
    store_dir: PathBuf,

    /// Base URL for shareable locators
    #[arg(
        long,
        global = true,
        env = "INNOVEST_SHARE_BASE",
        default_value = "http://localhost:5173/"
    )]
    share_base: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every enumerated input value, grouped for display
    Catalog,
    /// Estimate from explicit inputs
    Estimate(EstimateArgs),
    /// Parse documents, map them to inputs, and estimate each project
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
        /// Command run as an advisory classifier (prompt on stdin)
        #[arg(long, env = "INNOVEST_ADVISOR_CMD")]
        advisor_cmd: Option<String>,
        #[arg(long, default_value_t = 30)]
        advisor_timeout_secs: u64,
    },
    /// Write one report per imported project
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        /// Also write flattened estimate rows to this Parquet file
        #[arg(long)]
        parquet: Option<PathBuf>,
    },
    /// Show a saved calculation
    Load {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List saved calculations, oldest first
    List,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[arg(long)]
    technology: String,
    #[arg(long)]
    stage: String,
    #[arg(long)]
    market: String,
    #[arg(long)]
    location: String,
    #[arg(long)]
    team: String,
    #[arg(long)]
    regulatory: String,
    #[arg(long)]
    json: bool,
    /// Save the calculation and print its shareable locator
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("INNOVEST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let coefficients = match &cli.coefficients {
        Some(path) => Coefficients::from_json_file(path)
            .with_context(|| format!("loading coefficients from {}", path.display()))?,
        None => Coefficients::builtin(),
    };
    let engine = Engine::new(coefficients);

    match cli.command {
        Command::Catalog => display::print_catalog(engine.coefficients()),
        Command::Estimate(args) => estimate(&engine, &cli.store_dir, &cli.share_base, args)?,
        Command::Import {
            paths,
            json,
            advisor_cmd,
            advisor_timeout_secs,
        } => {
            let advisor = open_advisor(
                &cli.store_dir,
                advisor_cmd.as_deref(),
                Duration::from_secs(advisor_timeout_secs),
            )?;
            import(&engine, &advisor, &paths, json).await?
        }
        Command::Batch {
            paths,
            out,
            parquet,
        } => run_batch(&engine, &paths, &out, parquet.as_deref()).await?,
        Command::Load { id, json } => load(&cli.store_dir, &cli.share_base, &id, json)?,
        Command::List => {
            let store = open_store(&cli.store_dir, &cli.share_base)?;
            let saved = store.list().context("listing saved calculations")?;
            if saved.is_empty() {
                println!("No saved calculations in {}", cli.store_dir.display());
            } else {
                println!("{}", display::saved_table(&saved)?);
            }
        }
    }
    Ok(())
}

fn open_store(dir: &Path, share_base: &str) -> anyhow::Result<CalculationStore<FileStore>> {
    let kv = FileStore::open(dir).with_context(|| format!("opening store at {}", dir.display()))?;
    Ok(CalculationStore::new(kv, share_base))
}

fn open_advisor(
    dir: &Path,
    command: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<Advisor<FileStore>> {
    let classifier = command
        .and_then(CommandClassifier::from_command_line)
        .map(|c| Arc::new(c) as Arc<dyn Classifier>);
    let cache = FileStore::open(dir.join("advisor"))
        .with_context(|| format!("opening advisor cache under {}", dir.display()))?;
    Ok(Advisor::new(classifier, cache).with_timeout(timeout))
}

fn estimate(
    engine: &Engine,
    store_dir: &Path,
    share_base: &str,
    args: EstimateArgs,
) -> anyhow::Result<()> {
    let raw = RawInput {
        technology_type: Some(args.technology),
        current_stage: Some(args.stage),
        target_market: Some(args.market),
        geographic_location: Some(args.location),
        team_status: Some(args.team),
        regulatory_environment: Some(args.regulatory),
    };
    let input = EngineInput::from_raw(&raw).context("invalid estimate input")?;
    let result = engine.calculate(&input);
    let funding = staged_funding(&result)?;

    let saved = if args.save {
        Some(open_store(store_dir, share_base)?.save(&input, &result)?)
    } else {
        None
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "result": result,
                "stagedFunding": funding,
                "saved": saved,
            }))?
        );
    } else {
        print!("{}", Report::build(&result, &funding, None)?.render_text());
        if let Some(s) = saved {
            println!("\nSaved as {}\n  {}", s.id, s.locator);
        }
    }
    Ok(())
}

async fn import(
    engine: &Engine,
    advisor: &Advisor<FileStore>,
    paths: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let report = import_paths(paths).await;
    for skipped in &report.skipped {
        eprintln!("  skipped {skipped}");
    }
    for err in &report.errors {
        eprintln!("  error: {err}");
    }
    if report.projects.is_empty() {
        bail!("no projects found in {} path(s)", paths.len());
    }

    let mapper = InputMapper::default();
    let mut rendered = Vec::with_capacity(report.projects.len());
    for project in &report.projects {
        let (mut input, trace) = mapper.map_with_trace(project);
        let mut rationale = None;
        if let Some(suggestion) = advisor.suggest_inputs(&project.corpus()).await {
            input = apply_suggestion(&input, &suggestion, engine.coefficients());
            rationale = suggestion.rationale;
        }
        let matrix = match &project.needs_matrix {
            Some(m) => Some(
                advisor
                    .refine_matrix(project.description.as_deref().unwrap_or(&project.title), m)
                    .await
                    .unwrap_or_else(|| m.clone()),
            ),
            None => None,
        };

        let result = engine.calculate(&input);
        let funding = staged_funding(&result)?;
        let built = Report::build(&result, &funding, matrix.as_ref())?;

        if json {
            rendered.push(json!({
                "project": project,
                "trace": trace,
                "rationale": rationale,
                "report": built,
            }));
        } else {
            println!("=== {} ({}) ===", project.title, project.id);
            println!("Mapped inputs");
            println!("{}", display::format_trace(&trace));
            if let Some(r) = &rationale {
                println!("  advisor: {r}");
            }
            println!();
            print!("{}", built.render_text());
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    }
    Ok(())
}

async fn run_batch(
    engine: &Engine,
    paths: &[PathBuf],
    out: &Path,
    parquet: Option<&Path>,
) -> anyhow::Result<()> {
    let imported = import_paths(paths).await;
    eprintln!(
        "  Imported {} project(s), {} file error(s)",
        imported.projects.len(),
        imported.errors.len()
    );

    let outcome = batch::run_batch(engine, &InputMapper::default(), &imported.projects, out).await?;
    println!(
        "Reported {}/{} project(s) into {} in {:.2}s",
        outcome.succeeded,
        outcome.total,
        out.display(),
        outcome.elapsed_secs
    );
    for err in imported.errors.iter().chain(&outcome.errors) {
        println!("  {err}");
    }

    if let Some(path) = parquet {
        let estimates: Vec<ProjectEstimate<'_>> = outcome
            .estimates
            .iter()
            .map(|e| ProjectEstimate {
                project_id: &e.project_id,
                title: &e.title,
                result: &e.result,
            })
            .collect();
        let rows = estimate_batch(&estimates)?;
        let written = innovest_store::write_estimates_parquet(path, &rows)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {written} estimate row(s) to {}", path.display());
    }
    Ok(())
}

fn load(store_dir: &Path, share_base: &str, id: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(store_dir, share_base)?;
    let saved = store.load(id).with_context(|| format!("loading calculation {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
        return Ok(());
    }

    println!("Saved {} at {}", saved.id, saved.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  {}\n", store.locator(&saved.id));

    let rows = estimate_batch(&[ProjectEstimate {
        project_id: &saved.id,
        title: "",
        result: &saved.result,
    }])?;
    let realistic = saved
        .result
        .scenarios
        .iter()
        .position(|s| s.name == ScenarioName::Realistic)
        .context("saved calculation has no Realistic scenario")?;
    for line in display::estimate_card(&rows, realistic) {
        println!("{line}");
    }

    let funding = staged_funding(&saved.result)?;
    print!("{}", Report::build(&saved.result, &funding, None)?.render_text());
    Ok(())
}
