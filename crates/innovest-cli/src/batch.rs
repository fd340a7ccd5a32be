//! Batch report generation: one text report per imported project, written
//! sequentially with progress counters. A failing project is recorded and
//! skipped.
//!
//! Report names come from project ids. Ids that sanitize to the same name get
//! a numeric suffix (`p_2.txt`, `p_2-2.txt`) so no report overwrites another.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use innovest_core::{CalculationResult, Engine, Report, staged_funding};
use innovest_import::{InputMapper, VianeoProject};
use tracing::{info, warn};

pub struct BatchEstimate {
    pub project_id: String,
    pub title: String,
    pub result: CalculationResult,
}

#[derive(Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub errors: Vec<String>,
    pub reports: Vec<PathBuf>,
    pub estimates: Vec<BatchEstimate>,
    pub elapsed_secs: f64,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

/// Estimate and report every project into `out_dir`.
pub async fn run_batch(
    engine: &Engine,
    mapper: &InputMapper,
    projects: &[VianeoProject],
    out_dir: &Path,
) -> anyhow::Result<BatchOutcome> {
    let start = Instant::now();
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut outcome = BatchOutcome {
        total: projects.len(),
        ..BatchOutcome::default()
    };

    let mut taken = HashSet::new();
    for (i, project) in projects.iter().enumerate() {
        let stem = unique_stem(&mut taken, &project.id);
        let path = out_dir.join(format!("{stem}.txt"));
        match report_project(engine, mapper, project, &path).await {
            Ok((path, result)) => {
                outcome.succeeded += 1;
                outcome.reports.push(path);
                outcome.estimates.push(BatchEstimate {
                    project_id: project.id.clone(),
                    title: project.title.clone(),
                    result,
                });
            }
            Err(e) => {
                warn!(project = %project.id, error = %e, "batch item failed");
                outcome
                    .errors
                    .push(format!("Project \"{}\" failed: {e:#}", project.title));
            }
        }
        eprint!("\r  Reported {}/{}", i + 1, outcome.total);
    }
    if outcome.total > 0 {
        eprintln!();
    }

    outcome.elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        total = outcome.total,
        succeeded = outcome.succeeded,
        failed = outcome.failed(),
        "batch complete"
    );
    Ok(outcome)
}

async fn report_project(
    engine: &Engine,
    mapper: &InputMapper,
    project: &VianeoProject,
    path: &Path,
) -> anyhow::Result<(PathBuf, CalculationResult)> {
    let input = mapper.map(project);
    let result = engine.calculate(&input);
    let funding = staged_funding(&result)?;
    let report = Report::build(&result, &funding, project.needs_matrix.as_ref())?;

    let text = format!("{}\n\n{report}", project.title);
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok((path.to_path_buf(), result))
}

/// File stem for `id` not yet in `taken`; records the result.
fn unique_stem(taken: &mut HashSet<String>, id: &str) -> String {
    let base = file_stem(id);
    let mut stem = base.clone();
    let mut n = 2;
    while !taken.insert(stem.clone()) {
        stem = format!("{base}-{n}");
        n += 1;
    }
    stem
}

fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "project".to_string() } else { stem }
}
