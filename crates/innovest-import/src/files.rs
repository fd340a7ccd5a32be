//! Routing a collection of files through the per-kind parsers.
//!
//! Files are processed in kind phases (markup, JSON, text, images), each phase
//! in input order. Text files enrich the first project found so far; images
//! are attached to it by reference. Projects are deduplicated by id at the
//! end, keeping the first occurrence.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ImportError;
use crate::html::{DEFAULT_DOCUMENT_TITLE, parse_document};
use crate::project::{Asset, FieldSource, VianeoProject};

/// Characters kept from each text file.
pub const TEXT_LIMIT: usize = 5000;
/// Diagnostic lines kept from each text file.
pub const DIAGNOSTIC_LIMIT: usize = 50;

static SAVED_RESOURCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)saved_resource").unwrap());
static MARKUP_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.html?$").unwrap());
static JSON_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.json$|global[-_]?data").unwrap());
static TEXT_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(txt|csv|md)$").unwrap());
static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|webp|svg)$").unwrap());
static MARKUP_SNIFF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html|<head|<body").unwrap());
static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)risk|milestone|strategy|regulat|team|market|geo|timeline|roadmap|deployment|ecosystem|network",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Markup,
    Json,
    Text,
    Image,
}

/// Classify a file by path, falling back to content sniffing. `None` means the
/// file is not importable.
///
/// Known extensions win over a `saved_resource` path, so assets saved next to
/// a page keep their own kind.
pub fn detect_kind(path: &str, contents: Option<&str>) -> Option<FileKind> {
    if MARKUP_EXT.is_match(path) {
        return Some(FileKind::Markup);
    }
    if JSON_FILE.is_match(path) {
        return Some(FileKind::Json);
    }
    if IMAGE_EXT.is_match(path) {
        return Some(FileKind::Image);
    }
    let sniffed = contents.is_some_and(|c| MARKUP_SNIFF.is_match(c));
    if TEXT_EXT.is_match(path) {
        return Some(if sniffed { FileKind::Markup } else { FileKind::Text });
    }
    (sniffed || SAVED_RESOURCE.is_match(path)).then_some(FileKind::Markup)
}

/// One input file. Binary files carry no contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub contents: Option<String>,
}

impl SourceFile {
    pub fn text(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: Some(contents.into()),
        }
    }

    pub fn binary(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: None,
        }
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    fn extension(&self) -> &str {
        match self.name().rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => "txt",
        }
    }

    fn require_contents(&self) -> Result<&str, ImportError> {
        self.contents
            .as_deref()
            .ok_or_else(|| ImportError::MissingContents {
                name: self.name().to_string(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub projects: Vec<VianeoProject>,
    /// One message per file that failed to read or parse.
    pub errors: Vec<String>,
    /// Paths not recognized as any importable kind.
    pub skipped: Vec<String>,
}

impl ImportReport {
    fn fail(&mut self, err: ImportError) {
        warn!(error = %err, "skipping file");
        self.errors.push(err.to_string());
    }
}

/// Route an in-memory file collection through the per-kind parsers.
pub fn parse_file_set(files: &[SourceFile]) -> ImportReport {
    let mut report = ImportReport::default();
    let mut classified = Vec::with_capacity(files.len());
    for file in files {
        match detect_kind(&file.path, file.contents.as_deref()) {
            Some(kind) => classified.push((kind, file)),
            None => {
                debug!(path = %file.path, "unrecognized file kind");
                report.skipped.push(file.path.clone());
            }
        }
    }
    let of_kind = |kind: FileKind| {
        classified
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, f)| *f)
            .collect::<Vec<_>>()
    };

    let mut projects: Vec<VianeoProject> = Vec::new();

    for file in of_kind(FileKind::Markup) {
        match markup_projects(file) {
            Ok(found) => projects.extend(found),
            Err(err) => report.fail(err),
        }
    }
    for file in of_kind(FileKind::Json) {
        match json_projects(file) {
            Ok(found) => projects.extend(found),
            Err(err) => report.fail(err),
        }
    }
    for file in of_kind(FileKind::Text) {
        if let Err(err) = merge_text(&mut projects, file) {
            report.fail(err);
        }
    }
    attach_images(&mut projects, &of_kind(FileKind::Image));

    let mut seen = HashSet::new();
    projects.retain(|p| seen.insert(p.id.clone()));
    report.projects = projects;
    report
}

fn markup_projects(file: &SourceFile) -> Result<Vec<VianeoProject>, ImportError> {
    let contents = file.require_contents()?;
    let mut projects = parse_document(contents, file.name());
    for p in &mut projects {
        p.count_file_type("html");
        if let Some(m) = &mut p.needs_matrix
            && m.source.is_none()
        {
            m.source = Some(file.path.clone());
        }
    }
    Ok(projects)
}

fn json_projects(file: &SourceFile) -> Result<Vec<VianeoProject>, ImportError> {
    let name = file.name();
    let value: Value = serde_json::from_str(file.require_contents()?).map_err(|source| {
        ImportError::Json {
            name: name.to_string(),
            source,
        }
    })?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray {
            name: name.to_string(),
        });
    };

    let projects = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let obj = item.as_object()?;
            let id = ["id", "uuid"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(truthy_text))
                .unwrap_or_else(|| format!("{name}-{idx}"));
            let title = ["title", "name"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(truthy_text))
                .unwrap_or_else(|| format!("Item {}", idx + 1));

            let mut project = VianeoProject::new(id, title);
            project.description = obj.get("description").and_then(truthy_text);
            for (key, v) in obj {
                if let Some(text) = primitive_text(v) {
                    project.set_field(key.clone(), text, FieldSource::JsonProperty);
                }
            }
            project.add_source(name);
            Some(project)
        })
        .collect();
    Ok(projects)
}

/// String form of a primitive JSON value.
fn primitive_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Primitive text, excluding empty strings, zero and `false`.
fn truthy_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Bool(false) => None,
        other => primitive_text(other),
    }
}

fn merge_text(projects: &mut Vec<VianeoProject>, file: &SourceFile) -> Result<(), ImportError> {
    let text: String = file.require_contents()?.chars().take(TEXT_LIMIT).collect();
    let diagnostics = extract_diagnostics(&text);

    if projects.is_empty() {
        projects.push(VianeoProject::new(
            "project-text-1",
            "Vianeo Project (text import)",
        ));
    }
    let project = &mut projects[0];
    project.set_field(file.path.clone(), text, FieldSource::TextFile);
    project.add_source(&file.path);
    project.count_file_type(file.extension());
    project.merge_diagnostics(diagnostics);
    Ok(())
}

fn attach_images(projects: &mut Vec<VianeoProject>, images: &[&SourceFile]) {
    if images.is_empty() {
        return;
    }
    if projects.is_empty() {
        projects.push(VianeoProject::new("project-assets-1", DEFAULT_DOCUMENT_TITLE));
    }
    let project = &mut projects[0];
    for img in images {
        project.assets.push(Asset {
            path: img.path.clone(),
            name: img.name().to_string(),
        });
        project.count_file_type("image");
        project.add_source(&img.path);
    }
}

/// Non-empty trimmed lines that mention strategy, risk or planning keywords.
pub fn extract_diagnostics(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && DIAGNOSTIC_LINE.is_match(l))
        .take(DIAGNOSTIC_LIMIT)
        .map(str::to_string)
        .collect()
}

/// Read files and directories from disk and import them.
///
/// Directories are walked recursively in file-name order. Files are read one
/// at a time; image files are referenced without being read. Read failures are
/// reported alongside parse failures.
pub async fn import_paths(paths: &[PathBuf]) -> ImportReport {
    let mut errors = Vec::new();
    let mut files = Vec::new();

    for path in expand_paths(paths, &mut errors) {
        let display = path.display().to_string();
        if IMAGE_EXT.is_match(&display) {
            files.push(SourceFile::binary(display));
            continue;
        }
        match tokio::fs::read(&path).await {
            Ok(bytes) => files.push(SourceFile::text(
                display,
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            Err(source) => {
                let err = ImportError::Io { path, source };
                warn!(error = %err, "skipping unreadable file");
                errors.push(err.to_string());
            }
        }
    }

    let mut report = parse_file_set(&files);
    errors.append(&mut report.errors);
    report.errors = errors;

    info!(
        files = files.len(),
        projects = report.projects.len(),
        errors = report.errors.len(),
        "imported file set"
    );
    report
}

fn expand_paths(paths: &[PathBuf], errors: &mut Vec<String>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for root in paths {
        if !root.is_dir() {
            out.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(e) if e.file_type().is_file() => out.push(e.into_path()),
                Ok(_) => {}
                Err(source) => {
                    let err = ImportError::Walk {
                        path: walk_error_path(root, &source),
                        source,
                    };
                    warn!(error = %err, "skipping unreadable directory entry");
                    errors.push(err.to_string());
                }
            }
        }
    }
    out
}

fn walk_error_path(root: &Path, err: &walkdir::Error) -> PathBuf {
    err.path().unwrap_or(root).to_path_buf()
}
