//! Markup document parsing.
//!
//! Two strategies, chosen per document:
//!
//! 1. Explicit containers: every `[data-project-id]` element becomes one project
//!    with its own title, description, tags, tasks, label/value fields and
//!    needs matrix.
//! 2. Whole document: no containers, so the document is one project whose
//!    fields come from definition lists and two-cell table rows.
//!
//! Parsing is lenient: malformed markup still yields a tree, and missing parts
//! fall back to defaults rather than errors.

use std::sync::LazyLock;

use innovest_core::{CellValue, NeedsMatrix};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::project::{FieldSource, Task, VianeoProject};

/// Maximum description length, in characters, for the whole-document strategy.
pub const DESCRIPTION_LIMIT: usize = 500;

/// Title used when a document has neither `<title>` nor a heading.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Vianeo Project";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static PROJECT: LazyLock<Selector> = LazyLock::new(|| selector("[data-project-id]"));
static PROJECT_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("[data-project-title]"));
static PROJECT_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector("[data-project-description]"));
static HEADING_1_3: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3"));
static HEADING_1_2: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2"));
static TAG: LazyLock<Selector> = LazyLock::new(|| selector("[data-tag], .tag, .badge"));
static TASK: LazyLock<Selector> = LazyLock::new(|| selector("[data-task-id]"));
static TASK_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("[data-task-title]"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("label"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static DL: LazyLock<Selector> = LazyLock::new(|| selector("dl"));
static DT: LazyLock<Selector> = LazyLock::new(|| selector("dt"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("th, td"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

static PERSONA_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^persona$|user|segment|role").unwrap());

/// Parse one markup document into zero or more projects.
pub fn parse_document(markup: &str, source_name: &str) -> Vec<VianeoProject> {
    let doc = Html::parse_document(markup);
    let containers: Vec<ElementRef<'_>> = doc.select(&PROJECT).collect();

    let projects = if containers.is_empty() {
        vec![parse_whole_document(&doc, source_name)]
    } else {
        containers
            .into_iter()
            .enumerate()
            .map(|(idx, el)| parse_container(el, idx, source_name))
            .collect()
    };
    debug!(source = source_name, count = projects.len(), "parsed markup document");
    projects
}

fn parse_container(el: ElementRef<'_>, idx: usize, source_name: &str) -> VianeoProject {
    let id = el
        .value()
        .attr("data-project-id")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| format!("p{idx}"), str::to_string);
    let title = first_text(el, &PROJECT_TITLE)
        .or_else(|| first_text(el, &HEADING_1_3))
        .unwrap_or_else(|| format!("Project {}", idx + 1));

    let mut project = VianeoProject::new(id, title);
    project.description = first_text(el, &PROJECT_DESCRIPTION);
    project.tags = el
        .select(&TAG)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();
    project.tasks = el
        .select(&TASK)
        .filter_map(|t| {
            let title = first_text(t, &TASK_TITLE).unwrap_or_else(|| text_of(t));
            (!title.is_empty()).then(|| Task {
                id: t.value().attr("data-task-id").unwrap_or_default().to_string(),
                title,
                status: t.value().attr("data-task-status").map(str::to_string),
            })
        })
        .collect();

    for label in el.select(&LABEL) {
        let key = text_of(label);
        if key.is_empty() {
            continue;
        }
        if let Some(value) = next_element_text(label) {
            project.set_field(key, value, FieldSource::LabelPair);
        }
    }

    project.needs_matrix = extract_matrix(el);
    project.add_source(source_name);
    project
}

fn parse_whole_document(doc: &Html, source_name: &str) -> VianeoProject {
    let title = doc
        .select(&TITLE)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
        .or_else(|| doc.select(&HEADING_1_2).next().map(text_of).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TITLE.to_string());

    let mut project = VianeoProject::new("project-1", title);

    for dl in doc.select(&DL) {
        for dt in dl.select(&DT) {
            let key = text_of(dt);
            if key.is_empty() {
                continue;
            }
            if let Some(value) = next_element_text(dt) {
                project.set_field(key, value, FieldSource::DefinitionList);
            }
        }
    }
    for table in doc.select(&TABLE) {
        for tr in table.select(&TR) {
            let cells: Vec<String> = tr.select(&CELL).map(text_of).collect();
            if let [key, value] = cells.as_slice()
                && !key.is_empty()
                && !value.is_empty()
            {
                project.set_field(key.clone(), value.clone(), FieldSource::TableRow);
            }
        }
    }

    let meta = doc
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|m| m.value().attr("content"))
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    project.description = meta
        .or_else(|| doc.select(&PARAGRAPH).next().map(text_of))
        .map(|d| d.chars().take(DESCRIPTION_LIMIT).collect::<String>())
        .filter(|d| !d.is_empty());

    let root = doc.select(&BODY).next().unwrap_or_else(|| doc.root_element());
    project.needs_matrix = extract_matrix(root);
    project.add_source(source_name);
    project
}

/// Locate a persona × need grid among the tables under `root`.
///
/// Candidates have at least 3 rows and at least 3 cells in their widest row;
/// the largest rows × columns wins, ties going to the earlier table.
pub fn extract_matrix(root: ElementRef<'_>) -> Option<NeedsMatrix> {
    let mut best: Option<(Vec<ElementRef<'_>>, usize)> = None;
    for table in root.select(&TABLE) {
        let rows: Vec<ElementRef<'_>> = table.select(&TR).collect();
        if rows.len() < 3 {
            continue;
        }
        let cols = rows.iter().map(|r| r.select(&CELL).count()).max().unwrap_or(0);
        let score = rows.len() * cols;
        if cols >= 3 && best.as_ref().is_none_or(|(_, s)| score > *s) {
            best = Some((rows, score));
        }
    }
    let (rows, _) = best?;

    let header: Vec<String> = rows[0].select(&CELL).map(text_of).collect();
    let persona_col = header
        .iter()
        .position(|h| PERSONA_HEADER.is_match(h))
        .unwrap_or(0);

    let mut needs: Vec<String> = Vec::new();
    for (i, h) in header.iter().enumerate() {
        if i == persona_col {
            continue;
        }
        let label = if h.is_empty() {
            format!("Need {}", needs.len() + 1)
        } else {
            h.clone()
        };
        needs.push(label);
    }

    let mut personas = Vec::new();
    let mut values = Vec::new();
    for row in &rows[1..] {
        let cells: Vec<String> = row.select(&CELL).map(text_of).collect();
        let Some(persona) = cells.get(persona_col).filter(|p| !p.is_empty()) else {
            continue;
        };
        personas.push(persona.clone());
        values.push(
            cells
                .iter()
                .enumerate()
                .filter(|(c, _)| *c != persona_col)
                .map(|(_, txt)| CellValue::from_cell_text(txt))
                .collect::<Vec<_>>(),
        );
    }

    let labelled = needs.iter().any(|n| !n.eq_ignore_ascii_case("persona"));
    if !labelled && let Some(first) = values.first() {
        for i in needs.len()..first.len() {
            needs.push(format!("Need {}", i + 1));
        }
    }

    if needs.is_empty() || personas.is_empty() {
        return None;
    }
    Some(NeedsMatrix::new(personas, needs, values))
}

/// Concatenated descendant text, trimmed.
fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel).next().map(text_of).filter(|t| !t.is_empty())
}

fn next_element_text(el: ElementRef<'_>) -> Option<String> {
    el.next_siblings()
        .find_map(ElementRef::wrap)
        .map(text_of)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINERS: &str = r#"
        <html><body>
          <div data-project-id=" alpha ">
            <h2>Alpha Robotics</h2>
            <p data-project-description>Warehouse robotics for SMB retailers</p>
            <span class="tag">robotics</span><span data-tag>  </span><span class="badge">pilot</span>
            <ul>
              <li data-task-id="t1" data-task-status="done"><span data-task-title>Build MVP</span> extra</li>
              <li data-task-id="t2"></li>
              <li data-task-id="t3">Customer interviews</li>
            </ul>
            <label>Market</label><span>Small business</span>
            <label>Empty</label><span> </span>
            <label></label><span>ignored</span>
            <table>
              <tr><th>User</th><th>Speed</th><th></th></tr>
              <tr><td>Picker</td><td>4</td><td>high</td></tr>
              <tr><td></td><td>1</td><td>2</td></tr>
              <tr><td>Manager</td><td>5</td></tr>
            </table>
          </div>
          <div data-project-id="">
            <div data-project-title>Beta</div>
          </div>
        </body></html>"#;

    #[test]
    fn containers_become_projects() {
        let projects = parse_document(CONTAINERS, "saved_resource.html");
        assert_eq!(projects.len(), 2);

        let alpha = &projects[0];
        assert_eq!(alpha.id, "alpha");
        assert_eq!(alpha.title, "Alpha Robotics");
        assert_eq!(
            alpha.description.as_deref(),
            Some("Warehouse robotics for SMB retailers")
        );
        assert_eq!(alpha.tags, vec!["robotics", "pilot"]);
        assert_eq!(alpha.tasks.len(), 2);
        assert_eq!(alpha.tasks[0].title, "Build MVP");
        assert_eq!(alpha.tasks[0].status.as_deref(), Some("done"));
        assert_eq!(alpha.tasks[1].title, "Customer interviews");
        assert_eq!(alpha.field("Market"), Some("Small business"));
        assert_eq!(alpha.field("Empty"), None);
        assert_eq!(alpha.fields.len(), 1);
        assert_eq!(alpha.source_files, vec!["saved_resource.html"]);

        let beta = &projects[1];
        assert_eq!(beta.id, "p1");
        assert_eq!(beta.title, "Beta");
        assert!(beta.needs_matrix.is_none());
    }

    #[test]
    fn container_matrix_uses_persona_column() {
        let projects = parse_document(CONTAINERS, "x.html");
        let m = projects[0].needs_matrix.as_ref().unwrap();
        assert_eq!(m.personas, vec!["Picker", "Manager"]);
        assert_eq!(m.needs, vec!["Speed", "Need 2"]);
        assert_eq!(
            m.values[0],
            vec![CellValue::Number(4.0), CellValue::Text("high".into())]
        );
        // short row padded
        assert_eq!(m.values[1], vec![CellValue::Number(5.0), CellValue::Text(String::new())]);
    }

    #[test]
    fn persona_column_need_not_be_first() {
        let html = r#"<table>
            <tr><th>Cost</th><th>Segment</th><th>Compliance</th></tr>
            <tr><td>10%</td><td>Clinics</td><td>90%</td></tr>
            <tr><td>20%</td><td>Hospitals</td><td>n/a</td></tr>
        </table>"#;
        let p = &parse_document(html, "doc.html")[0];
        let m = p.needs_matrix.as_ref().unwrap();
        assert_eq!(m.personas, vec!["Clinics", "Hospitals"]);
        assert_eq!(m.needs, vec!["Cost", "Compliance"]);
        assert_eq!(
            m.values[1],
            vec![CellValue::Number(20.0), CellValue::Text("n/a".into())]
        );
    }

    #[test]
    fn largest_table_wins() {
        let html = r#"<body>
            <table>
              <tr><th>Persona</th><th>A</th><th>B</th></tr>
              <tr><td>One</td><td>1</td><td>2</td></tr>
              <tr><td>Two</td><td>3</td><td>4</td></tr>
            </table>
            <table>
              <tr><th>Persona</th><th>X</th><th>Y</th><th>Z</th></tr>
              <tr><td>Big</td><td>1</td><td>2</td><td>3</td></tr>
              <tr><td>Bigger</td><td>1</td><td>2</td><td>3</td></tr>
            </table>
            <table>
              <tr><th>Persona</th><th>P</th><th>Q</th><th>R</th></tr>
              <tr><td>Tie</td><td>1</td><td>2</td><td>3</td></tr>
              <tr><td>Tie2</td><td>1</td><td>2</td><td>3</td></tr>
            </table>
        </body>"#;
        let p = &parse_document(html, "doc.html")[0];
        let m = p.needs_matrix.as_ref().unwrap();
        assert_eq!(m.needs, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn small_tables_are_not_matrices() {
        let html = r#"<table>
            <tr><td>Stage</td><td>Prototype</td></tr>
            <tr><td>Market</td><td>Hospitals</td></tr>
            <tr><td>Team</td><td>Partial</td></tr>
        </table>"#;
        let p = &parse_document(html, "doc.html")[0];
        assert!(p.needs_matrix.is_none());
        assert_eq!(p.field("Stage"), Some("Prototype"));
        assert_eq!(p.fields[1].source, FieldSource::TableRow);
    }

    #[test]
    fn whole_document_fallback() {
        let long = "x".repeat(700);
        let html = format!(
            r#"<html><head><title> Gamma Diagnostics </title></head>
            <body>
              <h1>Ignored heading</h1>
              <p>{long}</p>
              <dl><dt>Regulatory</dt><dd>FDA clearance</dd><dt>Location</dt><dd>Boston</dd></dl>
            </body></html>"#
        );
        let projects = parse_document(&html, "export.html");
        assert_eq!(projects.len(), 1);
        let p = &projects[0];
        assert_eq!(p.id, "project-1");
        assert_eq!(p.title, "Gamma Diagnostics");
        assert_eq!(p.description.as_ref().unwrap().chars().count(), DESCRIPTION_LIMIT);
        assert_eq!(p.field("Regulatory"), Some("FDA clearance"));
        assert_eq!(p.fields[0].source, FieldSource::DefinitionList);
        assert_eq!(p.source_files, vec!["export.html"]);
    }

    #[test]
    fn meta_description_preferred() {
        let html = r#"<html><head><meta name="description" content="From meta"></head>
            <body><h2>Heading</h2><p>From paragraph</p></body></html>"#;
        let p = &parse_document(html, "doc.html")[0];
        assert_eq!(p.title, "Heading");
        assert_eq!(p.description.as_deref(), Some("From meta"));
    }

    #[test]
    fn empty_document_gets_default_title() {
        let p = &parse_document("", "doc.html")[0];
        assert_eq!(p.title, DEFAULT_DOCUMENT_TITLE);
        assert!(p.description.is_none());
        assert!(p.fields.is_empty());
    }

    #[test]
    fn blank_header_row_synthesizes_needs() {
        let html = r#"<table>
            <tr><td>Persona</td></tr>
            <tr><td>Ops</td><td>3</td><td>4</td></tr>
            <tr><td>Finance</td><td>1</td><td>2</td></tr>
        </table>"#;
        let p = &parse_document(html, "doc.html")[0];
        let m = p.needs_matrix.as_ref().unwrap();
        assert_eq!(m.needs, vec!["Need 1", "Need 2"]);
        assert_eq!(m.personas, vec!["Ops", "Finance"]);
    }
}
