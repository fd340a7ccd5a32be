//! The parsed document record shared by every import path.

use std::collections::BTreeMap;

use innovest_core::NeedsMatrix;
use serde::{Deserialize, Serialize};

/// Where an extracted field was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSource {
    /// A `<label>` and the element following it.
    LabelPair,
    /// A `<dt>` and the element following it.
    DefinitionList,
    /// A table row with exactly two non-empty cells.
    TableRow,
    /// A primitive-typed property of a JSON object.
    JsonProperty,
    /// The capped contents of a plain-text file, labelled by its path.
    TextFile,
}

/// A free-text label/value pair harvested from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub label: String,
    pub value: String,
    pub source: FieldSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A binary (image) file attached to a project by reference; never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VianeoProject {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Ordered by first appearance; a repeated label keeps its slot and takes
    /// the later value.
    #[serde(default)]
    pub fields: Vec<ExtractedField>,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub file_types: BTreeMap<String, u32>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_matrix: Option<NeedsMatrix>,
}

impl VianeoProject {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            tasks: Vec::new(),
            fields: Vec::new(),
            source_files: Vec::new(),
            file_types: BTreeMap::new(),
            diagnostics: Vec::new(),
            assets: Vec::new(),
            needs_matrix: None,
        }
    }

    pub fn set_field(&mut self, label: impl Into<String>, value: impl Into<String>, source: FieldSource) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.label == label) {
            Some(existing) => {
                existing.value = value;
                existing.source = source;
            }
            None => self.fields.push(ExtractedField {
                label,
                value,
                source,
            }),
        }
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    /// Record a contributing file once.
    pub fn add_source(&mut self, name: &str) {
        if !self.source_files.iter().any(|s| s == name) {
            self.source_files.push(name.to_string());
        }
    }

    pub fn count_file_type(&mut self, kind: &str) {
        *self.file_types.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Append diagnostic lines not already present, keeping first-seen order.
    pub fn merge_diagnostics(&mut self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            if !self.diagnostics.contains(&line) {
                self.diagnostics.push(line);
            }
        }
    }

    /// Lowercased search text: title, description, tags, then field values.
    pub fn corpus(&self) -> String {
        let parts = [self.title.as_str(), self.description.as_deref().unwrap_or("")]
            .into_iter()
            .chain(self.tags.iter().map(String::as_str))
            .chain(self.fields.iter().map(|f| f.value.as_str()));
        parts.collect::<Vec<_>>().join(" \n ").to_lowercase()
    }
}
