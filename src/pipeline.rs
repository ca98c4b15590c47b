//! Ordered KQL pipe stages.

use serde::Serialize;
use std::fmt;

/// Marker written before every stage after the source.
pub const STAGE_MARKER: &str = "| ";

/// A KQL pipeline: an optional source (table name) followed by pipe
/// operations. Operations are stored without the `| ` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    source: Option<String>,
    operations: Vec<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline reading from a single table.
    pub fn from_source(source: impl Into<String>) -> Self {
        let mut pipeline = Self::new();
        pipeline.set_source(source);
        pipeline
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        if !source.trim().is_empty() {
            self.source = Some(source.trim_end().to_string());
        }
    }

    /// Append a stage. Blank stages are dropped.
    pub fn push(&mut self, stage: impl Into<String>) {
        let stage = stage.into();
        let stage = stage.trim_end();
        if !stage.trim().is_empty() {
            tracing::debug!(stage, "emit");
            self.operations.push(stage.to_string());
        }
    }

    /// Append another pipeline. Its source becomes ours when we have none,
    /// otherwise it is kept as a plain stage.
    pub fn append(&mut self, other: Pipeline) {
        if let Some(source) = other.source {
            if self.source.is_none() && self.operations.is_empty() {
                self.source = Some(source);
            } else {
                self.push(source);
            }
        }
        self.operations.extend(other.operations);
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// Source followed by operations, each without the stage marker.
    pub fn stages(&self) -> Vec<&str> {
        self.source
            .iter()
            .chain(self.operations.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.operations.is_empty()
    }

    /// One stage per line.
    pub fn render(&self) -> String {
        self.render_with("\n")
    }

    /// Rendering used inside `join (...)`, `union (...)` and `in (...)`.
    pub fn render_nested(&self) -> String {
        self.render_with("\n  ")
    }

    /// Single-line rendering, used in diagnostics.
    pub fn render_inline(&self) -> String {
        self.render_with(" ")
    }

    fn render_with(&self, separator: &str) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.operations.len() + 1);
        if let Some(source) = &self.source {
            lines.push(source.clone());
        }
        lines.extend(
            self.operations
                .iter()
                .map(|op| format!("{}{}", STAGE_MARKER, op)),
        );
        lines.join(separator)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_marks_every_stage_after_source() {
        let mut pipeline = Pipeline::from_source("t");
        pipeline.push("where a == 'x'");
        pipeline.push("project a");
        assert_eq!(pipeline.render(), "t\n| where a == 'x'\n| project a");
        assert_eq!(pipeline.stages(), vec!["t", "where a == 'x'", "project a"]);
    }

    #[test]
    fn test_blank_stages_are_dropped() {
        let mut pipeline = Pipeline::from_source("t");
        pipeline.push("   ");
        pipeline.push("");
        pipeline.push("limit 5\n");
        assert_eq!(pipeline.stages(), vec!["t", "limit 5"]);
    }

    #[test]
    fn test_append_takes_over_source() {
        let mut inner = Pipeline::from_source("t");
        inner.push("where a > 1");
        let mut outer = Pipeline::new();
        assert!(outer.is_empty());
        outer.append(inner);
        outer.push("limit 1");
        assert!(!outer.is_empty());
        assert_eq!(outer.source(), Some("t"));
        assert_eq!(outer.operations(), ["where a > 1", "limit 1"]);
        assert_eq!(outer.render(), "t\n| where a > 1\n| limit 1");
    }

    #[test]
    fn test_append_after_operations_keeps_source_as_stage() {
        let mut outer = Pipeline::new();
        outer.push("print x = 1");
        outer.append(Pipeline::from_source("t"));
        assert_eq!(outer.source(), None);
        assert_eq!(outer.operations(), ["print x = 1", "t"]);
    }

    #[test]
    fn test_nested_rendering_indents() {
        let mut pipeline = Pipeline::from_source("t");
        pipeline.push("project a");
        assert_eq!(pipeline.render_nested(), "t\n  | project a");
        assert_eq!(pipeline.render_inline(), "t | project a");
    }
}
