//! Output records and rendering.
//!
//! Everything user-visible goes through the record structs here so that
//! the JSON shape, the text format, and the `-f` templates all see the
//! same data. Ordering is always derived from deterministic keys: package
//! path, then file path, then declaration line, which keeps paired methods
//! in the same file adjacent.

pub mod template;

use crate::analysis::{DeadFunction, OverExport, PathEdge};
use crate::filter::PackageFilter;
use crate::ir::{FuncId, Position, Program};
use serde::Serialize;
use std::path::Path;

/// Position record of the `deadcode` output protocol.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPosition {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line")]
    pub line: u32,
    #[serde(rename = "Col")]
    pub col: u32,
}

impl JsonPosition {
    pub fn from_position(pos: &Position) -> Self {
        Self {
            file: display_path(&pos.file),
            line: pos.line,
            col: pos.col,
        }
    }
}

impl std::fmt::Display for JsonPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// One dead function of a package.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFunction {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Position")]
    pub position: JsonPosition,
    #[serde(rename = "Generated")]
    pub generated: bool,
    #[serde(rename = "Marker")]
    pub marker: bool,
}

/// Dead functions grouped by package.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPackage {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Funcs")]
    pub funcs: Vec<JsonFunction>,
}

/// One step of a `-whylive` explanation. `Initial` is the chosen root,
/// set on the first edge only.
#[derive(Debug, Clone, Serialize)]
pub struct JsonEdge {
    #[serde(rename = "Initial", skip_serializing_if = "String::is_empty")]
    pub initial: String,
    #[serde(rename = "Kind")]
    pub kind: &'static str,
    #[serde(rename = "Position")]
    pub position: JsonPosition,
    #[serde(rename = "Callee")]
    pub callee: String,
}

/// Position record of the `overexported` output protocol.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPosition {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

/// One over-exported identifier.
#[derive(Debug, Clone, Serialize)]
pub struct JsonExport {
    pub name: String,
    pub kind: &'static str,
    pub position: ExportPosition,
    pub package: String,
}

/// Render a file path relative to the working directory when it lies
/// inside it.
pub fn display_path(file: &str) -> String {
    let cwd = match std::env::current_dir() {
        Ok(d) => d,
        Err(_) => return file.to_string(),
    };
    match Path::new(file).strip_prefix(&cwd) {
        Ok(rel) => rel.display().to_string(),
        Err(_) => file.to_string(),
    }
}

/// Group dead functions into package records, applying the package filter.
/// Input is already sorted by (package, file, line).
pub fn group_dead(
    program: &Program,
    dead: &[DeadFunction],
    filter: &PackageFilter,
) -> Vec<JsonPackage> {
    let mut packages: Vec<JsonPackage> = Vec::new();
    for d in dead {
        let pkg = program.package(d.package);
        if !filter.matches(&pkg.path) {
            continue;
        }
        let record = JsonFunction {
            name: d.name.clone(),
            position: JsonPosition::from_position(&d.position),
            generated: d.generated,
            marker: false,
        };
        let new_group = packages.last().map(|p| p.path != pkg.path).unwrap_or(true);
        if new_group {
            packages.push(JsonPackage {
                name: pkg.name.clone(),
                path: pkg.path.clone(),
                funcs: Vec::new(),
            });
        }
        if let Some(last) = packages.last_mut() {
            last.funcs.push(record);
        }
    }
    packages
}

/// Default line-oriented `deadcode` format:
/// `a/b/c.src:1:2: unreachable func: T.f`.
pub fn render_dead_text(packages: &[JsonPackage]) -> String {
    let mut out = String::new();
    for pkg in packages {
        for f in &pkg.funcs {
            out.push_str(&format!(
                "{}: unreachable func: {}\n",
                f.position, f.name
            ));
        }
    }
    out
}

/// Turn an explanation path into edge records.
pub fn edges_to_json(program: &Program, root: FuncId, path: &[PathEdge]) -> Vec<JsonEdge> {
    path.iter()
        .enumerate()
        .map(|(i, edge)| JsonEdge {
            initial: if i == 0 {
                program.pretty_name(root, true)
            } else {
                String::new()
            },
            kind: edge.kind.as_str(),
            position: JsonPosition::from_position(&edge.position),
            callee: program.pretty_name(edge.callee, true),
        })
        .collect()
}

/// Default `-whylive` text: the root on its own header line, then one
/// line per edge.
pub fn render_edges_text(edges: &[JsonEdge]) -> String {
    let mut out = String::new();
    for edge in edges {
        if !edge.initial.is_empty() {
            out.push_str(&format!("{:19}{}\n", "", edge.initial));
        }
        out.push_str(&format!(
            "{:>8}@L{:04} --> {}\n",
            edge.kind, edge.position.line, edge.callee
        ));
    }
    out
}

/// Turn over-export verdicts into output records.
pub fn exports_to_json(exports: &[OverExport]) -> Vec<JsonExport> {
    exports
        .iter()
        .map(|e| JsonExport {
            name: e.name.clone(),
            kind: e.kind,
            position: ExportPosition {
                file: display_path(&e.position.file),
                line: e.position.line,
                col: e.position.col,
            },
            package: e.pkg_path.clone(),
        })
        .collect()
}

/// Default `overexported` text: grouped by package, one identifier per
/// line. Input is already in package/file/line order.
pub fn render_exports_text(exports: &[JsonExport]) -> String {
    if exports.is_empty() {
        return "No over-exported identifiers found.\n".to_string();
    }
    let mut out = String::new();
    let mut current_pkg: Option<&str> = None;
    for e in exports {
        if current_pkg != Some(e.package.as_str()) {
            current_pkg = Some(&e.package);
            out.push_str(&format!("\n{}:\n", e.package));
            out.push_str("  Can be unexported (only used internally):\n");
        }
        out.push_str(&format!(
            "    {} ({}) ./{}:{}\n",
            e.name, e.kind, e.position.file, e.position.line
        ));
    }
    out
}
