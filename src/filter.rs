//! The `-filter` option: a regular expression on package paths.
//!
//! The sentinel value `<module>` expands to an anchored alternation over
//! the module paths of the initially-loaded packages, so reports default to
//! the user's own code. An empty expression (or an empty expansion)
//! disables filtering.

use crate::error::{Error, Result};
use crate::ir::{PkgId, Program};
use regex::Regex;

pub const MODULE_SENTINEL: &str = "<module>";

/// Compiled package filter.
#[derive(Debug)]
pub struct PackageFilter {
    re: Option<Regex>,
}

impl PackageFilter {
    /// Compile `expr`, expanding the `<module>` sentinel against the
    /// modules of the initial packages.
    pub fn new(expr: &str, program: &Program, initial: &[PkgId]) -> Result<Self> {
        let pattern = if expr == MODULE_SENTINEL {
            let mut modules: Vec<String> = Vec::new();
            for &pkg in initial {
                if let Some(module) = &program.package(pkg).module {
                    if !module.is_empty() && !modules.contains(module) {
                        modules.push(module.clone());
                    }
                }
            }
            if modules.is_empty() {
                String::new()
            } else {
                let escaped: Vec<String> =
                    modules.iter().map(|m| regex::escape(m)).collect();
                format!("^({})\\b", escaped.join("|"))
            }
        } else {
            expr.to_string()
        };

        if pattern.is_empty() {
            return Ok(Self { re: None });
        }
        let re = Regex::new(&pattern)
            .map_err(|e| Error::Usage(format!("invalid -filter pattern: {e}")))?;
        Ok(Self { re: Some(re) })
    }

    /// A filter that matches every package.
    pub fn disabled() -> Self {
        Self { re: None }
    }

    pub fn matches(&self, pkg_path: &str) -> bool {
        self.re.as_ref().map(|re| re.is_match(pkg_path)).unwrap_or(true)
    }
}
