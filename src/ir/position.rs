use serde::{Deserialize, Serialize};

/// Location of a declaration or call site in source code.
///
/// Two functions sharing a position are the same source declaration even
/// when the IR holds distinct nodes for them (test variants and generic
/// instantiations cause this duplication), so positions are the canonical
/// identity for reachability verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    /// 1-indexed line; 0 means "no position".
    pub line: u32,
    /// 1-indexed column.
    pub col: u32,
}

impl Position {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }

    /// The zero position of synthetic functions.
    pub fn none() -> Self {
        Self {
            file: String::new(),
            line: 0,
            col: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let pos = Position::new("lib/lib.src", 12, 6);
        assert_eq!(pos.to_string(), "lib/lib.src:12:6");
    }

    #[test]
    fn test_none_is_invalid() {
        assert!(!Position::none().is_valid());
        assert!(Position::new("f.src", 1, 1).is_valid());
    }
}
