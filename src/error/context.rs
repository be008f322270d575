use serde::{Deserialize, Serialize};
use std::fmt;

/// A context to an error, which leads the user to the right place in the input file
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub enum Context {
    /// No context available
    #[default]
    None,
    /// A free-standing snippet, such as a file name or a key
    Show {
        /// The snippet
        line: String,
    },
    /// A full line from a file
    FullLine {
        /// The line number (one-based)
        line_number: usize,
        /// The line itself
        line: String,
    },
    /// A line from a file with a highlighted region
    Line {
        /// The line number (one-based)
        line_number: usize,
        /// The line itself
        line: String,
        /// The first highlighted column (zero-based)
        offset: usize,
        /// The number of highlighted columns
        length: usize,
    },
}

impl Context {
    /// Create a context without any content
    pub const fn none() -> Self {
        Self::None
    }

    /// Create a context that only shows a snippet, such as a file name
    pub fn show(line: impl std::string::ToString) -> Self {
        Self::Show {
            line: line.to_string(),
        }
    }

    /// Create a context for a full line of an input file
    pub fn full_line(line_number: usize, line: impl std::string::ToString) -> Self {
        Self::FullLine {
            line_number,
            line: line.to_string(),
        }
    }

    /// Create a context for a region within a line of an input file
    pub fn line(
        line_number: usize,
        line: impl std::string::ToString,
        offset: usize,
        length: usize,
    ) -> Self {
        Self::Line {
            line_number,
            line: line.to_string(),
            offset,
            length,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Show { line } => write!(f, "\n  ╷\n  │ {line}\n  ╵"),
            Self::FullLine { line_number, line } => {
                write!(f, "\n  ╷\n{line_number} │ {line}\n  ╵")
            }
            Self::Line {
                line_number,
                line,
                offset,
                length,
            } => {
                let pad = line_number.to_string().len();
                write!(
                    f,
                    "\n{blank} ╷\n{line_number} │ {line}\n{blank} · {space}{marker}\n{blank} ╵",
                    blank = " ".repeat(pad),
                    space = " ".repeat(*offset),
                    marker = "─".repeat((*length).max(1)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_full_line() {
        let context = Context::full_line(1, "testing line");
        assert_eq!(format!("{context}"), "\n  ╷\n1 │ testing line\n  ╵");
    }

    #[test]
    fn render_highlight() {
        let context = Context::line(3, "key = value", 6, 5);
        let rendered = format!("{context}");
        assert!(rendered.contains("3 │ key = value"));
        assert!(rendered.contains("─────"));
    }
}
