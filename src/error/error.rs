use super::Context;
use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;

/// An error surfacing while handling an input file or a sequencing run
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CustomError {
    /// The level of the error, defining how it should be handled
    warning: bool,
    /// A short description of the error, generally used as title line
    short_description: String,
    /// A longer description of the error, presented below the context to give more information and helpful feedback
    long_description: String,
    /// The context, in the most general sense this produces output which leads the user to the right place in the code or file
    context: Context,
}

impl CustomError {
    /// Create a new `CustomError`
    ///
    /// ## Arguments
    /// * `short_desc` - A short description of the error, generally used as title line
    /// * `long_desc` -  A longer description of the error, presented below the context to give more information and helpful feedback
    /// * `context` - The context, in the most general sense this produces output which leads the user to the right place in the code or file
    pub fn error(
        short_desc: impl std::string::ToString,
        long_desc: impl std::string::ToString,
        context: Context,
    ) -> Self {
        Self {
            warning: false,
            short_description: short_desc.to_string(),
            long_description: long_desc.to_string(),
            context,
        }
    }

    /// Create a new warning-level `CustomError`, used for failures that only
    /// terminate the current spectrum
    pub fn warning(
        short_desc: impl std::string::ToString,
        long_desc: impl std::string::ToString,
        context: Context,
    ) -> Self {
        Self {
            warning: true,
            short_description: short_desc.to_string(),
            long_description: long_desc.to_string(),
            context,
        }
    }

    /// The level of the error
    pub const fn level(&self) -> &str {
        if self.warning {
            "warning"
        } else {
            "error"
        }
    }

    /// Tests if this error is a warning
    pub const fn is_warning(&self) -> bool {
        self.warning
    }

    /// Gives the short description or title for this error
    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    /// Gives the long description for this error
    pub fn long_description(&self) -> &str {
        &self.long_description
    }

    /// Create a copy of the error with a new long description
    pub fn with_long_description(&self, long_desc: impl std::string::ToString) -> Self {
        Self {
            long_description: long_desc.to_string(),
            ..self.clone()
        }
    }

    /// Create a copy of the error with a new context
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    /// Gives the context for this error
    pub const fn context(&self) -> &Context {
        &self.context
    }
}

impl fmt::Debug for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}\n{}\n",
            self.level(),
            self.short_description,
            self.context,
            self.long_description
        )
    }
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}\n{}\n",
            self.level(),
            self.short_description,
            self.context,
            self.long_description
        )
    }
}

impl error::Error for CustomError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_empty_error() {
        let a = CustomError::error("test", "test", Context::none());
        assert_eq!(format!("{a}"), "error: test\ntest\n");
        assert!(!a.is_warning());
    }

    #[test]
    fn create_full_line_error() {
        let a = CustomError::warning("test", "test", Context::full_line(1, "testing line"));
        assert_eq!(
            format!("{a}"),
            "warning: test\n  ╷\n1 │ testing line\n  ╵\ntest\n"
        );
        assert!(a.is_warning());
    }
}
