//! Formula error codes.
//!
//! Errors in a spreadsheet are *values*, not exceptions: a cell that fails
//! to evaluate still produces a well-typed [`ErrorCode`] that propagates
//! through arithmetic, comparisons, and downstream references exactly like
//! any other scalar. `Display` renders the wire-identical token Excel shows
//! in a cell (`#DIV/0!`, `#N/A`, ...).

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Null,
    Div,
    Value,
    Ref,
    Name,
    Num,
    Na,
    GettingData,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::Null,
        ErrorCode::Div,
        ErrorCode::Value,
        ErrorCode::Ref,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::Na,
        ErrorCode::GettingData,
    ];

    /// Parse a literal error token (`"#REF!"`, ...). Unknown tokens are not
    /// errors at this layer; callers treat them as ordinary text.
    pub fn parse(token: &str) -> Option<ErrorCode> {
        Some(match token {
            "#NULL!" => ErrorCode::Null,
            "#DIV/0!" => ErrorCode::Div,
            "#VALUE!" => ErrorCode::Value,
            "#REF!" => ErrorCode::Ref,
            "#NAME?" => ErrorCode::Name,
            "#NUM!" => ErrorCode::Num,
            "#N/A" => ErrorCode::Na,
            "#GETTING_DATA" => ErrorCode::GettingData,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Na => "#N/A",
            ErrorCode::GettingData => "#GETTING_DATA",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ErrorCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_token() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn unknown_token_is_none() {
        assert_eq!(ErrorCode::parse("#WEIRD!"), None);
    }
}
