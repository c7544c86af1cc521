//! Comparison operators understood by the expression builder.

use std::fmt;
use std::str::FromStr;

use crate::error::DynaqueryError;

/// The five comparisons a criterion or filter can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `=`
    Equal,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
}

impl ComparisonOperator {
    /// Returns the operator token as written in an expression.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ComparisonOperator {
    type Err = DynaqueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Self::Equal),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessOrEqual),
            other => Err(DynaqueryError::UnknownOperator(other.to_owned())),
        }
    }
}
