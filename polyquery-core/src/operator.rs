//! Comparison operators and conversions

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::Serialize;

use crate::Error;

/// Binary comparison operator used by `Condition::Compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
}

impl Operator {
    /// Get the SQL representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::NotEq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            other => Err(Error::invalid_query(format!(
                "Unknown comparison operator '{other}'"
            ))),
        }
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::Eq;
    pub const NEQ: Operator = Operator::NotEq;
    pub const GT: Operator = Operator::Gt;
    pub const LT: Operator = Operator::Lt;
    pub const GTE: Operator = Operator::Gte;
    pub const LTE: Operator = Operator::Lte;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_constants() {
        assert_eq!(op::GT.as_str(), ">");
        assert_eq!(op::LT.as_str(), "<");
        assert_eq!(op::EQ.as_str(), "=");
        assert_eq!(op::NEQ.as_str(), "!=");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Operator::Gte), ">=");
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(">".parse::<Operator>().unwrap(), Operator::Gt);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::Lte);
    }

    #[test]
    fn test_invalid_string_conversion() {
        let err = "LIKE".parse::<Operator>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid query: Unknown comparison operator 'LIKE'");
    }
}
