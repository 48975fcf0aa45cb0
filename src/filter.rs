//! Row predicates written as text, e.g. `Model Year >= 2020` or
//! `Electric Vehicle Type contains BEV`.
//!
//! Column names are the dataset headers. The operand of a numeric column is
//! parsed once, up front, so a typo fails before any row is scanned.

use std::cmp::Ordering;

use anyhow::{Context, Result, anyhow};

use crate::{dataset::Record, schema::Column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(u32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: Column,
    pub operator: ComparisonOperator,
    pub operand: Operand,
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

pub fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (needle, op) in [
        (" contains ", ComparisonOperator::Contains),
        (" startswith ", ComparisonOperator::StartsWith),
        (" endswith ", ComparisonOperator::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            let column = trimmed[..idx].parse::<Column>()?;
            let value = unquote(trimmed[idx + needle.len()..].trim());
            return Ok(FilterCondition {
                column,
                operator: op,
                operand: Operand::Text(value.to_string()),
            });
        }
    }

    for (needle, op) in [
        ("!=", ComparisonOperator::NotEq),
        (">=", ComparisonOperator::Ge),
        ("<=", ComparisonOperator::Le),
        ("=", ComparisonOperator::Eq),
        (">", ComparisonOperator::Gt),
        ("<", ComparisonOperator::Lt),
    ] {
        if let Some(idx) = trimmed.find(needle) {
            let column = trimmed[..idx].parse::<Column>()?;
            let value = unquote(trimmed[idx + needle.len()..].trim());
            let operand = if column.is_numeric() {
                Operand::Number(
                    value
                        .parse()
                        .with_context(|| format!("'{value}' is not a number for '{column}'"))?,
                )
            } else {
                Operand::Text(value.to_string())
            };
            return Ok(FilterCondition {
                column,
                operator: op,
                operand,
            });
        }
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

impl FilterCondition {
    pub fn matches(&self, record: &Record) -> bool {
        use ComparisonOperator::*;
        let text = record.text(self.column);
        match (self.operator, &self.operand) {
            (Contains, Operand::Text(needle)) => text.contains(needle.as_str()),
            (StartsWith, Operand::Text(needle)) => text.starts_with(needle.as_str()),
            (EndsWith, Operand::Text(needle)) => text.ends_with(needle.as_str()),
            (Contains | StartsWith | EndsWith, Operand::Number(_)) => false,
            (op, operand) => {
                let ordering = match operand {
                    Operand::Number(rhs) => record.number(self.column).map(|lhs| lhs.cmp(rhs)),
                    Operand::Text(rhs) => Some(text.cmp(rhs.as_str())),
                };
                let Some(ordering) = ordering else {
                    return false;
                };
                match op {
                    Eq => ordering == Ordering::Equal,
                    NotEq => ordering != Ordering::Equal,
                    Gt => ordering == Ordering::Greater,
                    Ge => ordering != Ordering::Less,
                    Lt => ordering == Ordering::Less,
                    Le => ordering != Ordering::Greater,
                    Contains | StartsWith | EndsWith => unreachable!(),
                }
            }
        }
    }
}

/// True when every condition holds; an empty list matches all rows.
pub fn matches_all(conditions: &[FilterCondition], record: &Record) -> bool {
    conditions.iter().all(|condition| condition.matches(record))
}
