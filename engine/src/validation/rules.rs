//! Rule-expression validator.
//!
//! Each field may carry a comma-separated rule expression:
//!
//! | Rule | Meaning |
//! |---|---|
//! | `required` | value must be present and non-blank |
//! | `gt=N`, `gte=N`, `lt=N`, `lte=N` | numeric bound, or character count for text |
//! | `min=N`, `max=N` | aliases of `gte` and `lte` |
//! | `len=N` | text must have exactly `N` characters |
//! | `oneof=a b c` | value must be one of the space-separated words |
//! | `email` | text must look like an e-mail address |
//! | `regex=PATTERN` | text must match; must be the last rule since the pattern may contain commas |
//!
//! Absent and blank values are only checked by `required`.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use super::{ValidationFailure, Validator};
use crate::cache::DescriptorRegistry;
use crate::error::ConfigError;
use crate::schema::{CellValue, FieldDescriptor, FieldKind, Record, TypeDescriptor};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Bound {
    fn holds(self, actual: f64, limit: f64) -> bool {
        match self {
            Bound::Gt => actual > limit,
            Bound::Gte => actual >= limit,
            Bound::Lt => actual < limit,
            Bound::Lte => actual <= limit,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Bound::Gt => "greater than",
            Bound::Gte => "at least",
            Bound::Lt => "less than",
            Bound::Lte => "at most",
        }
    }
}

#[derive(Debug, Clone)]
enum Rule {
    Required,
    Compare { tag: String, bound: Bound, limit: f64 },
    Len(usize),
    OneOf(Vec<String>),
    Email(Regex),
    Pattern(Regex),
}

impl Rule {
    fn tag(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Compare { tag, .. } => tag,
            Rule::Len(_) => "len",
            Rule::OneOf(_) => "oneof",
            Rule::Email(_) => "email",
            Rule::Pattern(_) => "regex",
        }
    }
}

struct FieldRules {
    field: usize,
    rules: Vec<Rule>,
}

/// Evaluates the rule expressions attached to a descriptor's fields.
pub struct RuleValidator<R> {
    descriptor: Arc<TypeDescriptor<R>>,
    fields: Vec<FieldRules>,
}

impl<R: Record> RuleValidator<R> {
    /// Validator for a record type, using the global descriptor registry.
    pub fn for_record() -> Result<Self, ConfigError> {
        Self::new(DescriptorRegistry::global().descriptor::<R>())
    }
}

impl<R> RuleValidator<R> {
    /// Parse every field's rule expression up front.
    pub fn new(descriptor: Arc<TypeDescriptor<R>>) -> Result<Self, ConfigError> {
        let mut fields = Vec::new();
        for (idx, field) in descriptor.fields().iter().enumerate() {
            let Some(expr) = field.rule_expr() else {
                continue;
            };
            let rules = parse_rules(field, expr)?;
            if !rules.is_empty() {
                fields.push(FieldRules { field: idx, rules });
            }
        }

        Ok(Self { descriptor, fields })
    }

    /// Number of fields that carry at least one rule.
    pub fn rule_count(&self) -> usize {
        self.fields.iter().map(|f| f.rules.len()).sum()
    }
}

impl<R> Validator<R> for RuleValidator<R> {
    fn validate(&self, record: &R) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        for entry in &self.fields {
            let Some(field) = self.descriptor.field(entry.field) else {
                continue;
            };
            let value = field.get(record);
            for rule in &entry.rules {
                if let Some(message) = check(rule, &value) {
                    failures.push(ValidationFailure::new(field.name(), rule.tag(), message));
                }
            }
        }
        failures
    }
}

impl<R> fmt::Debug for RuleValidator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleValidator")
            .field("type_name", &self.descriptor.type_name())
            .field("rules", &self.rule_count())
            .finish()
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_rules<R>(field: &FieldDescriptor<R>, expr: &str) -> Result<Vec<Rule>, ConfigError> {
    let invalid = |rule: &str, message: &str| ConfigError::InvalidRule {
        field: field.name().to_string(),
        rule: rule.to_string(),
        message: message.to_string(),
    };

    let mut rules = Vec::new();
    let mut rest = expr.trim();
    while !rest.is_empty() {
        if let Some(pattern) = rest.strip_prefix("regex=") {
            let regex = Regex::new(pattern).map_err(|e| invalid("regex", &e.to_string()))?;
            rules.push(Rule::Pattern(regex));
            break;
        }

        let (token, tail) = match rest.split_once(',') {
            Some((token, tail)) => (token.trim(), tail.trim_start()),
            None => (rest, ""),
        };
        rest = tail;
        if token.is_empty() {
            continue;
        }

        let (tag, arg) = match token.split_once('=') {
            Some((tag, arg)) => (tag.trim(), Some(arg.trim())),
            None => (token, None),
        };

        let rule = match (tag, arg) {
            ("required", None) => Rule::Required,
            ("gt" | "gte" | "lt" | "lte" | "min" | "max", Some(arg)) => {
                let bound = match tag {
                    "gt" => Bound::Gt,
                    "gte" | "min" => Bound::Gte,
                    "lt" => Bound::Lt,
                    _ => Bound::Lte,
                };
                let limit = match field.kind() {
                    FieldKind::Int | FieldKind::UInt | FieldKind::Float => arg.parse::<f64>().ok(),
                    FieldKind::Text => arg.parse::<usize>().ok().map(|n| n as f64),
                    FieldKind::Bool | FieldKind::DateTime => {
                        return Err(invalid(tag, &format!("not supported for {} fields", field.kind())))
                    }
                }
                .ok_or_else(|| invalid(tag, &format!("bad limit {:?}", arg)))?;
                Rule::Compare {
                    tag: tag.to_string(),
                    bound,
                    limit,
                }
            }
            ("len", Some(arg)) => {
                if field.kind() != FieldKind::Text {
                    return Err(invalid("len", "only supported for text fields"));
                }
                let n = arg
                    .parse::<usize>()
                    .map_err(|_| invalid("len", &format!("bad length {:?}", arg)))?;
                Rule::Len(n)
            }
            ("oneof", Some(arg)) => {
                let words: Vec<String> = arg.split_whitespace().map(str::to_string).collect();
                if words.is_empty() {
                    return Err(invalid("oneof", "no values given"));
                }
                Rule::OneOf(words)
            }
            ("email", None) => {
                if field.kind() != FieldKind::Text {
                    return Err(invalid("email", "only supported for text fields"));
                }
                Rule::Email(Regex::new(EMAIL_PATTERN).map_err(|e| invalid("email", &e.to_string()))?)
            }
            (tag, _) => return Err(invalid(tag, "unknown rule or missing argument")),
        };
        rules.push(rule);
    }

    Ok(rules)
}

// =============================================================================
// Evaluation
// =============================================================================

fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Absent => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Failure message, or `None` when the rule holds.
fn check(rule: &Rule, value: &CellValue) -> Option<String> {
    if is_blank(value) {
        return matches!(rule, Rule::Required).then(|| "value is required".to_string());
    }

    match rule {
        Rule::Required => None,
        Rule::Compare { bound, limit, .. } => match value {
            CellValue::Text(s) => {
                let count = s.chars().count() as f64;
                (!bound.holds(count, *limit))
                    .then(|| format!("length must be {} {}", bound.phrase(), limit))
            }
            other => {
                let actual = other.as_f64()?;
                (!bound.holds(actual, *limit)).then(|| format!("must be {} {}", bound.phrase(), limit))
            }
        },
        Rule::Len(n) => {
            let count = value.to_string().chars().count();
            (count != *n).then(|| format!("length must be {} (got {})", n, count))
        }
        Rule::OneOf(words) => {
            let text = value.to_string();
            (!words.iter().any(|w| *w == text)).then(|| format!("must be one of [{}]", words.join(" ")))
        }
        Rule::Email(regex) => {
            (!regex.is_match(&value.to_string())).then(|| "must be a valid email address".to_string())
        }
        Rule::Pattern(regex) => {
            (!regex.is_match(&value.to_string())).then(|| format!("must match {}", regex.as_str()))
        }
    }
}
