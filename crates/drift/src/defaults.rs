//! Default-value rendering and comparison.
//!
//! Rendering is dialect-neutral: booleans become `TRUE`/`FALSE` (both engines
//! accept the keywords), string-like and enum defaults are quoted, everything
//! else is emitted as written.
//!
//! Catalogs report defaults in their own spelling (`'draft'::character varying`,
//! `draft`, `b'1'`, `0.00`), so comparison goes through [`normalize_default`].

use crate::dialect::escape_literal;
use crate::model::{DefaultValue, LogicalType};

/// Render a declared default as a SQL expression.
pub fn render_default(logical: &LogicalType, default: &DefaultValue) -> String {
    match default {
        DefaultValue::Bool(value) => bool_keyword(*value).to_string(),
        DefaultValue::Expression(sql) => sql.clone(),
        DefaultValue::Literal(value) => {
            if matches!(logical, LogicalType::Boolean) {
                if let Some(value) = parse_bool(value) {
                    return bool_keyword(value).to_string();
                }
            }
            if logical.quotes_default() {
                escape_literal(value)
            } else {
                value.clone()
            }
        }
    }
}

fn bool_keyword(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" | "on" => Some(true),
        "false" | "0" | "f" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Reduce a default expression to a comparable form, or `None` for "no default".
pub fn normalize_default(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }

    value = strip_cast(value);
    while value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        value = value[1..value.len() - 1].trim();
    }
    if value.eq_ignore_ascii_case("null") {
        return None;
    }

    // MySQL reports BIT defaults as b'0' / b'1'.
    if value.eq_ignore_ascii_case("b'1'") {
        return Some("true".to_string());
    }
    if value.eq_ignore_ascii_case("b'0'") {
        return Some("false".to_string());
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Some(value[1..value.len() - 1].replace("''", "'"));
    }

    Some(value.strip_suffix("()").unwrap_or(value).to_string())
}

/// Drop a trailing Postgres `::type` cast that sits outside any literal.
fn strip_cast(value: &str) -> &str {
    let mut in_literal = false;
    for (idx, c) in value.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ':' if !in_literal && value[idx..].starts_with("::") => {
                return value[..idx].trim_end();
            }
            _ => {}
        }
    }
    value
}

/// Whether a rendered declared default and a catalog default mean the same thing
/// for a column of type `logical`.
///
/// Quoted literals compare exactly once unquoted. Numeric types compare by
/// value and booleans through their aliases (`TINYINT(1)` reports `0` / `1`).
/// Anything else, such as `CURRENT_TIMESTAMP`, compares case-insensitively.
pub fn defaults_match(logical: &LogicalType, declared: Option<&str>, actual: Option<&str>) -> bool {
    let quoted = declared.is_some_and(is_quoted_literal);
    let declared = declared.and_then(normalize_default);
    let actual = actual.and_then(normalize_default);
    let (a, b) = match (declared, actual) {
        (None, None) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    if quoted && logical.quotes_default() {
        return a == b;
    }
    if logical.is_numeric() {
        if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
            return x == y;
        }
    }
    if matches!(logical, LogicalType::Boolean) {
        if let (Some(x), Some(y)) = (parse_bool(&a), parse_bool(&b)) {
            return x == y;
        }
    }
    a.eq_ignore_ascii_case(&b)
}

fn is_quoted_literal(raw: &str) -> bool {
    strip_cast(raw.trim()).trim_start_matches('(').starts_with('\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn booleans_render_as_keywords() {
        assert_eq!(render_default(&LogicalType::Boolean, &DefaultValue::Bool(true)), "TRUE");
        assert_eq!(
            render_default(&LogicalType::Boolean, &DefaultValue::literal("0")),
            "FALSE"
        );
    }

    #[test]
    fn string_like_defaults_are_quoted() {
        assert_eq!(
            render_default(&LogicalType::Enum, &DefaultValue::literal("draft")),
            "'draft'"
        );
        assert_eq!(
            render_default(&LogicalType::String, &DefaultValue::literal("it's")),
            "'it''s'"
        );
        assert_eq!(
            render_default(&LogicalType::Json, &DefaultValue::literal("{}")),
            "'{}'"
        );
    }

    #[test]
    fn other_defaults_are_verbatim() {
        assert_eq!(render_default(&LogicalType::Integer, &DefaultValue::literal("0")), "0");
        assert_eq!(
            render_default(
                &LogicalType::Timestamp,
                &DefaultValue::expression("CURRENT_TIMESTAMP")
            ),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn catalog_spellings_normalize() {
        assert_eq!(
            normalize_default("'draft'::character varying").as_deref(),
            Some("draft")
        );
        assert_eq!(normalize_default("draft").as_deref(), Some("draft"));
        assert_eq!(normalize_default("b'1'").as_deref(), Some("true"));
        assert_eq!(normalize_default("NULL"), None);
        assert_eq!(normalize_default("NULL::character varying"), None);
        assert_eq!(normalize_default("current_timestamp()").as_deref(), Some("current_timestamp"));
        assert_eq!(normalize_default("'a::b'").as_deref(), Some("a::b"));
    }

    #[test]
    fn matching_defaults() {
        let string = LogicalType::String;
        assert!(defaults_match(&LogicalType::Enum, Some("'draft'"), Some("'draft'::character varying")));
        assert!(defaults_match(&LogicalType::Enum, Some("'draft'"), Some("draft")));
        assert!(defaults_match(&LogicalType::Boolean, Some("TRUE"), Some("1")));
        assert!(defaults_match(&LogicalType::Decimal, Some("0"), Some("0.00")));
        assert!(defaults_match(
            &LogicalType::Timestamp,
            Some("CURRENT_TIMESTAMP"),
            Some("current_timestamp()")
        ));
        assert!(defaults_match(&string, None, None));
        assert!(defaults_match(&string, None, Some("NULL")));
        assert!(!defaults_match(&string, Some("'draft'"), None));
        assert!(!defaults_match(&string, Some("'draft'"), Some("'published'")));
    }

    #[test]
    fn string_defaults_compare_exactly() {
        let string = LogicalType::String;
        assert!(!defaults_match(&string, Some("'007'"), Some("'7'")));
        assert!(!defaults_match(&string, Some("'007'"), Some("7")));
        assert!(!defaults_match(&string, Some("'yes'"), Some("'on'")));
        assert!(!defaults_match(&LogicalType::Enum, Some("'Draft'"), Some("'draft'")));
        assert!(defaults_match(&string, Some("'007'"), Some("007")));
    }

    #[test]
    fn numeric_and_boolean_equivalence_is_type_bound() {
        assert!(defaults_match(&LogicalType::Integer, Some("7"), Some("'7'::integer")));
        assert!(!defaults_match(&LogicalType::Integer, Some("1"), Some("true")));
        assert!(defaults_match(&LogicalType::Boolean, Some("FALSE"), Some("b'0'")));
        assert!(!defaults_match(&LogicalType::Text, Some("yes"), Some("on")));
    }

    proptest! {
        #[test]
        fn quoted_literals_normalize_to_their_content(value in "[a-z' ]{0,12}") {
            prop_assert_eq!(normalize_default(&escape_literal(&value)), Some(value.clone()));
        }
    }
}
