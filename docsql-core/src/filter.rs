//! Filters: which documents a read touches, and in what order.
//!
//! A filter is built either through the fluent API ([`Filter::where_`] and
//! friends) or parsed from JSON query text ([`Filter::parse`]). Both produce
//! the same structure: an ordered list of logic expressions plus ordering
//! and pagination settings, which the collection compiles into join SQL.

use serde_json::Value;

use crate::document::FIELD_ORIGIN;
use crate::error::{DocSqlError, DocSqlResult};

/// Which index table population a filter runs against.
///
/// A filter with no comparisons scans the one-registry-entry-per-document
/// rows; a filter with at least one comparison scans the per-property value
/// rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Registry,
    Value,
}

impl IndexType {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            IndexType::Registry => "registry",
            IndexType::Value => "value",
        }
    }
}

/// How an expression combines with the predicates before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    Where,
    And,
    Or,
}

/// A comparison operator between a property and a comparand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl Comparison {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Gt => ">",
            Comparison::GtEq => ">=",
            Comparison::Lt => "<",
            Comparison::LtEq => "<=",
        }
    }
}

// Two-char prefixes first so ">=" is not read as ">" followed by "=...".
const OPERATOR_PREFIXES: [(&str, Comparison); 5] = [
    (">=", Comparison::GtEq),
    ("<=", Comparison::LtEq),
    ("<>", Comparison::Ne),
    (">", Comparison::Gt),
    ("<", Comparison::Lt),
];

/// One entry in a filter: a property, how it joins the predicates before
/// it, and optionally a comparison against a comparand.
///
/// An expression without a comparison contributes a join and a grouping
/// column but no predicate; [`Filter::order_by`] uses this to make a payload
/// property available for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicExpression {
    pub(crate) op: LogicOp,
    pub(crate) prop: String,
    pub(crate) comparison: Option<Comparison>,
    pub(crate) value: Option<Value>,
}

/// Defines which documents a find or count touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub(crate) index_type: IndexType,
    pub(crate) expressions: Vec<LogicExpression>,
    pub(crate) order_by: String,
    pub(crate) reverse: bool,
    pub(crate) offset: i64,
    pub(crate) length: i64,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter {
    /// Length value meaning "no limit".
    pub const UNLIMITED: i64 = -1;

    /// Page size applied when the caller sets none.
    pub const DEFAULT_LENGTH: i64 = 10;

    /// Forces which index population the filter scans. Rarely needed: adding
    /// any comparison already switches to the value index.
    pub fn index_type(&mut self, index_type: IndexType) -> &mut Self {
        self.index_type = index_type;
        self
    }

    /// A filter matching every document, newest origin first, first ten.
    pub fn new() -> Self {
        Self {
            index_type: IndexType::Registry,
            expressions: Vec::new(),
            order_by: FIELD_ORIGIN.to_string(),
            reverse: true,
            offset: 0,
            length: Self::DEFAULT_LENGTH,
        }
    }

    fn push(&mut self, op: LogicOp, prop: impl Into<String>) -> Condition<'_> {
        self.expressions.push(LogicExpression {
            op,
            prop: prop.into(),
            comparison: None,
            value: None,
        });
        Condition { filter: self }
    }

    /// Opens the filter with a predicate on a property.
    pub fn where_(&mut self, prop: impl Into<String>) -> Condition<'_> {
        self.push(LogicOp::Where, prop)
    }

    /// Narrows the match: documents must also satisfy this predicate.
    pub fn and(&mut self, prop: impl Into<String>) -> Condition<'_> {
        self.push(LogicOp::And, prop)
    }

    /// Widens the match: documents may instead satisfy this predicate.
    pub fn or(&mut self, prop: impl Into<String>) -> Condition<'_> {
        self.push(LogicOp::Or, prop)
    }

    /// Orders results by a property or system field.
    ///
    /// A payload property gets a predicate-free expression so its index
    /// column participates in the result shape.
    pub fn order_by(&mut self, prop: impl Into<String>) -> &mut Self {
        let prop = prop.into();
        let already_present = self.expressions.iter().any(|expr| expr.prop == prop);
        if !already_present {
            self.expressions.push(LogicExpression {
                op: LogicOp::And,
                prop: prop.clone(),
                comparison: None,
                value: None,
            });
        }
        self.order_by = prop;
        self
    }

    /// Sets descending (`true`, the default) or ascending order.
    pub fn reverse(&mut self, reverse: bool) -> &mut Self {
        self.reverse = reverse;
        self
    }

    /// Skips the first `offset` matches.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Caps the number of matches returned; [`Filter::UNLIMITED`] lifts the
    /// cap.
    pub fn length(&mut self, length: i64) -> &mut Self {
        self.length = length;
        self
    }

    /// Parses JSON query text into a filter.
    ///
    /// The text is one object (a conjunction) or an array of objects (a
    /// disjunction of conjunctions). Within each object, position decides
    /// the logic op and the reserved keys `length`, `offset`, `order` and
    /// `reverse` configure the filter instead of matching; reserved keys
    /// occupy a position like any other key. String values may carry a
    /// leading comparison operator (`>=`, `<=`, `<>`, `>`, `<`).
    pub fn parse(text: &str) -> DocSqlResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| DocSqlError::FilterParse(err.to_string()))?;
        Self::from_value(&value)
    }

    /// Builds a filter from an already-decoded JSON query value, with the
    /// same rules as [`Filter::parse`].
    pub fn from_value(value: &Value) -> DocSqlResult<Self> {
        let groups: Vec<&Value> = match value {
            Value::Object(_) => vec![value],
            Value::Array(items) if !items.is_empty() => items.iter().collect(),
            _ => {
                return Err(DocSqlError::FilterParse(
                    "query text must be a JSON object or a non-empty array of objects"
                        .to_string(),
                ));
            }
        };

        let mut filter = Filter::new();
        for (group_index, group) in groups.iter().enumerate() {
            let Value::Object(entries) = group else {
                return Err(DocSqlError::FilterParse(
                    "each query group must be a JSON object".to_string(),
                ));
            };
            for (slot, (key, entry)) in entries.iter().enumerate() {
                if filter.apply_reserved(key, entry)? {
                    continue;
                }
                let op = if slot == 0 {
                    if group_index == 0 { LogicOp::Where } else { LogicOp::Or }
                } else {
                    LogicOp::And
                };
                match entry {
                    Value::Array(items) => {
                        for item in items {
                            filter.push_parsed(op, key, item)?;
                        }
                    }
                    other => filter.push_parsed(op, key, other)?,
                }
            }
        }

        if filter.expressions.iter().any(|expr| expr.comparison.is_some()) {
            filter.index_type = IndexType::Value;
        }
        Ok(filter)
    }

    /// Applies a reserved key, returning false when the key is an ordinary
    /// property.
    fn apply_reserved(&mut self, key: &str, value: &Value) -> DocSqlResult<bool> {
        match key {
            "length" => {
                self.length = parse_integer(key, value)?;
            }
            "offset" => {
                self.offset = parse_integer(key, value)?;
            }
            "order" => match value {
                Value::String(prop) => {
                    self.order_by = prop.clone();
                }
                other => {
                    return Err(DocSqlError::FilterParse(format!(
                        "reserved key `order` takes a string, got {other}"
                    )));
                }
            },
            "reverse" => match value {
                Value::Bool(reverse) => {
                    self.reverse = *reverse;
                }
                other => {
                    return Err(DocSqlError::FilterParse(format!(
                        "reserved key `reverse` takes a boolean, got {other}"
                    )));
                }
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn push_parsed(&mut self, op: LogicOp, prop: &str, value: &Value) -> DocSqlResult<()> {
        let (comparison, comparand) = match value {
            Value::String(text) => split_operator(text),
            Value::Null | Value::Bool(_) | Value::Number(_) => {
                (Comparison::Eq, value.clone())
            }
            other => {
                return Err(DocSqlError::FilterParse(format!(
                    "property `{prop}` compares against a non-scalar value: {other}"
                )));
            }
        };
        self.expressions.push(LogicExpression {
            op,
            prop: prop.to_string(),
            comparison: Some(comparison),
            value: Some(comparand),
        });
        Ok(())
    }
}

fn parse_integer(key: &str, value: &Value) -> DocSqlResult<i64> {
    match value {
        Value::Number(number) if number.is_i64() => Ok(number.as_i64().unwrap_or_default()),
        other => Err(DocSqlError::FilterParse(format!(
            "reserved key `{key}` takes an integer, got {other}"
        ))),
    }
}

/// Splits a leading comparison operator off a string comparand. A numeric
/// remainder becomes an integer comparand so the compiled predicate compares
/// numerically.
fn split_operator(text: &str) -> (Comparison, Value) {
    for (prefix, comparison) in OPERATOR_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            let rest = rest.trim_start();
            if let Ok(number) = rest.parse::<i64>() {
                return (comparison, Value::from(number));
            }
            return (comparison, Value::String(rest.to_string()));
        }
    }
    (Comparison::Eq, Value::String(text.to_string()))
}

/// Write handle for the predicate a filter method just opened.
#[must_use = "a condition does nothing until a comparison method is called"]
pub struct Condition<'f> {
    filter: &'f mut Filter,
}

impl<'f> Condition<'f> {
    fn set(self, comparison: Comparison, value: Value) -> &'f mut Filter {
        if let Some(expr) = self.filter.expressions.last_mut() {
            expr.comparison = Some(comparison);
            expr.value = Some(value);
        }
        self.filter.index_type = IndexType::Value;
        self.filter
    }

    pub fn eq(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::Eq, value.into())
    }

    pub fn not(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::Gt, value.into())
    }

    pub fn gt_eq(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::GtEq, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::Lt, value.into())
    }

    pub fn lt_eq(self, value: impl Into<Value>) -> &'f mut Filter {
        self.set(Comparison::LtEq, value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_every_document() {
        let filter = Filter::new();
        assert_eq!(filter.index_type, IndexType::Registry);
        assert!(filter.expressions.is_empty());
        assert_eq!(filter.order_by, FIELD_ORIGIN);
        assert!(filter.reverse);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.length, Filter::DEFAULT_LENGTH);
    }

    #[test]
    fn fluent_comparisons_switch_to_the_value_index() {
        let mut filter = Filter::new();
        filter.where_("age").gt_eq(21).and("name").eq("sam");

        assert_eq!(filter.index_type, IndexType::Value);
        assert_eq!(filter.expressions.len(), 2);
        assert_eq!(filter.expressions[0].op, LogicOp::Where);
        assert_eq!(filter.expressions[0].comparison, Some(Comparison::GtEq));
        assert_eq!(filter.expressions[0].value, Some(json!(21)));
        assert_eq!(filter.expressions[1].op, LogicOp::And);
        assert_eq!(filter.expressions[1].value, Some(json!("sam")));
    }

    #[test]
    fn order_by_payload_property_adds_a_predicate_free_expression() {
        let mut filter = Filter::new();
        filter.order_by("age").reverse(false).length(Filter::UNLIMITED);

        assert_eq!(filter.order_by, "age");
        assert_eq!(filter.expressions.len(), 1);
        assert_eq!(filter.expressions[0].comparison, None);
        assert_eq!(filter.index_type, IndexType::Registry);
        assert!(!filter.reverse);
        assert_eq!(filter.length, Filter::UNLIMITED);
    }

    #[test]
    fn order_by_reuses_an_existing_expression() {
        let mut filter = Filter::new();
        filter.where_("age").gt(30);
        filter.order_by("age");
        assert_eq!(filter.expressions.len(), 1);
    }

    #[test]
    fn parse_object_is_a_conjunction() {
        let filter = Filter::parse(r#"{"age": 21, "name": "sam"}"#).unwrap();
        assert_eq!(filter.index_type, IndexType::Value);
        assert_eq!(filter.expressions.len(), 2);
        assert_eq!(filter.expressions[0].op, LogicOp::Where);
        assert_eq!(filter.expressions[0].prop, "age");
        assert_eq!(filter.expressions[1].op, LogicOp::And);
        assert_eq!(filter.expressions[1].prop, "name");
    }

    #[test]
    fn parse_array_is_a_disjunction_of_conjunctions() {
        let filter =
            Filter::parse(r#"[{"a": 1, "b": 2}, {"c": 3, "d": 4}]"#).unwrap();
        let ops: Vec<LogicOp> = filter.expressions.iter().map(|e| e.op).collect();
        assert_eq!(
            ops,
            vec![LogicOp::Where, LogicOp::And, LogicOp::Or, LogicOp::And]
        );
    }

    #[test]
    fn parse_empty_object_is_a_registry_scan() {
        let filter = Filter::parse("{}").unwrap();
        assert_eq!(filter.index_type, IndexType::Registry);
        assert!(filter.expressions.is_empty());
    }

    #[test]
    fn parse_reserved_keys_configure_instead_of_matching() {
        let filter = Filter::parse(
            r#"{"length": 25, "offset": 5, "order": "age", "reverse": false}"#,
        )
        .unwrap();
        assert_eq!(filter.length, 25);
        assert_eq!(filter.offset, 5);
        assert_eq!(filter.order_by, "age");
        assert!(!filter.reverse);
        assert!(filter.expressions.is_empty());
        assert_eq!(filter.index_type, IndexType::Registry);
    }

    #[test]
    fn parse_reserved_keys_still_occupy_a_position() {
        // `length` takes the first slot, so `age` is not the opening
        // predicate and joins with AND.
        let filter = Filter::parse(r#"{"length": 5, "age": 21}"#).unwrap();
        assert_eq!(filter.expressions.len(), 1);
        assert_eq!(filter.expressions[0].op, LogicOp::And);
    }

    #[test]
    fn parse_operator_prefixes_on_string_values() {
        let filter = Filter::parse(
            r#"{"age": ">= 21", "score": "<100", "name": "<>sam", "city": ">a"}"#,
        )
        .unwrap();
        let by_prop = |prop: &str| {
            filter
                .expressions
                .iter()
                .find(|e| e.prop == prop)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_prop("age").comparison, Some(Comparison::GtEq));
        assert_eq!(by_prop("age").value, Some(json!(21)));
        assert_eq!(by_prop("score").comparison, Some(Comparison::Lt));
        assert_eq!(by_prop("score").value, Some(json!(100)));
        assert_eq!(by_prop("name").comparison, Some(Comparison::Ne));
        assert_eq!(by_prop("name").value, Some(json!("sam")));
        assert_eq!(by_prop("city").comparison, Some(Comparison::Gt));
        assert_eq!(by_prop("city").value, Some(json!("a")));
    }

    #[test]
    fn parse_array_value_fans_out_at_the_same_position() {
        let filter = Filter::parse(r#"[{"x": 1}, {"tag": ["a", "b"]}]"#).unwrap();
        let ops: Vec<LogicOp> = filter.expressions.iter().map(|e| e.op).collect();
        assert_eq!(ops, vec![LogicOp::Where, LogicOp::Or, LogicOp::Or]);
        assert_eq!(filter.expressions[1].value, Some(json!("a")));
        assert_eq!(filter.expressions[2].value, Some(json!("b")));
    }

    #[test]
    fn parse_rejects_malformed_query_text() {
        assert!(Filter::parse("not json").is_err());
        assert!(Filter::parse("42").is_err());
        assert!(Filter::parse("[]").is_err());
        assert!(Filter::parse("[1, 2]").is_err());
        assert!(Filter::parse(r#"{"length": "ten"}"#).is_err());
        assert!(Filter::parse(r#"{"reverse": 1}"#).is_err());
        assert!(Filter::parse(r#"{"order": 3}"#).is_err());
        assert!(Filter::parse(r#"{"prop": {"nested": 1}}"#).is_err());
    }
}
