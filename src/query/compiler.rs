// src/query/compiler.rs
//! Validates condition trees against a schema and lowers them to the wire
//! filter grammar.

use super::condition::{ArrayQuantifier, ConditionNode, Operand, Operator, Predicate, SortSpec};
use super::filter::{
    Condition, FormulaCondition, PropertyFilter, QueryFilter, RollupCondition, TimestampFilter,
    TimestampKind, TypedCondition, WireSort,
};
use crate::constants::{NOTION_API_MIN_PAGE_SIZE, NOTION_API_PAGE_SIZE};
use crate::error::QueryError;
use crate::model::{FormulaType, PropertyType, RollupType, SchemaView};
use crate::types::NotionId;
use chrono::{DateTime, NaiveDate};
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

/// A database query under construction.
///
/// # Accumulation rules
///
/// The two accumulating methods behave differently on purpose:
///
/// * [`Query::filter`] **combines**: calling it again ANDs the new condition
///   onto the existing one, so `q.filter(a).filter(b)` filters on
///   `a.and(b)`.
/// * [`Query::sort`] **replaces**: calling it again discards the previous sort
///   list, so `q.sort([a]).sort([b])` sorts by `b` only.
///
/// ```
/// use notion_query::{prop, Query};
///
/// let query = Query::new()
///     .filter(prop("Topic").equals("Tech"))
///     .filter(prop("Released").this_week())
///     .sort([prop("Topic").asc()])
///     .sort([prop("Released").desc()]);
///
/// assert_eq!(
///     query.condition().map(ToString::to_string).as_deref(),
///     Some("((prop('Topic') == 'Tech') & prop('Released').this_week())")
/// );
/// assert_eq!(query.sorts().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    condition: Option<ConditionNode>,
    sorts: Vec<SortSpec>,
    page_size: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            condition: None,
            sorts: Vec::new(),
            page_size: NOTION_API_PAGE_SIZE,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition. An existing condition is kept and ANDed with the new one.
    pub fn filter(mut self, condition: ConditionNode) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Sets the sort order. Any previously set sort list is replaced.
    pub fn sort(mut self, sorts: impl IntoIterator<Item = SortSpec>) -> Self {
        self.sorts = sorts.into_iter().collect();
        self
    }

    /// Rows requested per page, 1 to 100. Checked when compiling.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn condition(&self) -> Option<&ConditionNode> {
        self.condition.as_ref()
    }

    pub fn sorts(&self) -> &[SortSpec] {
        &self.sorts
    }

    /// Validates the query against `schema` and produces the wire payload.
    ///
    /// Pure: the same query and schema always compile to the same payload.
    /// Stops at the first problem, checking the page size, then the filter
    /// tree depth first from the left, then the sorts.
    pub fn compile(&self, schema: &dyn SchemaView) -> Result<CompiledQuery, QueryError> {
        if !(NOTION_API_MIN_PAGE_SIZE..=NOTION_API_PAGE_SIZE).contains(&self.page_size) {
            return Err(QueryError::InvalidPageSize {
                requested: self.page_size,
            });
        }

        let filter = self
            .condition
            .as_ref()
            .map(|node| compile_node(node, schema))
            .transpose()?;

        let sorts = self
            .sorts
            .iter()
            .map(|spec| compile_sort(spec, schema))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(node) = &self.condition {
            debug!("Compiled filter {} with {} sort(s)", node, sorts.len());
        }

        Ok(CompiledQuery {
            filter,
            sorts,
            page_size: self.page_size,
        })
    }
}

/// A validated query, ready to be sent page by page.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub filter: Option<QueryFilter>,
    pub sorts: Vec<WireSort>,
    pub page_size: u32,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a QueryFilter>,
    #[serde(skip_serializing_if = "<[WireSort]>::is_empty")]
    sorts: &'a [WireSort],
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

impl CompiledQuery {
    /// The POST body for one page. The cursor is passed through untouched.
    pub fn request_body(&self, start_cursor: Option<&str>) -> Result<Value, serde_json::Error> {
        serde_json::to_value(QueryBody {
            filter: self.filter.as_ref(),
            sorts: &self.sorts,
            page_size: self.page_size,
            start_cursor,
        })
    }
}

fn compile_node(node: &ConditionNode, schema: &dyn SchemaView) -> Result<QueryFilter, QueryError> {
    match node {
        ConditionNode::Predicate(predicate) => compile_predicate(predicate, schema),
        ConditionNode::And(left, right) => Ok(QueryFilter::And {
            and: vec![compile_node(left, schema)?, compile_node(right, schema)?],
        }),
        ConditionNode::Or(left, right) => Ok(QueryFilter::Or {
            or: vec![compile_node(left, schema)?, compile_node(right, schema)?],
        }),
    }
}

fn compile_sort(spec: &SortSpec, schema: &dyn SchemaView) -> Result<WireSort, QueryError> {
    if schema.property_type(spec.property.as_str()).is_none() {
        return Err(QueryError::UnknownProperty {
            property: spec.property.to_string(),
        });
    }
    Ok(WireSort::Property {
        property: spec.property.to_string(),
        direction: spec.direction,
    })
}

fn compile_predicate(
    predicate: &Predicate,
    schema: &dyn SchemaView,
) -> Result<QueryFilter, QueryError> {
    let name = predicate.property.name().as_str();
    let declared = schema
        .property_type(name)
        .ok_or_else(|| QueryError::UnknownProperty {
            property: name.to_string(),
        })?;

    if let Some(quantifier) = predicate.property.quantifier() {
        let element = match declared {
            PropertyType::Rollup {
                result: Some(RollupType::Array(element)),
            } => element,
            PropertyType::Rollup { result: None } => {
                return Err(QueryError::UnresolvedPropertyType {
                    property: name.to_string(),
                })
            }
            other => {
                return Err(incompatible(name, quantifier.as_str(), other));
            }
        };
        let inner = Box::new(typed_condition(predicate, element)?);
        let rollup = match quantifier {
            ArrayQuantifier::Any => RollupCondition::Any(inner),
            ArrayQuantifier::Every => RollupCondition::Every(inner),
            ArrayQuantifier::None => RollupCondition::None(inner),
        };
        return Ok(QueryFilter::Property(PropertyFilter {
            property: name.to_string(),
            condition: TypedCondition::Rollup(rollup),
        }));
    }

    match declared {
        PropertyType::CreatedTime | PropertyType::LastEditedTime => {
            let kind = if matches!(declared, PropertyType::CreatedTime) {
                TimestampKind::CreatedTime
            } else {
                TimestampKind::LastEditedTime
            };
            let condition = Family::Date.condition(predicate, declared)?;
            Ok(QueryFilter::Timestamp(TimestampFilter::new(kind, condition)))
        }
        _ => Ok(QueryFilter::Property(PropertyFilter {
            property: name.to_string(),
            condition: typed_condition(predicate, declared)?,
        })),
    }
}

/// Builds the type-keyed condition for `declared`, which is either the
/// property's own type or the element type of an array rollup.
fn typed_condition(
    predicate: &Predicate,
    declared: &PropertyType,
) -> Result<TypedCondition, QueryError> {
    let unresolved = || QueryError::UnresolvedPropertyType {
        property: predicate.property.name().to_string(),
    };

    let typed = match declared {
        PropertyType::Title
        | PropertyType::RichText
        | PropertyType::Url
        | PropertyType::Email
        | PropertyType::PhoneNumber => {
            TypedCondition::RichText(Family::Text.condition(predicate, declared)?)
        }
        PropertyType::Number => TypedCondition::Number(Family::Number.condition(predicate, declared)?),
        PropertyType::Checkbox => {
            TypedCondition::Checkbox(Family::Checkbox.condition(predicate, declared)?)
        }
        PropertyType::Select => TypedCondition::Select(Family::Select.condition(predicate, declared)?),
        PropertyType::Status => TypedCondition::Status(Family::Select.condition(predicate, declared)?),
        PropertyType::MultiSelect => {
            TypedCondition::MultiSelect(Family::MultiSelect.condition(predicate, declared)?)
        }
        PropertyType::Date | PropertyType::CreatedTime | PropertyType::LastEditedTime => {
            TypedCondition::Date(Family::Date.condition(predicate, declared)?)
        }
        PropertyType::People | PropertyType::CreatedBy | PropertyType::LastEditedBy => {
            TypedCondition::People(Family::People.condition(predicate, declared)?)
        }
        PropertyType::Relation => {
            TypedCondition::Relation(Family::Relation.condition(predicate, declared)?)
        }
        PropertyType::Files => TypedCondition::Files(Family::Files.condition(predicate, declared)?),
        PropertyType::UniqueId => {
            TypedCondition::UniqueId(Family::UniqueId.condition(predicate, declared)?)
        }
        PropertyType::Formula { result: None } | PropertyType::Rollup { result: None } => {
            return Err(unresolved())
        }
        PropertyType::Formula {
            result: Some(result),
        } => TypedCondition::Formula(match result {
            FormulaType::String => FormulaCondition::String(Family::Text.condition(predicate, declared)?),
            FormulaType::Number => {
                FormulaCondition::Number(Family::Number.condition(predicate, declared)?)
            }
            FormulaType::Boolean => {
                FormulaCondition::Checkbox(Family::Checkbox.condition(predicate, declared)?)
            }
            FormulaType::Date => FormulaCondition::Date(Family::Date.condition(predicate, declared)?),
        }),
        PropertyType::Rollup {
            result: Some(result),
        } => TypedCondition::Rollup(match result {
            RollupType::Number => {
                RollupCondition::Number(Family::Number.condition(predicate, declared)?)
            }
            RollupType::Date => RollupCondition::Date(Family::Date.condition(predicate, declared)?),
            RollupType::Array(_) => {
                return Err(incompatible(
                    predicate.property.name().as_str(),
                    predicate.operator.as_str(),
                    declared,
                ))
            }
        }),
        PropertyType::Unsupported => {
            return Err(incompatible(
                predicate.property.name().as_str(),
                predicate.operator.as_str(),
                declared,
            ))
        }
    };
    Ok(typed)
}

fn incompatible(property: &str, operator: &str, declared: &PropertyType) -> QueryError {
    QueryError::IncompatiblePredicate {
        property: property.to_string(),
        operator: operator.to_string(),
        declared_type: declared.to_string(),
    }
}

/// Groups of property types that share operators and operand kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Text,
    Number,
    Checkbox,
    Select,
    MultiSelect,
    Date,
    People,
    Relation,
    Files,
    UniqueId,
}

impl Family {
    fn allows(self, operator: Operator) -> bool {
        use Operator::*;
        match self {
            Family::Text => matches!(
                operator,
                Equals
                    | DoesNotEqual
                    | Contains
                    | DoesNotContain
                    | StartsWith
                    | EndsWith
                    | IsEmpty
                    | IsNotEmpty
            ),
            Family::Number => matches!(
                operator,
                Equals
                    | DoesNotEqual
                    | GreaterThan
                    | LessThan
                    | GreaterThanOrEqualTo
                    | LessThanOrEqualTo
                    | IsEmpty
                    | IsNotEmpty
            ),
            Family::Checkbox => matches!(operator, Equals | DoesNotEqual),
            Family::Select => matches!(operator, Equals | DoesNotEqual | IsEmpty | IsNotEmpty),
            Family::MultiSelect | Family::People | Family::Relation => {
                matches!(operator, Contains | DoesNotContain | IsEmpty | IsNotEmpty)
            }
            Family::Date => !matches!(
                operator,
                DoesNotEqual | Contains | DoesNotContain | StartsWith | EndsWith
            ),
            Family::Files => matches!(operator, IsEmpty | IsNotEmpty),
            Family::UniqueId => matches!(
                operator,
                Equals
                    | DoesNotEqual
                    | GreaterThan
                    | LessThan
                    | GreaterThanOrEqualTo
                    | LessThanOrEqualTo
            ),
        }
    }

    /// Comparison operators on dates are spelled as before/after on the wire.
    fn wire_operator(self, operator: Operator) -> Operator {
        match (self, operator) {
            (Family::Date, Operator::GreaterThan) => Operator::After,
            (Family::Date, Operator::LessThan) => Operator::Before,
            (Family::Date, Operator::GreaterThanOrEqualTo) => Operator::OnOrAfter,
            (Family::Date, Operator::LessThanOrEqualTo) => Operator::OnOrBefore,
            (_, operator) => operator,
        }
    }

    fn expected_operand(self) -> &'static str {
        match self {
            Family::Text | Family::Select | Family::MultiSelect => "text",
            Family::Number => "number",
            Family::Checkbox => "boolean",
            Family::Date => "date",
            Family::People | Family::Relation => "id",
            Family::Files => "no value",
            Family::UniqueId => "integer",
        }
    }

    fn condition(
        self,
        predicate: &Predicate,
        declared: &PropertyType,
    ) -> Result<Condition, QueryError> {
        let property = predicate.property.name().as_str();
        if !self.allows(predicate.operator) {
            return Err(incompatible(property, predicate.operator.as_str(), declared));
        }
        let operator = self.wire_operator(predicate.operator);
        let value = match operator {
            Operator::IsEmpty | Operator::IsNotEmpty => json!(true),
            op if !op.takes_operand() => json!({}),
            _ => self.operand_value(&predicate.operand).ok_or_else(|| {
                QueryError::TypeMismatch {
                    property: property.to_string(),
                    expected: self.expected_operand().to_string(),
                    found: predicate.operand.kind().to_string(),
                }
            })?,
        };
        Ok(Condition { operator, value })
    }

    fn operand_value(self, operand: &Operand) -> Option<Value> {
        match (self, operand) {
            (Family::Text | Family::Select | Family::MultiSelect, Operand::Text(s)) => {
                Some(json!(s))
            }
            (Family::Number, Operand::Integer(n)) => Some(json!(n)),
            (Family::Number, Operand::Float(x)) if x.is_finite() => Some(json!(x)),
            (Family::Checkbox, Operand::Bool(b)) => Some(json!(b)),
            (Family::Date, Operand::Date(d)) => Some(json!(d.format("%Y-%m-%d").to_string())),
            (Family::Date, Operand::DateTime(dt)) => Some(json!(dt.to_rfc3339())),
            (Family::Date, Operand::Text(s)) => parse_date_text(s).map(Value::String),
            (Family::People | Family::Relation, Operand::Id(id)) => {
                Some(json!(id.to_hyphenated()))
            }
            (Family::People | Family::Relation, Operand::Text(s)) => NotionId::parse(s)
                .ok()
                .map(|id| json!(id.to_hyphenated())),
            (Family::UniqueId, Operand::Integer(n)) => Some(json!(n)),
            _ => None,
        }
    }
}

/// Normalises an ISO date (`2024-01-31`) or RFC 3339 timestamp given as text.
fn parse_date_text(text: &str) -> Option<String> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.to_rfc3339())
}
