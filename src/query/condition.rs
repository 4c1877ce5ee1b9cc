// src/query/condition.rs
//! Condition trees over database properties.
//!
//! Trees are built with [`prop`] and combined with [`ConditionNode::and`] /
//! [`ConditionNode::or`] (or `&` / `|`). Combinators only accept finished
//! nodes, so grouping is always explicit in the code that builds the tree.
//! Nothing is validated here; a tree is checked against a schema when the
//! query holding it is compiled.

use crate::types::{Id, NotionId, PropertyName};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// Refers to a database property by its display name.
pub fn prop(name: impl Into<PropertyName>) -> PropertyRef {
    PropertyRef {
        name: name.into(),
        quantifier: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayQuantifier {
    Any,
    Every,
    None,
}

impl ArrayQuantifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayQuantifier::Any => "any",
            ArrayQuantifier::Every => "every",
            ArrayQuantifier::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    name: PropertyName,
    quantifier: Option<ArrayQuantifier>,
}

macro_rules! operand_predicates {
    ($($(#[$doc:meta])* $method:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(&self, value: impl Into<Operand>) -> ConditionNode {
                self.predicate(Operator::$op, value.into())
            }
        )*
    };
}

macro_rules! bare_predicates {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $method(&self) -> ConditionNode {
                self.predicate(Operator::$op, Operand::None)
            }
        )*
    };
}

impl PropertyRef {
    pub fn name(&self) -> &PropertyName {
        &self.name
    }

    pub fn quantifier(&self) -> Option<ArrayQuantifier> {
        self.quantifier
    }

    /// Matches rows where at least one element of an array rollup satisfies
    /// the predicate built from the returned reference.
    pub fn any(&self) -> PropertyRef {
        self.quantified(ArrayQuantifier::Any)
    }

    /// Matches rows where every element satisfies the predicate.
    pub fn every(&self) -> PropertyRef {
        self.quantified(ArrayQuantifier::Every)
    }

    /// Matches rows where no element satisfies the predicate.
    pub fn none(&self) -> PropertyRef {
        self.quantified(ArrayQuantifier::None)
    }

    fn quantified(&self, quantifier: ArrayQuantifier) -> PropertyRef {
        PropertyRef {
            name: self.name.clone(),
            quantifier: Some(quantifier),
        }
    }

    fn predicate(&self, operator: Operator, operand: Operand) -> ConditionNode {
        ConditionNode::Predicate(Predicate {
            property: self.clone(),
            operator,
            operand,
        })
    }

    operand_predicates! {
        equals => Equals,
        does_not_equal => DoesNotEqual,
        contains => Contains,
        does_not_contain => DoesNotContain,
        starts_with => StartsWith,
        ends_with => EndsWith,
        greater_than => GreaterThan,
        less_than => LessThan,
        greater_than_or_equal_to => GreaterThanOrEqualTo,
        less_than_or_equal_to => LessThanOrEqualTo,
        before => Before,
        after => After,
        on_or_before => OnOrBefore,
        on_or_after => OnOrAfter,
    }

    bare_predicates! {
        is_empty => IsEmpty,
        is_not_empty => IsNotEmpty,
        past_week => PastWeek,
        past_month => PastMonth,
        past_year => PastYear,
        this_week => ThisWeek,
        next_week => NextWeek,
        next_month => NextMonth,
        next_year => NextYear,
    }

    pub fn asc(&self) -> SortSpec {
        SortSpec {
            property: self.name.clone(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(&self) -> SortSpec {
        SortSpec {
            property: self.name.clone(),
            direction: SortDirection::Descending,
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop('{}')", self.name)?;
        if let Some(quantifier) = self.quantifier {
            write!(f, ".{}", quantifier.as_str())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    IsEmpty,
    IsNotEmpty,
    PastWeek,
    PastMonth,
    PastYear,
    ThisWeek,
    NextWeek,
    NextMonth,
    NextYear,
}

impl Operator {
    /// Operator key as it appears in the filter JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::DoesNotEqual => "does_not_equal",
            Operator::Contains => "contains",
            Operator::DoesNotContain => "does_not_contain",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            Operator::LessThanOrEqualTo => "less_than_or_equal_to",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::OnOrBefore => "on_or_before",
            Operator::OnOrAfter => "on_or_after",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::PastWeek => "past_week",
            Operator::PastMonth => "past_month",
            Operator::PastYear => "past_year",
            Operator::ThisWeek => "this_week",
            Operator::NextWeek => "next_week",
            Operator::NextMonth => "next_month",
            Operator::NextYear => "next_year",
        }
    }

    /// Whether the operator carries a value.
    pub fn takes_operand(&self) -> bool {
        !matches!(
            self,
            Operator::IsEmpty
                | Operator::IsNotEmpty
                | Operator::PastWeek
                | Operator::PastMonth
                | Operator::PastYear
                | Operator::ThisWeek
                | Operator::NextWeek
                | Operator::NextMonth
                | Operator::NextYear
        )
    }

    fn symbol(&self) -> Option<&'static str> {
        match self {
            Operator::Equals => Some("=="),
            Operator::DoesNotEqual => Some("!="),
            Operator::GreaterThan => Some(">"),
            Operator::LessThan => Some("<"),
            Operator::GreaterThanOrEqualTo => Some(">="),
            Operator::LessThanOrEqualTo => Some("<="),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Id(NotionId),
}

impl Operand {
    /// Short name of the operand kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "no value",
            Operand::Text(_) => "text",
            Operand::Integer(_) => "integer",
            Operand::Float(_) => "number",
            Operand::Bool(_) => "boolean",
            Operand::Date(_) => "date",
            Operand::DateTime(_) => "date-time",
            Operand::Id(_) => "id",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Text(text) => {
                write!(f, "'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Operand::Integer(n) => write!(f, "{}", n),
            Operand::Float(x) => write!(f, "{}", x),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Date(d) => write!(f, "'{}'", d.format("%Y-%m-%d")),
            Operand::DateTime(dt) => write!(f, "'{}'", dt.to_rfc3339()),
            Operand::Id(id) => write!(f, "'{}'", id.to_hyphenated()),
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Text(value)
    }
}

impl From<&String> for Operand {
    fn from(value: &String) -> Self {
        Operand::Text(value.clone())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Integer(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Integer(i64::from(value))
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Integer(i64::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Float(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

impl From<NaiveDate> for Operand {
    fn from(value: NaiveDate) -> Self {
        Operand::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for Operand {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Operand::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(value: DateTime<Utc>) -> Self {
        Operand::DateTime(value.fixed_offset())
    }
}

impl From<NotionId> for Operand {
    fn from(value: NotionId) -> Self {
        Operand::Id(value)
    }
}

impl<T> From<Id<T>> for Operand {
    fn from(value: Id<T>) -> Self {
        Operand::Id(NotionId::from(value))
    }
}

impl<T> From<&Id<T>> for Operand {
    fn from(value: &Id<T>) -> Self {
        Operand::Id(NotionId::from(value))
    }
}

/// A single property/operator/operand test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub property: PropertyRef,
    pub operator: Operator,
    pub operand: Operand,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator.symbol() {
            Some(symbol) => write!(f, "({} {} {})", self.property, symbol, self.operand),
            None => write!(
                f,
                "{}.{}({})",
                self.property,
                self.operator.as_str(),
                self.operand
            ),
        }
    }
}

/// A predicate or an AND/OR of two subtrees.
///
/// Subtrees are shared, so cloning a node and combining it again is cheap and
/// never copies the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Predicate(Predicate),
    And(Arc<ConditionNode>, Arc<ConditionNode>),
    Or(Arc<ConditionNode>, Arc<ConditionNode>),
}

impl ConditionNode {
    pub fn and(self, other: ConditionNode) -> ConditionNode {
        ConditionNode::And(Arc::new(self), Arc::new(other))
    }

    pub fn or(self, other: ConditionNode) -> ConditionNode {
        ConditionNode::Or(Arc::new(self), Arc::new(other))
    }

    /// Number of predicates in the tree.
    pub fn predicate_count(&self) -> usize {
        match self {
            ConditionNode::Predicate(_) => 1,
            ConditionNode::And(l, r) | ConditionNode::Or(l, r) => {
                l.predicate_count() + r.predicate_count()
            }
        }
    }
}

impl BitAnd for ConditionNode {
    type Output = ConditionNode;

    fn bitand(self, rhs: ConditionNode) -> ConditionNode {
        self.and(rhs)
    }
}

impl BitOr for ConditionNode {
    type Output = ConditionNode;

    fn bitor(self, rhs: ConditionNode) -> ConditionNode {
        self.or(rhs)
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionNode::Predicate(p) => write!(f, "{}", p),
            ConditionNode::And(l, r) => write!(f, "({} & {})", l, r),
            ConditionNode::Or(l, r) => write!(f, "({} | {})", l, r),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub property: PropertyName,
    pub direction: SortDirection,
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        write!(f, "prop('{}').{}()", self.property, method)
    }
}
