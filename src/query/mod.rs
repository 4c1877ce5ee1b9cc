//! Building, compiling and searching.

pub mod compiler;
pub mod condition;
pub mod filter;
pub mod search;

pub use compiler::{CompiledQuery, Query};
pub use condition::{
    prop, ArrayQuantifier, ConditionNode, Operand, Operator, Predicate, PropertyRef,
    SortDirection, SortSpec,
};
pub use filter::{QueryFilter, WireSort};
pub use search::{SearchObjectKind, SearchQuery, SearchResults};
