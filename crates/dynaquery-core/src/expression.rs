//! Conjunctive expression assembly.
//!
//! [`ExpressionState`] accumulates `name op :placeholder` fragments into a
//! key-condition slot and a filter slot, joining fragments within a slot with
//! `" AND "`. Both slots share a single placeholder map, so every placeholder
//! must be unique across the whole request:
//!
//! - key-condition fragments use `:<name>` when that token is still free;
//! - everything else uses `:<name><n>`, where `n` starts at the number of values
//!   already stored and is bumped until the token is unused.

use std::collections::HashMap;

use dynaquery_model::AttributeValue;

use crate::comparison::ComparisonOperator;

/// Which expression a fragment is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `KeyConditionExpression` of a query.
    KeyCondition,
    /// `FilterExpression` of a query or scan.
    Filter,
}

/// Expression strings and placeholder values owned by one builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionState {
    key_condition: Option<String>,
    filter: Option<String>,
    values: HashMap<String, AttributeValue>,
}

impl ExpressionState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name op placeholder` to `slot` and bind `value` to the
    /// generated placeholder, which is returned.
    pub fn push(
        &mut self,
        slot: Slot,
        name: &str,
        op: ComparisonOperator,
        value: AttributeValue,
    ) -> String {
        let placeholder = self.placeholder(slot, name);
        let fragment = format!("{name} {op} {placeholder}");

        let target = match slot {
            Slot::KeyCondition => &mut self.key_condition,
            Slot::Filter => &mut self.filter,
        };
        let joined = match target.take() {
            Some(existing) => format!("{existing} AND {fragment}"),
            None => fragment,
        };
        *target = Some(joined);

        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn placeholder(&self, slot: Slot, name: &str) -> String {
        if slot == Slot::KeyCondition {
            let bare = format!(":{name}");
            if !self.values.contains_key(&bare) {
                return bare;
            }
        }

        let mut n = self.values.len();
        loop {
            let candidate = format!(":{name}{n}");
            if !self.values.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// The key-condition expression, if any fragment was added to it.
    #[must_use]
    pub fn key_condition(&self) -> Option<&str> {
        self.key_condition.as_deref()
    }

    /// The filter expression, if any fragment was added to it.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Placeholder bindings for both expressions.
    #[must_use]
    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    /// Number of fragments added so far across both slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no fragment has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Split into `(key_condition, filter, values)`.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Option<String>,
        Option<String>,
        HashMap<String, AttributeValue>,
    ) {
        (self.key_condition, self.filter, self.values)
    }
}
