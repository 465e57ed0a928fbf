//! Ordering and paging clauses appended to a filter before it is sent to the
//! media endpoint. They share the filter grammar; only the keys are reserved.

use super::ast::Operator;
use super::filter::Filter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ORDER_BY: &str = "order_by";
pub const ASC: &str = "asc";
pub const LIMIT: &str = "limit";
pub const PAGE: &str = "page";

pub const CONTROL_KEYS: [&str; 4] = [ORDER_BY, ASC, LIMIT, PAGE];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub order_by: String,
    pub asc: bool,
    pub limit: u32,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("duplicate filter for column: {0}")]
    Duplicate(String),

    #[error("invalid operator {op} for {key}, expected =")]
    InvalidOperator { key: String, op: Operator },

    #[error("invalid value {value} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("cannot page without limit")]
    PageWithoutLimit,

    #[error("order of filters is invalid: {key} came after {after}")]
    InvalidOrder { key: String, after: String },
}

impl Filter {
    /// Replaces any control clauses with the given ones, placed after the
    /// ordinary clauses.
    pub fn with_paging(self, paging: &Paging) -> Filter {
        self.without_controls()
            .set(ORDER_BY, Operator::Eq, paging.order_by.as_str())
            .set(ASC, Operator::Eq, paging.asc)
            .set(LIMIT, Operator::Eq, paging.limit)
            .set(PAGE, Operator::Eq, paging.page)
    }

    pub fn to_media_query(&self, paging: &Paging) -> String {
        self.clone().with_paging(paging).to_string()
    }

    /// The filter as sent for a count, without ordering or paging.
    pub fn without_controls(self) -> Filter {
        CONTROL_KEYS
            .iter()
            .fold(self, |filter, key| filter.remove_key(key))
    }
}

/// Control clauses must follow every ordinary clause, and `page` comes last.
pub fn validate(filter: &Filter) -> Result<(), ControlError> {
    check_order(filter)?;

    for key in CONTROL_KEYS {
        let clauses: Vec<_> = filter.clauses().filter(|c| c.key == key).collect();
        let [clause] = clauses.as_slice() else {
            if clauses.is_empty() {
                continue;
            }
            return Err(ControlError::Duplicate(key.to_string()));
        };

        if clause.op != Operator::Eq {
            return Err(ControlError::InvalidOperator {
                key: key.to_string(),
                op: clause.op,
            });
        }

        let valid = match key {
            ORDER_BY => clause.value.as_str().is_some_and(|col| !col.is_empty()),
            ASC => clause.value.as_bool().is_some(),
            _ => clause
                .value
                .as_f64()
                .is_some_and(|n| n >= 0.0 && n.fract() == 0.0),
        };
        if !valid {
            return Err(ControlError::InvalidValue {
                key: key.to_string(),
                value: clause.value.to_string(),
            });
        }
    }

    if filter.get(PAGE, Operator::Eq).is_some() && filter.get(LIMIT, Operator::Eq).is_none() {
        return Err(ControlError::PageWithoutLimit);
    }

    Ok(())
}

fn check_order(filter: &Filter) -> Result<(), ControlError> {
    let mut first_control: Option<&str> = None;
    let mut page_seen = false;

    for clause in filter.clauses() {
        let is_control = CONTROL_KEYS.contains(&clause.key);
        let after = match first_control {
            Some(control) if !is_control => Some(control),
            _ if page_seen && clause.key != PAGE => Some(PAGE),
            _ => None,
        };
        if let Some(after) = after {
            return Err(ControlError::InvalidOrder {
                key: clause.key.to_string(),
                after: after.to_string(),
            });
        }

        if is_control {
            first_control.get_or_insert(clause.key);
            page_seen |= clause.key == PAGE;
        }
    }

    Ok(())
}

/// Page holding the item preceded by `count_before` items.
pub fn page_for(count_before: u64, limit: u32) -> u64 {
    match limit {
        0 => 0,
        limit => count_before / u64::from(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    fn paging() -> Paging {
        Paging {
            order_by: "created_at".to_string(),
            asc: false,
            limit: 100,
            page: 2,
        }
    }

    #[test]
    fn test_media_query_appends_controls() {
        let filter = parse(r#"tag:="beach""#).unwrap();
        assert_eq!(
            filter.to_media_query(&paging()),
            r#"tag:="beach" order_by:="created_at" asc:=false limit:=100 page:=2"#
        );
    }

    #[test]
    fn test_media_query_replaces_existing_controls() {
        let filter = parse(r#"page:=9 tag:="beach" limit:=5"#).unwrap();
        let query = filter.to_media_query(&paging());
        assert_eq!(
            query,
            r#"tag:="beach" order_by:="created_at" asc:=false limit:=100 page:=2"#
        );
        assert!(validate(&parse(&query).unwrap()).is_ok());
    }

    #[test]
    fn test_without_controls() {
        let filter = parse(r#"tag:="beach" limit:=5 page:=1"#).unwrap();
        assert_eq!(filter.without_controls().to_string(), r#"tag:="beach""#);
    }

    #[test]
    fn test_validate_errors() {
        assert_eq!(
            validate(&parse("limit:=5 limit:=6").unwrap()),
            Err(ControlError::Duplicate("limit".to_string()))
        );
        assert!(matches!(
            validate(&parse("limit:>5").unwrap()),
            Err(ControlError::InvalidOperator { .. })
        ));
        assert!(matches!(
            validate(&parse("limit:=-1").unwrap()),
            Err(ControlError::InvalidValue { .. })
        ));
        assert!(matches!(
            validate(&parse("asc:=yes").unwrap()),
            Err(ControlError::InvalidValue { .. })
        ));
        assert_eq!(
            validate(&parse("page:=1").unwrap()),
            Err(ControlError::PageWithoutLimit)
        );
    }

    #[test]
    fn test_validate_order() {
        assert_eq!(
            validate(&parse(r#"page:=1 limit:=5 tag:="x""#).unwrap()),
            Err(ControlError::InvalidOrder {
                key: "limit".to_string(),
                after: "page".to_string(),
            })
        );
        assert_eq!(
            validate(&parse(r#"limit:=5 tag:="x""#).unwrap()),
            Err(ControlError::InvalidOrder {
                key: "tag".to_string(),
                after: "limit".to_string(),
            })
        );
        assert!(validate(&parse(r#"tag:="x" asc:=true limit:=5 page:=1"#).unwrap()).is_ok());
        assert!(validate(&parse(r#"tag:="x" limit:=5 order_by:="size""#).unwrap()).is_ok());
    }

    #[test]
    fn test_page_for() {
        assert_eq!(page_for(0, 100), 0);
        assert_eq!(page_for(250, 100), 2);
        assert_eq!(page_for(5, 0), 0);
    }
}
