use super::ast::{Operator, Value};
use super::parser::{parse, ParseError};
use chrono::{Duration, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
struct Term {
    op: Operator,
    value: Value,
}

/// A conjunction of `key:OPvalue` clauses.
///
/// Filters are values: every mutation consumes the filter and returns the
/// changed one, and `clone` is a structural copy. Key order and the order of
/// terms within a key are kept for serialization.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    entries: Vec<(String, Vec<Term>)>,
}

/// One clause borrowed from a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause<'a> {
    pub key: &'a str,
    pub op: Operator,
    pub value: &'a Value,
}

impl fmt::Display for Clause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.key, self.op, self.value)
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of clauses, not keys.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, terms)| terms.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn clauses(&self) -> impl Iterator<Item = Clause<'_>> {
        self.entries.iter().flat_map(|(key, terms)| {
            terms.iter().map(move |term| Clause {
                key: key.as_str(),
                op: term.op,
                value: &term.value,
            })
        })
    }

    /// Replaces every `(key, op)` term with a single new one at the end of the
    /// key's list.
    pub fn set(mut self, key: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let key = key.into();
        if let Some(terms) = self.terms_mut(&key) {
            terms.retain(|term| term.op != op);
        }
        self.add(key, op, value)
    }

    /// Appends a term, keeping any existing ones. Used for multi-valued keys.
    pub fn add(mut self, key: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let key = key.into();
        let term = Term {
            op,
            value: value.into(),
        };
        match self.terms_mut(&key) {
            Some(terms) => terms.push(term),
            None => self.entries.push((key, vec![term])),
        }
        self
    }

    /// Drops every `(key, op)` term.
    pub fn unset(mut self, key: &str, op: Operator) -> Self {
        if let Some(terms) = self.terms_mut(key) {
            terms.retain(|term| term.op != op);
        }
        self.prune();
        self
    }

    /// Drops the first term matching `(key, op, value)`.
    pub fn remove(mut self, key: &str, op: Operator, value: &Value) -> Self {
        if let Some(terms) = self.terms_mut(key) {
            if let Some(index) = terms
                .iter()
                .position(|term| term.op == op && &term.value == value)
            {
                terms.remove(index);
            }
        }
        self.prune();
        self
    }

    /// Drops every term under `key`.
    pub fn remove_key(mut self, key: &str) -> Self {
        self.entries.retain(|(k, _)| k != key);
        self
    }

    pub fn get(&self, key: &str, op: Operator) -> Option<&Value> {
        self.terms(key)?
            .iter()
            .find(|term| term.op == op)
            .map(|term| &term.value)
    }

    pub fn get_all(&self, key: &str, op: Operator) -> Vec<&Value> {
        self.terms(key)
            .map(|terms| {
                terms
                    .iter()
                    .filter(|term| term.op == op)
                    .map(|term| &term.value)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most permissive bounds on `key`: the earliest `>`/`>=` value and the
    /// latest `<`/`<=` value. Values that do not read as timestamps are ignored.
    pub fn date_range(&self, key: &str) -> DateRange {
        let mut range = DateRange::default();
        let Some(terms) = self.terms(key) else {
            return range;
        };

        for term in terms {
            let Some(ts) = term.value.as_timestamp() else {
                continue;
            };
            if term.op.is_lower_bound() {
                range.start = Some(range.start.map_or(ts, |start| start.min(ts)));
            } else if term.op.is_upper_bound() {
                range.end = Some(range.end.map_or(ts, |end| end.max(ts)));
            }
        }

        range
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    fn terms(&self, key: &str) -> Option<&Vec<Term>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, terms)| terms)
    }

    fn terms_mut(&mut self, key: &str) -> Option<&mut Vec<Term>> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, terms)| terms)
    }

    fn prune(&mut self) {
        self.entries.retain(|(_, terms)| !terms.is_empty());
    }
}

/// Two filters are equal when they hold the same keys and, per key, the same
/// terms in the same order. Key order does not matter; term order does.
impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, terms)| other.terms(key) == Some(terms))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

impl FromStr for Filter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(de::Error::custom)
    }
}

/// Bounds derived from a filter. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.start?, self.end?))
    }

    pub fn span(&self) -> Option<Duration> {
        self.bounds().map(|(start, end)| end - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_set_replaces_add_appends() {
        let filter = Filter::new()
            .set("media_type", Operator::Eq, "photo")
            .set("media_type", Operator::Eq, "video")
            .add("tag", Operator::Eq, "beach")
            .add("tag", Operator::Eq, "vacation");

        assert_eq!(
            filter.get_all("media_type", Operator::Eq),
            vec![&Value::text("video")]
        );
        assert_eq!(filter.get_all("tag", Operator::Eq).len(), 2);
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_set_keeps_other_operators() {
        let filter = Filter::new()
            .set("created_at", Operator::Ge, day(2024, 1, 1))
            .set("created_at", Operator::Lt, day(2024, 2, 1))
            .set("created_at", Operator::Ge, day(2024, 1, 15));

        assert_eq!(
            filter.to_string(),
            "created_at:<2024-02-01 created_at:>=2024-01-15"
        );
    }

    #[test]
    fn test_set_keeps_key_position() {
        let filter = Filter::new()
            .set("tag", Operator::Eq, "beach")
            .set("path", Operator::Like, "/a/%")
            .set("tag", Operator::Eq, "snow");
        assert_eq!(filter.to_string(), r#"tag:="snow" path:%"/a/%""#);
    }

    #[test]
    fn test_get_missing() {
        let filter = Filter::new().add("tag", Operator::Eq, "beach");
        assert_eq!(filter.get("tag", Operator::Ne), None);
        assert_eq!(filter.get("album", Operator::Eq), None);
        assert!(filter.get_all("album", Operator::Eq).is_empty());
    }

    #[test]
    fn test_remove_last_drops_key() {
        let filter = Filter::new()
            .add("tag", Operator::Eq, "beach")
            .add("tag", Operator::Eq, "vacation")
            .add("path", Operator::Like, "/2024/%");

        let filter = filter.remove("tag", Operator::Eq, &Value::text("beach"));
        assert_eq!(filter.get_all("tag", Operator::Eq), vec![&Value::text("vacation")]);

        let filter = filter.remove("tag", Operator::Eq, &Value::text("vacation"));
        assert_eq!(filter.keys().collect::<Vec<_>>(), vec!["path"]);
    }

    #[test]
    fn test_remove_only_first_duplicate() {
        let filter = Filter::new()
            .add("tag", Operator::Eq, "x")
            .add("tag", Operator::Eq, "x")
            .remove("tag", Operator::Eq, &Value::text("x"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_unset_last_drops_key() {
        let filter = Filter::new()
            .add("tag", Operator::Eq, "x")
            .unset("tag", Operator::Eq);
        assert!(filter.is_empty());
        assert_eq!(filter.to_string(), "");
    }

    #[test]
    fn test_display_insertion_order() {
        let filter = Filter::new()
            .add("tag", Operator::Eq, "beach")
            .add("is_screenshot", Operator::Eq, false)
            .add("tag", Operator::Eq, "sea side");
        assert_eq!(
            filter.to_string(),
            r#"tag:="beach" tag:="sea side" is_screenshot:=false"#
        );
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let a = Filter::new()
            .add("tag", Operator::Eq, "beach")
            .add("path", Operator::Like, "/a/%");
        let b = Filter::new()
            .add("path", Operator::Like, "/a/%")
            .add("tag", Operator::Eq, "beach");
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_is_positional_per_key() {
        let a = Filter::new()
            .add("tag", Operator::Eq, "beach")
            .add("tag", Operator::Eq, "vacation");
        let b = Filter::new()
            .add("tag", Operator::Eq, "vacation")
            .add("tag", Operator::Eq, "beach");
        assert_ne!(a, b);
        assert_ne!(a, Filter::new().add("tag", Operator::Eq, "beach"));
    }

    #[test]
    fn test_date_range() {
        let filter = parse("created_at:>=2024-01-01 created_at:<2024-02-01").unwrap();
        assert_eq!(
            filter.date_range("created_at"),
            DateRange::new(day(2024, 1, 1), day(2024, 2, 1))
        );
    }

    #[test]
    fn test_date_range_most_permissive() {
        let filter = Filter::new()
            .add("created_at", Operator::Gt, day(2024, 3, 1))
            .add("created_at", Operator::Ge, day(2024, 1, 1))
            .add("created_at", Operator::Le, day(2024, 5, 1))
            .add("created_at", Operator::Lt, day(2024, 6, 1))
            .add("created_at", Operator::Eq, day(2030, 1, 1));
        assert_eq!(
            filter.date_range("created_at"),
            DateRange::new(day(2024, 1, 1), day(2024, 6, 1))
        );
    }

    #[test]
    fn test_date_range_open_and_text_values() {
        let filter = Filter::new().add("created_at", Operator::Ge, "2024-01-01");
        let range = filter.date_range("created_at");
        assert_eq!(range.start, Some(day(2024, 1, 1)));
        assert_eq!(range.end, None);
        assert_eq!(range.span(), None);
        assert_eq!(Filter::new().date_range("created_at"), DateRange::default());
    }

    #[test]
    fn test_round_trip() {
        let filter = Filter::new()
            .add("tag", Operator::Eq, "beach")
            .add("tag", Operator::Eq, r#"say "hi""#)
            .add("tag", Operator::Eq, r#"it's "x""#)
            .add("path", Operator::Like, r"C:\photos\%")
            .add("latitude", Operator::Gt, 48.5)
            .add("import_id", Operator::Ne, 3i64)
            .add("has_gps", Operator::Eq, true)
            .add("created_at", Operator::Ge, day(2024, 1, 1))
            .add("created_at", Operator::Lt, day(2024, 1, 1) + Duration::hours(7))
            .add("album", Operator::Eq, "")
            .add("name", Operator::Eq, "2024-01-01");

        let text = filter.to_string();
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, filter);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_clone_is_structural() {
        let filter = Filter::new().add("tag", Operator::Eq, "007");
        let copy = filter.clone().add("tag", Operator::Eq, "x");
        assert_eq!(filter.len(), 1);
        assert_eq!(copy.len(), 2);
        assert_eq!(filter.get("tag", Operator::Eq), Some(&Value::text("007")));
    }

    #[test]
    fn test_serde_as_text() {
        let filter: Filter = serde_yaml::from_str(r#"'tag:="beach" limit:=5'"#).unwrap();
        assert_eq!(filter.get("limit", Operator::Eq), Some(&Value::Number(5.0)));
        let yaml = serde_yaml::to_string(&filter).unwrap();
        let back: Filter = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, filter);
        assert!(serde_yaml::from_str::<Filter>("'tag:\"x'").is_err());
    }
}
