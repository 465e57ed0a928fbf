//! Filter expressions for a media library and the timeline buckets built
//! from them.
//!
//! A [`Filter`](query::Filter) is a conjunction of `key:OPvalue` clauses that
//! round-trips through one line of text, the form sent to the server and kept
//! in saved views. The [`timeline`] module turns per-month, per-day or per-hour
//! counts for a filter into a dense run of buckets.

pub mod query;
pub mod timeline;
pub mod views;
