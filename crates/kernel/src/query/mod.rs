//! Generic list-query layer.
//!
//! Every listing endpoint composes the same chain: construct a [`ListQuery`]
//! over a scope or bare table, layer `search → filter → sort → paginate →
//! fields → lean` from the raw query parameters, then execute to obtain the
//! `{ data, meta }` envelope, optionally with per-facet counts.

mod builder;
mod executor;
mod params;

pub use builder::{JoinKind, JoinSpec, LeanOptions, ListQuery, QueryScope, VirtualField};
pub use executor::{Facet, QueryMeta, QueryResult};
pub use params::{FieldToken, QueryParams, RESERVED_KEYS, SortToken};
