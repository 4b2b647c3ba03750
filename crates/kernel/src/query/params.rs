//! Raw HTTP query-string parameters.
//!
//! A small set of reserved keys (`search`, `sort`, `page`, `limit`, `fields`,
//! `is_count_only`) drives the list machinery; every other key is a candidate
//! equality filter on the queried entity. The reserved set is a wire contract
//! that external API consumers depend on.

use std::collections::HashMap;

/// Keys with builder-level meaning; never treated as domain filters.
pub const RESERVED_KEYS: [&str; 6] = ["search", "sort", "page", "limit", "fields", "is_count_only"];

/// Default page size when `limit` is present but unparsable.
const DEFAULT_LIMIT: u64 = 10;

/// Parsed view over a raw query-string map.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    map: HashMap<String, String>,
}

/// One `sort` token: bare field name plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortToken {
    pub field: String,
    pub descending: bool,
}

/// One `fields` token: bare field name, optionally marked for exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    pub field: String,
    pub exclude: bool,
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self { map }
    }
}

impl QueryParams {
    /// Build from key/value pairs (mainly for tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// The search needle, if present and non-empty.
    pub fn search(&self) -> Option<&str> {
        self.get("search").map(str::trim).filter(|s| !s.is_empty())
    }

    /// Parsed `sort` tokens: comma-separated names, `-` prefix = descending.
    pub fn sort_tokens(&self) -> Vec<SortToken> {
        let Some(raw) = self.get("sort") else {
            return Vec::new();
        };
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "-")
            .map(|t| match t.strip_prefix('-') {
                Some(bare) => SortToken {
                    field: bare.to_string(),
                    descending: true,
                },
                None => SortToken {
                    field: t.to_string(),
                    descending: false,
                },
            })
            .collect()
    }

    /// Parsed `fields` tokens: comma-separated names, `-` prefix = exclusion.
    pub fn field_tokens(&self) -> Vec<FieldToken> {
        let Some(raw) = self.get("fields") else {
            return Vec::new();
        };
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "-")
            .map(|t| match t.strip_prefix('-') {
                Some(bare) => FieldToken {
                    field: bare.to_string(),
                    exclude: true,
                },
                None => FieldToken {
                    field: t.to_string(),
                    exclude: false,
                },
            })
            .collect()
    }

    /// Pagination activation gate.
    ///
    /// Returns `Some((page, limit))` only when BOTH `page` and `limit` keys are
    /// present. A missing key means "return everything" — this is deliberately
    /// an activation gate, not a default substitution. Unparsable or
    /// non-positive values degrade to page 1 / limit 10.
    pub fn page_limit(&self) -> Option<(u64, u64)> {
        let page_raw = self.get("page")?;
        let limit_raw = self.get("limit")?;

        let page = page_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT);

        Some((page, limit))
    }

    /// Strict boolean parse of `is_count_only`.
    ///
    /// Only `"true"` (case-insensitive) and `"1"` count; in particular the
    /// string `"false"` is falsy.
    pub fn count_only(&self) -> bool {
        self.get("is_count_only")
            .map(str::trim)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    /// Non-reserved keys usable as equality filters.
    ///
    /// Reserved keys are removed first, then any key whose name is not a plain
    /// identifier (`[A-Za-z0-9_]`) is stripped — operator- or path-shaped
    /// names never reach the condition accumulator. A whitelist, when given,
    /// is intersective; its absence passes every surviving key through.
    /// Entries come back sorted by key so downstream SQL is deterministic.
    pub fn filter_entries(&self, whitelist: Option<&[&str]>) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .map
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .filter(|(k, _)| is_plain_identifier(k))
            .filter(|(k, _)| match whitelist {
                Some(allowed) => allowed.contains(&k.as_str()),
                None => true,
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Stable JSON view of the raw map, for cache-key derivation.
    pub fn to_json(&self) -> serde_json::Value {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        let mut obj = serde_json::Map::new();
        for k in keys {
            obj.insert(k.clone(), serde_json::Value::String(self.map[k].clone()));
        }
        serde_json::Value::Object(obj)
    }
}

/// A key is usable as a filter column only if it is a plain identifier.
fn is_plain_identifier(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_empty_is_none() {
        let params = QueryParams::from_pairs([("search", "  ")]);
        assert_eq!(params.search(), None);

        let params = QueryParams::from_pairs([("search", "breaking")]);
        assert_eq!(params.search(), Some("breaking"));
    }

    #[test]
    fn sort_tokens_parse_direction() {
        let params = QueryParams::from_pairs([("sort", "-created_at,title, -views")]);
        let tokens = params.sort_tokens();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[0].descending);
        assert_eq!(tokens[0].field, "created_at");
        assert!(!tokens[1].descending);
        assert_eq!(tokens[2].field, "views");
    }

    #[test]
    fn pagination_requires_both_keys() {
        let params = QueryParams::from_pairs([("page", "2")]);
        assert_eq!(params.page_limit(), None);

        let params = QueryParams::from_pairs([("limit", "5")]);
        assert_eq!(params.page_limit(), None);

        let params = QueryParams::from_pairs([("page", "2"), ("limit", "5")]);
        assert_eq!(params.page_limit(), Some((2, 5)));
    }

    #[test]
    fn pagination_coerces_bad_values() {
        let params = QueryParams::from_pairs([("page", "abc"), ("limit", "-3")]);
        assert_eq!(params.page_limit(), Some((1, 10)));

        let params = QueryParams::from_pairs([("page", "0"), ("limit", "0")]);
        assert_eq!(params.page_limit(), Some((1, 10)));
    }

    #[test]
    fn count_only_is_strict() {
        assert!(QueryParams::from_pairs([("is_count_only", "true")]).count_only());
        assert!(QueryParams::from_pairs([("is_count_only", "1")]).count_only());
        assert!(QueryParams::from_pairs([("is_count_only", "TRUE")]).count_only());
        // "false" is a truthy string in loosely-typed stacks; here it is falsy.
        assert!(!QueryParams::from_pairs([("is_count_only", "false")]).count_only());
        assert!(!QueryParams::from_pairs([("is_count_only", "yes")]).count_only());
        assert!(!QueryParams::from_pairs([("page", "1")]).count_only());
    }

    #[test]
    fn filter_entries_drop_reserved_keys() {
        let params = QueryParams::from_pairs([
            ("search", "x"),
            ("sort", "-created_at"),
            ("page", "1"),
            ("limit", "10"),
            ("fields", "title"),
            ("is_count_only", "false"),
            ("status", "published"),
            ("category", "politics"),
        ]);
        let entries = params.filter_entries(None);
        assert_eq!(
            entries,
            vec![
                ("category".to_string(), "politics".to_string()),
                ("status".to_string(), "published".to_string()),
            ]
        );
    }

    #[test]
    fn filter_entries_strip_operator_shaped_keys() {
        let params = QueryParams::from_pairs([
            ("status", "published"),
            ("$where", "1=1"),
            ("author.role", "admin"),
            ("", "x"),
        ]);
        let entries = params.filter_entries(None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "status");
    }

    #[test]
    fn filter_entries_whitelist_is_restrictive() {
        let params = QueryParams::from_pairs([("status", "published"), ("secret", "1")]);
        let entries = params.filter_entries(Some(&["status", "category"]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "status");
    }

    #[test]
    fn field_tokens_parse_exclusions() {
        let params = QueryParams::from_pairs([("fields", "title,-body,summary")]);
        let tokens = params.field_tokens();
        assert_eq!(tokens.len(), 3);
        assert!(!tokens[0].exclude);
        assert!(tokens[1].exclude);
        assert_eq!(tokens[1].field, "body");
    }

    #[test]
    fn to_json_is_key_sorted() {
        let params = QueryParams::from_pairs([("b", "2"), ("a", "1")]);
        let json = params.to_json();
        assert_eq!(
            serde_json::to_string(&json).ok().as_deref(),
            Some(r#"{"a":"1","b":"2"}"#)
        );
    }
}
