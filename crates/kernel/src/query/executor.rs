//! Query execution and the `{ data, meta }` result envelope.
//!
//! The main row fetch and the total count run concurrently; facet counts, when
//! requested, join the same round trip. The first failure cancels the
//! remaining in-flight statements.

use futures::future::try_join_all;
use sea_query::Cond;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

use super::builder::ListQuery;

/// Pagination and count metadata attached to every list result.
///
/// Deserializable so cached envelopes can be rehydrated on a cache hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMeta {
    /// Rows matching the accumulated filter, before pagination.
    pub total: u64,

    /// Current page (1 when pagination never activated).
    pub page: u64,

    /// Page size (0 when pagination never activated).
    pub limit: u64,

    /// Per-facet totals, in the order the facets were supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<serde_json::Map<String, Value>>,
}

/// The one shape services depend on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub data: Vec<T>,
    pub meta: QueryMeta,
}

/// A named sub-filter counted alongside the main listing.
#[derive(Debug, Clone)]
pub struct Facet {
    pub key: String,
    pub cond: Cond,
}

impl Facet {
    pub fn new(key: &str, cond: Cond) -> Self {
        Self {
            key: key.to_string(),
            cond,
        }
    }
}

impl ListQuery {
    /// Run the query and its count, returning JSON rows.
    pub async fn execute(self, pool: &PgPool) -> AppResult<QueryResult<Value>> {
        self.execute_with_facets(pool, &[]).await
    }

    /// Run the query, its count, and one count per facet, all concurrently.
    ///
    /// Facet counts intersect the accumulated filter with each facet's
    /// condition and land in `meta.counts`; they never touch `data` or
    /// `meta.total`. Any facet failure fails the whole call.
    pub async fn execute_with_facets(
        self,
        pool: &PgPool,
        facets: &[Facet],
    ) -> AppResult<QueryResult<Value>> {
        let (page, limit) = self.meta_page_limit();

        if self.params.count_only() {
            let total = fetch_count(pool, &self.build_count()).await?;
            return Ok(QueryResult {
                data: Vec::new(),
                meta: QueryMeta {
                    total,
                    page,
                    limit,
                    counts: None,
                },
            });
        }

        let data_sql = format!("SELECT row_to_json(t) FROM ({}) t", self.build());
        let count_sql = self.build_count();
        let facet_sqls: Vec<(String, String)> = facets
            .iter()
            .map(|f| (f.key.clone(), self.build_facet_count(&f.cond)))
            .collect();

        let data_fut = async {
            sqlx::query_scalar::<_, Value>(&data_sql)
                .fetch_all(pool)
                .await
                .map_err(AppError::from)
        };
        let count_fut = fetch_count(pool, &count_sql);
        let facets_fut = try_join_all(facet_sqls.iter().map(|(_, sql)| fetch_count(pool, sql)));

        let (mut rows, total, facet_totals) = tokio::try_join!(data_fut, count_fut, facets_fut)?;

        if let Some(opts) = self.lean
            && !opts.nulls
        {
            for row in &mut rows {
                if let Value::Object(obj) = row {
                    obj.retain(|_, v| !v.is_null());
                }
            }
        }

        let counts = if facet_sqls.is_empty() {
            None
        } else {
            let mut map = serde_json::Map::new();
            for ((key, _), n) in facet_sqls.iter().zip(facet_totals) {
                map.insert(key.clone(), Value::from(n));
            }
            Some(map)
        };

        Ok(QueryResult {
            data: rows,
            meta: QueryMeta {
                total,
                page,
                limit,
                counts,
            },
        })
    }

    /// Run the query and hydrate each row into `T`.
    pub async fn execute_as<T: DeserializeOwned>(self, pool: &PgPool) -> AppResult<QueryResult<T>> {
        let result = self.execute(pool).await?;
        let mut data = Vec::with_capacity(result.data.len());
        for row in result.data {
            data.push(
                serde_json::from_value(row)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("row decode failed: {e}")))?,
            );
        }
        Ok(QueryResult {
            data,
            meta: result.meta,
        })
    }
}

async fn fetch_count(pool: &PgPool, sql: &str) -> AppResult<u64> {
    let total: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(u64::try_from(total).unwrap_or(0))
}
