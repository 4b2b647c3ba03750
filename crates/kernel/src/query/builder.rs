//! Chainable list-query builder using SeaQuery.
//!
//! Turns raw HTTP query parameters into a filtered, searched, sorted,
//! paginated, field-projected SQL statement plus matching count statements.
//! The accumulated condition (base scope ∧ search ∧ filters) is tracked
//! independently of the main statement so count and facet queries always
//! reflect the filter *before* pagination.

use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, Cond, Expr, Order, PostgresQueryBuilder, Query, SelectStatement,
};

use super::params::QueryParams;

/// Columns omitted from projections unless explicitly requested.
const HIDDEN_COLUMNS: [&str; 1] = ["search_vector"];

/// Fallback ordering when no usable sort was supplied: newest first.
const DEFAULT_SORT_FIELD: &str = "created_at";

/// Join kinds supported by populate specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A populate/join specification attached to a scope.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Table to join.
    pub target_table: String,
    /// Alias for the joined table.
    pub alias: String,
    /// Column on the base table.
    pub local_field: String,
    /// Column on the joined table.
    pub foreign_field: String,
    /// Join kind.
    pub kind: JoinKind,
}

/// A computed column projected alongside real columns.
#[derive(Debug, Clone)]
pub struct VirtualField {
    pub name: String,
    /// Raw SQL expression; must not embed user input.
    pub expr: String,
}

/// An already-scoped query target: base table, its column set, an initial
/// condition, and optional joins and virtual columns.
///
/// Services build a scope once (e.g. "articles that are not soft-deleted and
/// visible to this audience") and hand it to [`ListQuery`], which layers the
/// request-driven search/filter/sort/paginate/fields chain on top.
#[derive(Debug, Clone)]
pub struct QueryScope {
    table: String,
    columns: Vec<String>,
    base: Cond,
    joins: Vec<JoinSpec>,
    virtuals: Vec<VirtualField>,
}

impl QueryScope {
    /// Create a scope over a table with its full column set.
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            base: Cond::all(),
            joins: Vec::new(),
            virtuals: Vec::new(),
        }
    }

    /// Add a base condition every derived query must satisfy.
    pub fn with_condition(mut self, cond: Cond) -> Self {
        self.base = self.base.add(cond);
        self
    }

    /// Attach a join/populate spec.
    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Attach a computed column.
    pub fn with_virtual(mut self, name: &str, expr: &str) -> Self {
        self.virtuals.push(VirtualField {
            name: name.to_string(),
            expr: expr.to_string(),
        });
        self
    }

    /// Base table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn default_projection(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !HIDDEN_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect()
    }
}

/// Options for returning plain JSON rows instead of hydrated models.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeanOptions {
    /// Project computed virtual columns.
    pub virtuals: bool,
    /// Keep null-valued fields in the output objects.
    pub nulls: bool,
}

/// Fluent list-query builder.
///
/// Conventional chain: `search → filter → sort → paginate → fields → lean`,
/// then one of the execute methods in [`super::executor`]. Each step consumes
/// and returns the builder; order is not enforced.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub(super) scope: QueryScope,
    pub(super) params: QueryParams,
    cond: Cond,
    sorts: Vec<(String, Order)>,
    pub(super) page: Option<(u64, u64)>,
    projection: Option<Vec<String>>,
    pub(super) lean: Option<LeanOptions>,
}

impl ListQuery {
    /// Build over a prepared scope.
    pub fn new(scope: QueryScope, params: QueryParams) -> Self {
        let cond = scope.base.clone();
        Self {
            scope,
            params,
            cond,
            sorts: Vec::new(),
            page: None,
            projection: None,
            lean: None,
        }
    }

    /// Build from a bare table with an initial condition.
    pub fn from_table(table: &str, columns: &[&str], base: Cond, params: QueryParams) -> Self {
        Self::new(QueryScope::new(table, columns).with_condition(base), params)
    }

    /// Case-insensitive substring search across `applicable_fields`, combined
    /// with OR and intersected into the accumulated condition.
    ///
    /// No-op when the `search` param is absent/empty or the field list is
    /// empty — an empty field list means "no search", never "match everything".
    pub fn search(mut self, applicable_fields: &[&str]) -> Self {
        let Some(needle) = self.params.search().map(str::to_string) else {
            return self;
        };
        if applicable_fields.is_empty() {
            return self;
        }

        let pattern = format!("%{}%", escape_like_wildcards(&needle));
        let mut any = Cond::any();
        for field in applicable_fields {
            any = any.add(self.column(field).ilike(pattern.clone()));
        }
        self.cond = self.cond.add(any);
        self
    }

    /// Equality filters from all non-reserved query keys.
    ///
    /// A whitelist restricts which keys are accepted; omitting it passes any
    /// sanitized non-reserved key through (an escape hatch for admin
    /// endpoints — production call sites pass a whitelist).
    pub fn filter(mut self, applicable_fields: Option<&[&str]>) -> Self {
        for (key, value) in self.params.filter_entries(applicable_fields) {
            let condition = self.column(&key).eq(value);
            self.cond = self.cond.add(condition);
        }
        self
    }

    /// Compound sort from the `sort` param, left-to-right precedence.
    ///
    /// Tokens whose bare field name is not in the whitelist are dropped; if
    /// nothing survives, ordering falls back to `created_at` descending.
    pub fn sort(mut self, applicable_fields: Option<&[&str]>) -> Self {
        self.sorts = self
            .params
            .sort_tokens()
            .into_iter()
            .filter(|t| match applicable_fields {
                Some(allowed) => allowed.contains(&t.field.as_str()),
                None => self.scope.columns.iter().any(|c| *c == t.field),
            })
            .map(|t| {
                let order = if t.descending { Order::Desc } else { Order::Asc };
                (t.field, order)
            })
            .collect();
        self
    }

    /// Apply skip/limit when the pagination gate is active.
    pub fn paginate(mut self) -> Self {
        self.page = self.params.page_limit();
        self
    }

    /// Column projection from the `fields` param.
    ///
    /// Requested inclusions are intersected with the whitelist (or the
    /// scope's column set); an empty remainder falls back to the whitelist
    /// itself when given, else the scope's default projection. Exclusions are
    /// removed afterwards.
    pub fn fields(mut self, applicable_fields: Option<&[&str]>) -> Self {
        let tokens = self.params.field_tokens();
        let includes: Vec<String> = tokens
            .iter()
            .filter(|t| !t.exclude)
            .map(|t| t.field.clone())
            .collect();
        let excludes: Vec<String> = tokens
            .iter()
            .filter(|t| t.exclude)
            .map(|t| t.field.clone())
            .collect();

        let defaults = self.scope.default_projection();
        let allowed: Vec<String> = match applicable_fields {
            Some(w) => w.iter().map(|f| (*f).to_string()).collect(),
            None => defaults.clone(),
        };

        let mut effective: Vec<String> = includes
            .into_iter()
            .filter(|f| allowed.contains(f))
            .collect();
        if effective.is_empty() {
            effective = match applicable_fields {
                Some(w) => w.iter().map(|f| (*f).to_string()).collect(),
                None => defaults.clone(),
            };
        }
        effective.retain(|f| !excludes.contains(f));
        if effective.is_empty() {
            effective = defaults;
        }

        self.projection = Some(effective);
        self
    }

    /// Request plain JSON rows instead of hydrated models.
    ///
    /// Purely a representation toggle; never alters which rows match or how
    /// they are ordered and paginated.
    pub fn lean(mut self, options: LeanOptions) -> Self {
        self.lean = Some(options);
        self
    }

    /// Render the main SELECT statement.
    pub fn build(&self) -> String {
        let mut query = Query::select();

        for col in self.effective_projection() {
            query.column((Alias::new(self.scope.table()), Alias::new(col)));
        }
        if self.include_virtuals() {
            for v in &self.scope.virtuals {
                query.expr_as(Expr::cust(v.expr.clone()), Alias::new(&v.name));
            }
        }

        query.from(Alias::new(self.scope.table()));
        self.add_joins(&mut query);
        query.cond_where(self.cond.clone());

        if self.sorts.is_empty() {
            query.order_by(
                (
                    Alias::new(self.scope.table()),
                    Alias::new(DEFAULT_SORT_FIELD),
                ),
                Order::Desc,
            );
        } else {
            for (field, order) in &self.sorts {
                query.order_by(
                    (Alias::new(self.scope.table()), Alias::new(field)),
                    order.clone(),
                );
            }
        }

        if let Some((page, limit)) = self.page {
            query.limit(limit);
            // Both values come off the wire; the offset must never overflow.
            query.offset(page.saturating_sub(1).saturating_mul(limit));
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Render the COUNT statement over the accumulated condition.
    ///
    /// Never carries ORDER BY/LIMIT/OFFSET, so the total is independent of
    /// pagination.
    pub fn build_count(&self) -> String {
        self.count_statement(self.cond.clone())
            .to_string(PostgresQueryBuilder)
    }

    /// Render a COUNT statement for the accumulated condition intersected
    /// with a facet condition.
    pub fn build_facet_count(&self, facet_cond: &Cond) -> String {
        self.count_statement(Cond::all().add(self.cond.clone()).add(facet_cond.clone()))
            .to_string(PostgresQueryBuilder)
    }

    fn count_statement(&self, cond: Cond) -> SelectStatement {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(self.scope.table()));
        self.add_joins(&mut query);
        query.cond_where(cond);
        query
    }

    fn add_joins(&self, query: &mut SelectStatement) {
        for join in &self.scope.joins {
            let kind = match join.kind {
                JoinKind::Inner => sea_query::JoinType::InnerJoin,
                JoinKind::Left => sea_query::JoinType::LeftJoin,
            };
            let on = Expr::col((
                Alias::new(self.scope.table()),
                Alias::new(&join.local_field),
            ))
            .equals((Alias::new(&join.alias), Alias::new(&join.foreign_field)));
            query.join_as(
                kind,
                Alias::new(&join.target_table),
                Alias::new(&join.alias),
                on,
            );
        }
    }

    fn column(&self, field: &str) -> Expr {
        Expr::col((Alias::new(self.scope.table()), Alias::new(field)))
    }

    fn effective_projection(&self) -> Vec<String> {
        self.projection
            .clone()
            .unwrap_or_else(|| self.scope.default_projection())
    }

    /// Virtual columns ride along for hydrated rows; lean rows opt in.
    fn include_virtuals(&self) -> bool {
        match self.lean {
            None => true,
            Some(opts) => opts.virtuals,
        }
    }

    /// Pagination state for result meta: `(1, 0)` when never activated.
    pub(super) fn meta_page_limit(&self) -> (u64, u64) {
        self.page.unwrap_or((1, 0))
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a search needle.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
