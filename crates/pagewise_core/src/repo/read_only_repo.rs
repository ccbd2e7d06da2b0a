//! Read-only paginated repository over SQLite.
//!
//! # Responsibility
//! - Point lookup, full scan, and three paging modes for any registered
//!   entity.
//! - Keep SQL details inside the query module; this file orchestrates
//!   count, order and slice.
//!
//! # Invariants
//! - Pagination and sort input are validated before any store access.
//! - The total count is computed from the base filter before ordering is
//!   appended, once per call.
//! - One unit of work per call, released on every exit path.
//! - No partial page is returned on error.

use crate::db::{ConnectionProvider, DbError, UnitOfWork};
use crate::pagination::{Page, Pageable, SortablePageRequest, Window};
use crate::query::{
    distinct_count_query, CountStrategy, EntityQuery, OrderClause, QueryPlan, TranslatedQuery,
};
use crate::repo::prebuilt::{PrebuiltCount, PrebuiltQuery};
use crate::schema::{EntityDescriptor, Schema};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(500);

pub type RepoResult<T> = Result<T, RepoError>;

/// Store interaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Acquire,
    Count,
    Select,
}

impl QueryStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Count => "count",
            Self::Select => "select",
        }
    }
}

/// Error surfaced by repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// `page < 1` or `page_size < 1`.
    InvalidPagination { page: u32, page_size: u32 },
    InvalidSortField { field: String, reason: String },
    InvalidFilterField { field: String, reason: String },
    UnknownEntity(String),
    /// Store failure; `source` keeps the original error and message.
    QueryExecution { stage: QueryStage, source: DbError },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPagination { page, page_size } => write!(
                f,
                "invalid pagination: page={page} page_size={page_size}; both must be >= 1"
            ),
            Self::InvalidSortField { field, reason } => {
                write!(f, "invalid sort field `{field}`: {reason}")
            }
            Self::InvalidFilterField { field, reason } => {
                write!(f, "invalid filter field `{field}`: {reason}")
            }
            Self::UnknownEntity(name) => write!(f, "entity `{name}` is not registered"),
            Self::QueryExecution { stage, source } => {
                write!(f, "query execution failed during {}: {source}", stage.as_str())
            }
            Self::InvalidData(message) => write!(f, "invalid data from store: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::QueryExecution { source, .. } => Some(source),
            Self::InvalidPagination { .. }
            | Self::InvalidSortField { .. }
            | Self::InvalidFilterField { .. }
            | Self::UnknownEntity(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl RepoError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPagination { .. } => "invalid_pagination",
            Self::InvalidSortField { .. } => "invalid_sort_field",
            Self::InvalidFilterField { .. } => "invalid_filter_field",
            Self::UnknownEntity(_) => "unknown_entity",
            Self::QueryExecution { .. } => "query_execution_failed",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

fn execution_error(stage: QueryStage) -> impl Fn(rusqlite::Error) -> RepoError {
    move |err| RepoError::QueryExecution {
        stage,
        source: DbError::Sqlite(err),
    }
}

/// Maps one result row, selected by column name, to an entity value.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub count_strategy: CountStrategy,
    /// Statements slower than this are logged at `warn`.
    pub slow_query_threshold: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            count_strategy: CountStrategy::default(),
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
        }
    }
}

/// Read-only access to one entity type.
///
/// Not-found convention: `read_one` returns `Ok(None)`, `read_all` returns an
/// empty vector. Neither is an error.
pub trait ReadOnlyRepository<E> {
    /// Point lookup by primary key.
    fn read_one(&self, key: impl Into<Value>) -> RepoResult<Option<E>>;
    /// Unordered, unwindowed full scan.
    fn read_all(&self) -> RepoResult<Vec<E>>;
    /// Plain row count of the entity table.
    fn count(&self) -> RepoResult<u64>;
    /// Pages over all rows with the requested sort.
    fn read_page(&self, request: &SortablePageRequest) -> RepoResult<Page<E>>;
    /// Pages over a base query: distinct count, then order, then slice.
    fn read_page_filtered(
        &self,
        query: &EntityQuery,
        request: &SortablePageRequest,
    ) -> RepoResult<Page<E>>;
    /// Pages over caller-ordered SQL using the caller's count.
    fn read_page_prebuilt(&self, query: &PrebuiltQuery, pageable: Pageable)
        -> RepoResult<Page<E>>;
}

/// SQLite-backed paginated repository for entity type `E`.
///
/// Holds no per-call state; safe to share across threads when `P` is.
pub struct SqliteReadOnlyRepository<E, P> {
    provider: P,
    schema: Arc<Schema>,
    entity: String,
    options: EngineOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E, P: ConnectionProvider> SqliteReadOnlyRepository<E, P> {
    /// Binds a repository to a registered entity.
    ///
    /// # Errors
    /// - `UnknownEntity` when `entity` is not in `schema`.
    pub fn new(provider: P, schema: Arc<Schema>, entity: impl Into<String>) -> RepoResult<Self> {
        let entity = entity.into();
        if schema.entity(&entity).is_none() {
            return Err(RepoError::UnknownEntity(entity));
        }
        Ok(Self {
            provider,
            schema,
            entity,
            options: EngineOptions::default(),
            _entity: PhantomData,
        })
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Raw SQL and parameters of the unordered base query, as the store
    /// would execute it.
    pub fn translate(&self, query: &EntityQuery) -> RepoResult<TranslatedQuery> {
        let plan = QueryPlan::from_query(&self.schema, self.descriptor()?, query)?;
        Ok(plan.translate_base())
    }

    fn descriptor(&self) -> RepoResult<&EntityDescriptor> {
        self.schema
            .entity(&self.entity)
            .ok_or_else(|| RepoError::UnknownEntity(self.entity.clone()))
    }

    fn acquire(&self) -> RepoResult<UnitOfWork<'_>> {
        self.provider
            .acquire()
            .map_err(|source| RepoError::QueryExecution {
                stage: QueryStage::Acquire,
                source,
            })
    }

    fn observe(&self, uow: &UnitOfWork<'_>, stage: QueryStage, query: &TranslatedQuery) -> Instant {
        debug!(
            "event=sql module=repo entity={} stage={} uow_id={} sql={}",
            self.entity,
            stage.as_str(),
            uow.id(),
            query
        );
        Instant::now()
    }

    fn finish(&self, uow: &UnitOfWork<'_>, stage: QueryStage, started_at: Instant) {
        let elapsed = started_at.elapsed();
        if elapsed >= self.options.slow_query_threshold {
            warn!(
                "event=slow_query module=repo entity={} stage={} uow_id={} duration_ms={} threshold_ms={}",
                self.entity,
                stage.as_str(),
                uow.id(),
                elapsed.as_millis(),
                self.options.slow_query_threshold.as_millis()
            );
        }
    }

    fn fetch_count(
        &self,
        uow: &UnitOfWork<'_>,
        stage: QueryStage,
        query: &TranslatedQuery,
    ) -> RepoResult<u64> {
        let started_at = self.observe(uow, stage, query);
        let count = query_count(uow, query, stage)?;
        self.finish(uow, stage, started_at);
        Ok(count)
    }

    /// Logs the outcome of one public operation.
    fn logged<T>(
        &self,
        event: &str,
        started_at: Instant,
        result: RepoResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> RepoResult<T> {
        match &result {
            Ok(value) => info!(
                "event={} module=repo status=ok entity={} {} duration_ms={}",
                event,
                self.entity,
                describe(value),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={} module=repo status=error entity={} duration_ms={} error_code={} error={}",
                event,
                self.entity,
                started_at.elapsed().as_millis(),
                err.error_code(),
                err
            ),
        }
        result
    }
}

impl<E: FromRow, P: ConnectionProvider> SqliteReadOnlyRepository<E, P> {
    fn fetch_rows(
        &self,
        uow: &UnitOfWork<'_>,
        query: &TranslatedQuery,
    ) -> RepoResult<Vec<E>> {
        let started_at = self.observe(uow, QueryStage::Select, query);
        let rows = query_rows(uow, query)?;
        self.finish(uow, QueryStage::Select, started_at);
        Ok(rows)
    }

    fn page_all(&self, request: &SortablePageRequest) -> RepoResult<Page<E>> {
        let window = Window::for_page(request.pageable)?;
        let root = self.descriptor()?;
        let order = OrderClause::build(&self.schema, root, &request.sort)?;
        let mut plan = QueryPlan::all(root);

        let uow = self.acquire()?;
        let total_count = self.fetch_count(&uow, QueryStage::Count, &plan.count_rows())?;
        plan.append_order(&order);
        let items = self.fetch_rows(&uow, &plan.select_window(window))?;

        Ok(Page::of(
            items,
            request.pageable.page,
            request.pageable.page_size,
            total_count,
        ))
    }

    fn page_filtered(
        &self,
        query: &EntityQuery,
        request: &SortablePageRequest,
    ) -> RepoResult<Page<E>> {
        let window = Window::for_page(request.pageable)?;
        let root = self.descriptor()?;
        let mut plan = QueryPlan::from_query(&self.schema, root, query)?;
        let order = OrderClause::build(&self.schema, root, &request.sort)?;

        let uow = self.acquire()?;
        let count_query = distinct_count_query(&plan, self.options.count_strategy);
        let total_count = self.fetch_count(&uow, QueryStage::Count, &count_query)?;
        plan.append_order(&order);
        let items = self.fetch_rows(&uow, &plan.select_window(window))?;

        Ok(Page::of(
            items,
            request.pageable.page,
            request.pageable.page_size,
            total_count,
        ))
    }

    fn page_prebuilt(&self, query: &PrebuiltQuery, pageable: Pageable) -> RepoResult<Page<E>> {
        let window = Window::for_page(pageable)?;

        let uow = self.acquire()?;
        let total_count = match query.count() {
            PrebuiltCount::Known(total) => *total,
            PrebuiltCount::Sql(count_query) => {
                self.fetch_count(&uow, QueryStage::Count, count_query)?
            }
            PrebuiltCount::WrapRows => {
                self.fetch_count(&uow, QueryStage::Count, &query.rows_count_query())?
            }
        };
        let items = self.fetch_rows(&uow, &query.windowed(window))?;

        Ok(Page::of(items, pageable.page, pageable.page_size, total_count))
    }
}

fn describe_page<T>(page: &Page<T>) -> String {
    format!(
        "page={} page_size={} rows={} total_count={}",
        page.page(),
        page.page_size(),
        page.items().len(),
        page.total_count()
    )
}

impl<E: FromRow, P: ConnectionProvider> ReadOnlyRepository<E> for SqliteReadOnlyRepository<E, P> {
    fn read_one(&self, key: impl Into<Value>) -> RepoResult<Option<E>> {
        let started_at = Instant::now();
        let key = key.into();
        let result = self.descriptor().and_then(|root| {
            let uow = self.acquire()?;
            let rows = self.fetch_rows(&uow, &QueryPlan::all(root).select_by_key(key))?;
            Ok(rows.into_iter().next())
        });
        self.logged("read_one", started_at, result, |found| {
            format!("found={}", found.is_some())
        })
    }

    fn read_all(&self) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        let result = self.descriptor().and_then(|root| {
            let uow = self.acquire()?;
            self.fetch_rows(&uow, &QueryPlan::all(root).select_all())
        });
        self.logged("read_all", started_at, result, |rows| format!("rows={}", rows.len()))
    }

    fn count(&self) -> RepoResult<u64> {
        let started_at = Instant::now();
        let result = self.descriptor().and_then(|root| {
            let uow = self.acquire()?;
            self.fetch_count(&uow, QueryStage::Count, &QueryPlan::all(root).count_rows())
        });
        self.logged("count", started_at, result, |total| format!("total_count={total}"))
    }

    fn read_page(&self, request: &SortablePageRequest) -> RepoResult<Page<E>> {
        let started_at = Instant::now();
        let result = self.page_all(request);
        self.logged("read_page", started_at, result, describe_page)
    }

    fn read_page_filtered(
        &self,
        query: &EntityQuery,
        request: &SortablePageRequest,
    ) -> RepoResult<Page<E>> {
        let started_at = Instant::now();
        let result = self.page_filtered(query, request);
        self.logged("read_page_filtered", started_at, result, |page| {
            format!(
                "{} count_strategy={}",
                describe_page(page),
                self.options.count_strategy.as_str()
            )
        })
    }

    fn read_page_prebuilt(
        &self,
        query: &PrebuiltQuery,
        pageable: Pageable,
    ) -> RepoResult<Page<E>> {
        let started_at = Instant::now();
        let result = self.page_prebuilt(query, pageable);
        self.logged("read_page_prebuilt", started_at, result, describe_page)
    }
}

fn query_rows<E: FromRow>(conn: &Connection, query: &TranslatedQuery) -> RepoResult<Vec<E>> {
    let to_error = execution_error(QueryStage::Select);
    let mut stmt = conn.prepare(&query.sql).map_err(&to_error)?;
    let mut rows = stmt
        .query(params_from_iter(query.params.iter()))
        .map_err(&to_error)?;

    let mut items = Vec::new();
    while let Some(row) = rows.next().map_err(&to_error)? {
        items.push(E::from_row(row).map_err(&to_error)?);
    }
    Ok(items)
}

fn query_count(conn: &Connection, query: &TranslatedQuery, stage: QueryStage) -> RepoResult<u64> {
    let total: i64 = conn
        .query_row(&query.sql, params_from_iter(query.params.iter()), |row| {
            row.get(0)
        })
        .map_err(execution_error(stage))?;
    u64::try_from(total)
        .map_err(|_| RepoError::InvalidData(format!("count query returned negative value {total}")))
}
