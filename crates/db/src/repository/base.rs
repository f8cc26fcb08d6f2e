//! Generic data access over a session
//!
//! `BaseRepository<T>` provides the CRUD primitives every entity repository
//! is built from: read-all and read-by-condition in tracked or untracked
//! mode, plus staged create and delete. Reads return a `Query` holding the
//! fetched rows so callers can compose in-memory filters and orderings
//! before materializing.

use crate::error::{DbError, DbResult};
use crate::session::{Loaded, Session};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use surrealdb::sql::{Id, Thing};
use tracing::{debug, trace};

/// A named query parameter and its value
pub(crate) type Binding = (String, Value);

/// A single field write: column name and the value to store
pub type Assignment = (&'static str, FieldValue);

/// A value headed for the store, tagged with how SurrealQL should read it
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any JSON-representable scalar
    Plain(Value),
    /// A datetime, cast on the store side
    Datetime(DateTime<Utc>),
    /// A nullable datetime; `None` is written as `NONE`
    OptionalDatetime(Option<DateTime<Utc>>),
    /// A record link to `table:id`
    Link { table: &'static str, id: String },
}

impl FieldValue {
    /// Render this value as a SurrealQL expression, pushing any bound
    /// parameter under `param`.
    pub(crate) fn render(&self, param: &str, bindings: &mut Vec<Binding>) -> String {
        match self {
            FieldValue::Plain(value) => {
                bindings.push((param.to_string(), value.clone()));
                format!("${}", param)
            }
            FieldValue::Datetime(value) | FieldValue::OptionalDatetime(Some(value)) => {
                bindings.push((
                    param.to_string(),
                    Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                ));
                format!("<datetime>${}", param)
            }
            FieldValue::OptionalDatetime(None) => "NONE".to_string(),
            FieldValue::Link { table, id } => {
                bindings.push((param.to_string(), Value::String(id.clone())));
                format!("type::thing(\"{}\", ${})", table, param)
            }
        }
    }
}

/// A persisted record type
///
/// Implementors describe their table, how a stored row maps back to the
/// entity, and how the entity's fields are written.
pub trait Entity: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Table holding this entity
    const TABLE: &'static str;

    /// Row shape as returned by `SELECT *`
    type Row: DeserializeOwned;

    /// Convert a stored row into the entity
    fn from_row(row: Self::Row) -> Self;

    /// Record key (without the table prefix)
    fn id(&self) -> &str;

    /// Replace the record key
    fn set_id(&mut self, id: String);

    /// Every persisted field except the id, in a stable order
    fn assignments(&self) -> Vec<Assignment>;
}

/// Extract the record key from a SurrealDB record id
pub(crate) fn record_key(thing: &Thing) -> String {
    match &thing.id {
        Id::String(key) => key.clone(),
        other => other.to_string(),
    }
}

/// A store-side predicate: a conjunction of equality clauses
///
/// Rendered to a parameterized `WHERE` clause; values are always bound,
/// never spliced into the query text. Non-equality predicates belong in
/// `Query::filter`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    clauses: Vec<Assignment>,
}

impl Condition {
    /// Create an empty condition (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the record with this id in `table`
    pub fn with_id(mut self, table: &'static str, id: impl Into<String>) -> Self {
        self.clauses.push((
            "id",
            FieldValue::Link {
                table,
                id: id.into(),
            },
        ));
        self
    }

    /// Match records whose `field` links to `table:id`
    pub fn with_link(
        mut self,
        field: &'static str,
        table: &'static str,
        id: impl Into<String>,
    ) -> Self {
        self.clauses.push((
            field,
            FieldValue::Link {
                table,
                id: id.into(),
            },
        ));
        self
    }

    /// Match records whose `field` equals `value`
    pub fn with_field(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.clauses.push((field, FieldValue::Plain(value.into())));
        self
    }

    /// Whether the condition has no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the clauses joined with `AND`, or `None` when empty.
    pub(crate) fn render(&self, bindings: &mut Vec<Binding>) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }

        let rendered: Vec<String> = self
            .clauses
            .iter()
            .enumerate()
            .map(|(index, (field, value))| {
                let expr = value.render(&format!("c{}", index), bindings);
                format!("{} = {}", field, expr)
            })
            .collect();

        Some(rendered.join(" AND "))
    }
}

/// A fetched sequence of entities awaiting in-memory composition
///
/// Filters and orderings apply to the rows as they were read from the
/// store; materializing attaches each row to the session in the requested
/// tracking mode.
#[derive(Debug)]
pub struct Query<'s, T: Entity> {
    session: &'s Session,
    pub(crate) items: Vec<T>,
    track_changes: bool,
}

impl<'s, T: Entity> Query<'s, T> {
    pub(crate) fn new(session: &'s Session, items: Vec<T>, track_changes: bool) -> Self {
        Self {
            session,
            items,
            track_changes,
        }
    }

    /// Keep only the entities matching `predicate`
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool,
    {
        self.items.retain(|item| predicate(item));
        self
    }

    /// Entities currently in the sequence
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether materialized results will be tracked
    pub fn tracks_changes(&self) -> bool {
        self.track_changes
    }

    /// Materialize every entity, preserving order.
    pub fn to_list(self) -> Vec<Loaded<T>> {
        let session = self.session;
        let track_changes = self.track_changes;
        self.items
            .into_iter()
            .map(|item| session.load(item, track_changes))
            .collect()
    }

    /// Materialize at most one entity.
    ///
    /// # Errors
    ///
    /// Returns `DbError::MultipleMatches` if more than one entity remains.
    pub fn single(mut self) -> DbResult<Option<Loaded<T>>> {
        match self.items.len() {
            0 => Ok(None),
            1 => {
                let item = self.items.remove(0);
                Ok(Some(self.session.load(item, self.track_changes)))
            }
            count => Err(DbError::MultipleMatches {
                table: T::TABLE,
                count,
            }),
        }
    }
}

/// CRUD primitives for one entity type over a shared session
pub struct BaseRepository<T: Entity> {
    session: Arc<Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for BaseRepository<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> BaseRepository<T> {
    /// Create a repository bound to `session`
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// The session this repository stages into
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read every entity of this type.
    ///
    /// With `track_changes`, materialized entities are live handles whose
    /// field changes are written on the next commit; otherwise they are
    /// detached snapshots.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn find_all(&self, track_changes: bool) -> DbResult<Query<'_, T>> {
        self.fetch(None, track_changes).await
    }

    /// Read the entities matching `condition`, with the same tracking
    /// contract as `find_all`.
    ///
    /// `condition` only narrows the fetch with equality clauses. Any other
    /// predicate (ranges, date windows, computed tests) goes through
    /// `Query::filter` on the returned query.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn find_by_condition(
        &self,
        condition: &Condition,
        track_changes: bool,
    ) -> DbResult<Query<'_, T>> {
        self.fetch(Some(condition), track_changes).await
    }

    /// Stage an insert. Nothing is written until the session commits.
    ///
    /// Assigns a generated id when the entity has none and returns the id.
    pub fn create(&self, entity: T) -> String {
        self.session.stage_create(entity)
    }

    /// Stage a removal. Nothing is written until the session commits.
    ///
    /// The entity must have been read or created through this session.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Detached` if the session has never seen the entity.
    pub fn delete(&self, entity: &T) -> DbResult<()> {
        self.session.stage_delete(entity)
    }

    async fn fetch(
        &self,
        condition: Option<&Condition>,
        track_changes: bool,
    ) -> DbResult<Query<'_, T>> {
        let mut bindings = Vec::new();
        let mut sql = format!("SELECT * FROM {}", T::TABLE);
        if let Some(where_clause) = condition.and_then(|c| c.render(&mut bindings)) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        debug!("Fetching {} records (tracked: {})", T::TABLE, track_changes);
        trace!("Query: {}", sql);

        let mut query = self.session.client().query(sql);
        for binding in bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.map_err(|e| {
            debug!("Failed to fetch {} records: {}", T::TABLE, e);
            DbError::Query(Box::new(e))
        })?;
        let rows: Vec<T::Row> = response.take(0)?;

        debug!("Fetched {} {} records", rows.len(), T::TABLE);
        let items = rows.into_iter().map(T::from_row).collect();
        Ok(Query::new(&self.session, items, track_changes))
    }
}
