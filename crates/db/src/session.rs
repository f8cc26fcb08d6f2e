//! Unit of work over the store
//!
//! A `Session` is shared by every repository in a `RepositoryManager`. It
//! stages creates and deletes, remembers the original values of tracked
//! entities, and writes everything in one transaction on `commit`.
//!
//! A session is a single logical unit of work; it is not meant to be
//! driven from several tasks at once.

use crate::error::{DbError, DbResult};
use crate::repository::base::{Assignment, Binding, Entity};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{debug, trace};

/// Message thrown when an update finds its record gone
const STALE_RECORD: &str = "stale record";

/// Marker for transaction conflicts reported by the storage engine
const RETRYABLE: &str = "can be retried";

/// Marker for statements cancelled because an earlier one failed
const NOT_EXECUTED: &str = "not executed";

/// Identity of a record: table plus key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RecordKey {
    table: &'static str,
    id: String,
}

impl RecordKey {
    fn of<T: Entity>(entity: &T) -> Self {
        Self {
            table: T::TABLE,
            id: entity.id().to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}

/// A live, shared handle to a tracked entity
///
/// Every read of the same record through one session yields a handle to the
/// same value. Changes made through `modify` are detected and written on the
/// next commit.
#[derive(Debug)]
pub struct Tracked<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Tracked<T> {
    fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the current value
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Change the current value in place
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    /// Whether both handles point at the same tracked entity
    pub fn same_entity(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Tracked<T> {
    /// Copy of the current value
    pub fn snapshot(&self) -> T {
        self.lock().clone()
    }
}

/// A materialized read result
#[derive(Debug, Clone)]
pub enum Loaded<T> {
    /// Untracked copy; edits never reach the store
    Detached(T),
    /// Live handle; edits are written on commit
    Tracked(Tracked<T>),
}

impl<T: Clone> Loaded<T> {
    pub fn is_tracked(&self) -> bool {
        matches!(self, Loaded::Tracked(_))
    }

    /// Copy of the current value
    pub fn snapshot(&self) -> T {
        match self {
            Loaded::Detached(value) => value.clone(),
            Loaded::Tracked(handle) => handle.snapshot(),
        }
    }

    /// Consume into a plain value
    pub fn into_inner(self) -> T {
        match self {
            Loaded::Detached(value) => value,
            Loaded::Tracked(handle) => handle.snapshot(),
        }
    }

    /// Change the value in place. Only tracked values are written on commit.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        match self {
            Loaded::Detached(value) => f(value),
            Loaded::Tracked(handle) => handle.modify(f),
        }
    }

    pub fn as_tracked(&self) -> Option<&Tracked<T>> {
        match self {
            Loaded::Tracked(handle) => Some(handle),
            Loaded::Detached(_) => None,
        }
    }
}

/// Type-erased view of a tracked entity for change detection
trait ChangeProbe: Send + Sync {
    /// Field writes needed to bring the store in line with the live value
    fn pending(&self) -> Vec<Assignment>;

    /// Treat the live value as the new original
    fn accept(&mut self);

    fn as_any(&self) -> &dyn Any;
}

struct TrackedSlot<T> {
    original: T,
    live: Tracked<T>,
}

impl<T: Entity> ChangeProbe for TrackedSlot<T> {
    fn pending(&self) -> Vec<Assignment> {
        let current = self.live.snapshot();
        if current == self.original {
            return Vec::new();
        }

        let before = self.original.assignments();
        current
            .assignments()
            .into_iter()
            .filter(|(field, value)| {
                before
                    .iter()
                    .find(|(name, _)| name == field)
                    .is_none_or(|(_, old)| old != value)
            })
            .collect()
    }

    fn accept(&mut self) {
        self.original = self.live.snapshot();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct SessionState {
    creates: Vec<(RecordKey, Vec<Assignment>)>,
    deletes: Vec<RecordKey>,
    tracked: BTreeMap<RecordKey, Box<dyn ChangeProbe>>,
    /// Records read or created through this session
    attached: HashSet<RecordKey>,
}

/// One write in a commit
#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    Create {
        key: RecordKey,
        assignments: Vec<Assignment>,
    },
    Update {
        key: RecordKey,
        assignments: Vec<Assignment>,
    },
    Delete {
        key: RecordKey,
    },
}

impl Mutation {
    fn key(&self) -> &RecordKey {
        match self {
            Mutation::Create { key, .. } | Mutation::Update { key, .. } | Mutation::Delete { key } => {
                key
            }
        }
    }

    fn describe(&self) -> String {
        let verb = match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        };
        format!("{} {}", verb, self.key())
    }

    /// Render as a single SurrealQL statement. Parameters are namespaced by
    /// the mutation's position so statements never collide.
    fn render(&self, index: usize, bindings: &mut Vec<Binding>) -> String {
        let key = self.key();
        let id_param = format!("m{}_id", index);
        bindings.push((id_param.clone(), serde_json::Value::String(key.id.clone())));
        let target = format!("type::thing(\"{}\", ${})", key.table, id_param);

        match self {
            Mutation::Create { assignments, .. } => {
                format!("CREATE {} SET {}", target, set_clause(index, assignments, bindings))
            }
            Mutation::Update { assignments, .. } => format!(
                "IF array::len((UPDATE {} SET {} RETURN AFTER)) = 0 {{ THROW \"{} {}\" }}",
                target,
                set_clause(index, assignments, bindings),
                STALE_RECORD,
                key
            ),
            Mutation::Delete { .. } => format!("DELETE {}", target),
        }
    }
}

fn set_clause(index: usize, assignments: &[Assignment], bindings: &mut Vec<Binding>) -> String {
    assignments
        .iter()
        .map(|(field, value)| {
            let expr = value.render(&format!("m{}_{}", index, field), bindings);
            format!("{} = {}", field, expr)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map the first real statement error of a failed commit to a `DbError`.
fn classify_failure(
    mut errors: Vec<(usize, surrealdb::Error)>,
    mutations: &[Mutation],
    leading: usize,
) -> DbError {
    errors.sort_by_key(|(index, _)| *index);
    let position = errors
        .iter()
        .position(|(_, e)| !e.to_string().contains(NOT_EXECUTED))
        .unwrap_or(0);
    let (index, source) = errors.swap_remove(position);

    let mutation = index
        .checked_sub(leading)
        .and_then(|i| mutations.get(i))
        .map(Mutation::describe)
        .unwrap_or_else(|| "transaction".to_string());

    let message = source.to_string();
    debug!("Commit failed at {}: {}", mutation, message);

    if message.contains(STALE_RECORD) || message.contains(RETRYABLE) {
        DbError::ConcurrentModification {
            mutation,
            source: Box::new(source),
        }
    } else {
        DbError::Commit {
            mutation,
            source: Box::new(source),
        }
    }
}

/// Unit of work shared by the repositories of one manager
pub struct Session {
    client: Surreal<Db>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Session")
            .field("staged_creates", &state.creates.len())
            .field("staged_deletes", &state.deletes.len())
            .field("tracked", &state.tracked.len())
            .finish()
    }
}

impl Session {
    pub fn new(client: Surreal<Db>) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn client(&self) -> &Surreal<Db> {
        &self.client
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a read result in the requested mode.
    pub(crate) fn load<T: Entity>(&self, entity: T, track_changes: bool) -> Loaded<T> {
        if track_changes {
            Loaded::Tracked(self.track(entity))
        } else {
            let key = RecordKey::of(&entity);
            self.state().attached.insert(key);
            Loaded::Detached(entity)
        }
    }

    /// Return the session's handle for this record, tracking it if needed.
    fn track<T: Entity>(&self, entity: T) -> Tracked<T> {
        let key = RecordKey::of(&entity);
        let mut state = self.state();
        state.attached.insert(key.clone());

        if let Some(slot) = state
            .tracked
            .get(&key)
            .and_then(|probe| probe.as_any().downcast_ref::<TrackedSlot<T>>())
        {
            trace!("Reusing tracked handle for {}", key);
            return slot.live.clone();
        }

        trace!("Tracking {}", key);
        let live = Tracked::new(entity.clone());
        state.tracked.insert(
            key,
            Box::new(TrackedSlot {
                original: entity,
                live: live.clone(),
            }),
        );
        live
    }

    /// Stage an insert, assigning an id when the entity has none.
    pub(crate) fn stage_create<T: Entity>(&self, mut entity: T) -> String {
        if entity.id().is_empty() {
            entity.set_id(crate::id::generate());
        }
        let id = entity.id().to_string();
        let key = RecordKey::of(&entity);

        debug!("Staging create of {}", key);
        trace!("Entity: {:?}", entity);

        self.state().creates.push((key, entity.assignments()));
        id
    }

    /// Stage a removal. Deleting a staged create cancels it.
    pub(crate) fn stage_delete<T: Entity>(&self, entity: &T) -> DbResult<()> {
        let key = RecordKey::of(entity);
        let mut state = self.state();

        if let Some(position) = state.creates.iter().position(|(k, _)| k == &key) {
            debug!("Cancelling staged create of {}", key);
            state.creates.remove(position);
            return Ok(());
        }

        if !state.attached.contains(&key) {
            return Err(DbError::Detached {
                table: T::TABLE,
                id: key.id,
            });
        }

        if !state.deletes.contains(&key) {
            debug!("Staging delete of {}", key);
            state.deletes.push(key);
        }
        Ok(())
    }

    /// Creates first, then updates of tracked entities, then deletes.
    fn plan(&self) -> Vec<Mutation> {
        let state = self.state();
        let mut mutations = Vec::new();

        for (key, assignments) in &state.creates {
            mutations.push(Mutation::Create {
                key: key.clone(),
                assignments: assignments.clone(),
            });
        }

        for (key, probe) in &state.tracked {
            if state.deletes.contains(key) {
                continue;
            }
            let assignments = probe.pending();
            if !assignments.is_empty() {
                mutations.push(Mutation::Update {
                    key: key.clone(),
                    assignments,
                });
            }
        }

        for key in &state.deletes {
            mutations.push(Mutation::Delete { key: key.clone() });
        }

        mutations
    }

    /// Number of writes the next commit would perform
    pub fn pending_changes(&self) -> usize {
        self.plan().len()
    }

    pub fn has_changes(&self) -> bool {
        self.pending_changes() > 0
    }

    /// Write every staged create, tracked change and staged delete in one
    /// transaction. Returns the number of records written.
    ///
    /// On failure nothing is persisted and the staged state is kept, so the
    /// caller may fix it and retry or drop the session.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConcurrentModification` when a tracked record
    /// vanished or the engine reported a retryable conflict, and
    /// `DbError::Commit` for any other rejected write.
    pub async fn commit(&self) -> DbResult<usize> {
        let mutations = self.plan();
        if mutations.is_empty() {
            debug!("Nothing to commit");
            return Ok(0);
        }

        let mut bindings = Vec::new();
        let statements: Vec<String> = mutations
            .iter()
            .enumerate()
            .map(|(index, mutation)| mutation.render(index, &mut bindings))
            .collect();
        let sql = format!(
            "BEGIN TRANSACTION;\n{};\nCOMMIT TRANSACTION;",
            statements.join(";\n")
        );

        debug!("Committing {} mutations", mutations.len());
        trace!("Commit query: {}", sql);

        let mut query = self.client.query(sql);
        for binding in bindings {
            query = query.bind(binding);
        }

        let mut response = query.await.map_err(|e| {
            debug!("Commit query failed to execute: {}", e);
            DbError::Query(Box::new(e))
        })?;

        let statement_count = response.num_statements();
        let errors: Vec<(usize, surrealdb::Error)> =
            response.take_errors().into_iter().collect();
        if !errors.is_empty() {
            let leading = usize::from(statement_count > mutations.len());
            return Err(classify_failure(errors, &mutations, leading));
        }

        self.finish(&mutations);
        debug!("Committed {} mutations", mutations.len());
        Ok(mutations.len())
    }

    fn finish(&self, mutations: &[Mutation]) {
        let mut state = self.state();
        for mutation in mutations {
            match mutation {
                Mutation::Create { key, .. } => {
                    state.creates.retain(|(k, _)| k != key);
                    state.attached.insert(key.clone());
                }
                Mutation::Update { key, .. } => {
                    if let Some(probe) = state.tracked.get_mut(key) {
                        probe.accept();
                    }
                }
                Mutation::Delete { key } => {
                    state.deletes.retain(|k| k != key);
                    state.tracked.remove(key);
                    state.attached.remove(key);
                }
            }
        }
    }
}

static_assertions::assert_impl_all!(Session: Send, Sync);
