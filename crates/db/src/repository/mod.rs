//! Repository modules for database operations
//!
//! A generic base repository over the session, the sort and range-filter
//! layer that composes listings, and the project and task repositories
//! built from them.

pub mod base;
mod filter;
mod manager;
mod params;
mod project;
mod sort;
mod task;

pub use base::{Assignment, BaseRepository, Condition, Entity, FieldValue, Query};
pub use filter::{Prioritized, PriorityRange, ProjectDateWindow};
pub use manager::RepositoryManager;
pub use params::{ProjectParameters, RequestParameters, TaskParameters};
pub use project::{NewProject, ProjectRepository, ProjectRow, ProjectUpdate};
pub use sort::{Direction, OrderBy, SortField, SortKey, Sortable};
pub use task::{NewTask, TaskRepository, TaskRow, TaskUpdate};
