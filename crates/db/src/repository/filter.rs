//! Range filters for listings
//!
//! Pure predicates over fetched entities: an inclusive priority range for
//! projects and tasks, and a start/completion date window for projects.
//! Neither validates its bounds; an inverted range simply matches nothing.

use super::base::{Entity, Query};
use super::params::ProjectParameters;
use crate::models::{Project, Task};
use chrono::{DateTime, Utc};

/// An entity carrying a priority
pub trait Prioritized {
    fn priority(&self) -> u32;
}

impl Prioritized for Project {
    fn priority(&self) -> u32 {
        self.priority
    }
}

impl Prioritized for Task {
    fn priority(&self) -> u32 {
        self.priority
    }
}

/// Inclusive priority bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityRange {
    pub min: u32,
    pub max: u32,
}

impl PriorityRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, priority: u32) -> bool {
        self.min <= priority && priority <= self.max
    }
}

/// Start-date bounds plus optional completion-date bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectDateWindow {
    pub min_start: DateTime<Utc>,
    pub max_start: DateTime<Utc>,
    pub min_completion: Option<DateTime<Utc>>,
    pub max_completion: Option<DateTime<Utc>>,
}

impl From<&ProjectParameters> for ProjectDateWindow {
    fn from(params: &ProjectParameters) -> Self {
        Self {
            min_start: params.min_start_date,
            max_start: params.max_start_date,
            min_completion: params.min_completion_date,
            max_completion: params.max_completion_date,
        }
    }
}

impl ProjectDateWindow {
    /// Whether `project` falls inside the window.
    ///
    /// A project without a completion date is excluded as soon as either
    /// completion bound is set.
    pub fn admits(&self, project: &Project) -> bool {
        let started_in_range =
            self.min_start <= project.start_date && project.start_date <= self.max_start;
        started_in_range && self.admits_completion(project.completion_date)
    }

    fn admits_completion(&self, completion: Option<DateTime<Utc>>) -> bool {
        match (self.min_completion, self.max_completion, completion) {
            (None, None, _) => true,
            (_, _, None) => false,
            (Some(min), Some(max), Some(done)) => min <= done && done <= max,
            (Some(min), None, Some(done)) => done >= min,
            (None, Some(max), Some(done)) => done <= max,
        }
    }
}

impl<'s, T: Entity + Prioritized> Query<'s, T> {
    /// Keep entities whose priority lies in `[min, max]`.
    pub fn filter_priority(self, min: u32, max: u32) -> Self {
        let range = PriorityRange::new(min, max);
        self.filter(|item| range.contains(item.priority()))
    }
}

impl<'s> Query<'s, Project> {
    /// Keep projects inside the start and completion date window.
    pub fn filter_dates(self, window: &ProjectDateWindow) -> Self {
        self.filter(|project| window.admits(project))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn project(name: &str, completion: Option<DateTime<Utc>>) -> Project {
        let mut project = Project::new(name, day(2024, 1, 1));
        project.completion_date = completion;
        project
    }

    /// Completed in March, June, September, and never
    fn fixture() -> Vec<Project> {
        vec![
            project("march", Some(day(2024, 3, 1))),
            project("june", Some(day(2024, 6, 1))),
            project("september", Some(day(2024, 9, 1))),
            project("open", None),
        ]
    }

    fn admitted(window: &ProjectDateWindow) -> Vec<String> {
        fixture()
            .into_iter()
            .filter(|p| window.admits(p))
            .map(|p| p.name)
            .collect()
    }

    fn window(
        min_completion: Option<DateTime<Utc>>,
        max_completion: Option<DateTime<Utc>>,
    ) -> ProjectDateWindow {
        ProjectDateWindow {
            min_start: DateTime::<Utc>::MIN_UTC,
            max_start: DateTime::<Utc>::MAX_UTC,
            min_completion,
            max_completion,
        }
    }

    #[test]
    fn test_priority_range_is_inclusive() {
        let range = PriorityRange::new(2, 4);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_inverted_priority_range_matches_nothing() {
        let range = PriorityRange::new(5, 1);
        assert!((0..10).all(|p| !range.contains(p)));
    }

    #[test]
    fn test_completion_both_bounds() {
        let w = window(Some(day(2024, 5, 1)), Some(day(2024, 9, 1)));
        assert_eq!(admitted(&w), vec!["june", "september"]);
    }

    #[test]
    fn test_completion_min_only() {
        let w = window(Some(day(2024, 6, 1)), None);
        assert_eq!(admitted(&w), vec!["june", "september"]);
    }

    #[test]
    fn test_completion_max_only() {
        let w = window(None, Some(day(2024, 6, 1)));
        assert_eq!(admitted(&w), vec!["march", "june"]);
    }

    #[test]
    fn test_completion_no_bounds_admits_everything() {
        let w = window(None, None);
        assert_eq!(admitted(&w), vec!["march", "june", "september", "open"]);
    }

    #[test]
    fn test_missing_completion_excluded_under_min_bound() {
        let w = window(Some(day(2024, 1, 1)), None);
        assert!(!w.admits(&project("open", None)));
    }

    #[test]
    fn test_start_bounds_are_inclusive() {
        let mut w = window(None, None);
        w.min_start = day(2024, 1, 1);
        w.max_start = day(2024, 1, 1);
        assert!(w.admits(&project("edge", None)));

        w.min_start = day(2024, 1, 2);
        assert!(!w.admits(&project("edge", None)));
    }

    #[test]
    fn test_window_from_parameters() {
        let params = ProjectParameters::new().with_completion_range(Some(day(2024, 1, 1)), None);
        let w = ProjectDateWindow::from(&params);
        assert_eq!(w.min_completion, Some(day(2024, 1, 1)));
        assert_eq!(w.max_completion, None);
        assert_eq!(w.min_start, DateTime::<Utc>::MIN_UTC);
    }
}
