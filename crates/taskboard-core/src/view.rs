use crate::store::StatusFilter;
use crate::task::{Status, Task};

/// Filtered board, partitioned into columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView<'a> {
    pub todo: Vec<&'a Task>,
    pub in_progress: Vec<&'a Task>,
    pub done: Vec<&'a Task>,
    /// Size of the whole collection.
    pub total: usize,
    /// Tasks that passed the filter and the search.
    pub displayed: usize,
}

impl<'a> BoardView<'a> {
    pub fn column(&self, status: Status) -> &[&'a Task] {
        match status {
            Status::Todo => &self.todo,
            Status::InProgress => &self.in_progress,
            Status::Done => &self.done,
        }
    }

    /// Columns in board order.
    pub fn columns(&self) -> impl Iterator<Item = (Status, &[&'a Task])> + '_ {
        Status::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    /// Displayed tasks in collection order.
    pub fn displayed_tasks(&self, all: &'a [Task]) -> Vec<&'a Task> {
        all.iter()
            .filter(|task| self.column(task.status).iter().any(|shown| shown.id == task.id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn for_filter(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Only(Status::Todo) => self.todo,
            StatusFilter::Only(Status::InProgress) => self.in_progress,
            StatusFilter::Only(Status::Done) => self.done,
        }
    }
}

pub fn matches_search(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle) || task.description.to_lowercase().contains(&needle)
}

#[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
pub fn derive_view<'a>(tasks: &'a [Task], filter: StatusFilter, query: &str) -> BoardView<'a> {
    let mut view = BoardView {
        total: tasks.len(),
        ..BoardView::default()
    };

    for task in tasks
        .iter()
        .filter(|task| filter.admits(task.status) && matches_search(task, query))
    {
        match task.status {
            Status::Todo => view.todo.push(task),
            Status::InProgress => view.in_progress.push(task),
            Status::Done => view.done.push(task),
        }
        view.displayed += 1;
    }

    tracing::trace!(displayed = view.displayed, "derived board view");
    view
}

/// Per-status counts over the whole collection, ignoring filter and search.
pub fn status_counts(tasks: &[Task]) -> StatusCounts {
    tasks.iter().fold(
        StatusCounts {
            all: tasks.len(),
            ..StatusCounts::default()
        },
        |mut counts, task| {
            match task.status {
                Status::Todo => counts.todo += 1,
                Status::InProgress => counts.in_progress += 1,
                Status::Done => counts.done += 1,
            }
            counts
        },
    )
}
