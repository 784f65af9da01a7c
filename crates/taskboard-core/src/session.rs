use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::form::{FormMode, Submission, TaskForm, Validation};
use crate::i18n::{Catalog, Locale, Messages};
use crate::prefs::{PreferenceStore, save_locale};
use crate::render::Renderer;
use crate::store::{Clock, StatusFilter, SystemClock, TaskStore};
use crate::task::{Status, TaskPatch};
use crate::view::{BoardView, StatusCounts, derive_view, status_counts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRefError {
    Empty,
    Unknown,
    Ambiguous,
}

impl TaskRefError {
    pub fn message_id(self) -> &'static str {
        match self {
            TaskRefError::Empty => "session.missingTask",
            TaskRefError::Unknown => "session.unknownTask",
            TaskRefError::Ambiguous => "session.ambiguousTask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Created(Uuid),
    Updated(Uuid),
}

/// One running board: the store plus the transient UI state around it.
pub struct Session<C: Clock = SystemClock> {
    store: TaskStore<C>,
    catalog: Catalog,
    locale: Locale,
    prefs: Box<dyn PreferenceStore>,
    renderer: Renderer,
    form: Option<TaskForm>,
}

impl<C: Clock> Session<C> {
    pub fn new(
        store: TaskStore<C>,
        catalog: Catalog,
        locale: Locale,
        prefs: Box<dyn PreferenceStore>,
        renderer: Renderer,
    ) -> Self {
        Self {
            store,
            catalog,
            locale,
            prefs,
            renderer,
            form: None,
        }
    }

    pub fn store(&self) -> &TaskStore<C> {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn messages(&self) -> Messages<'_> {
        Messages::new(&self.catalog, self.locale)
    }

    pub fn view(&self) -> BoardView<'_> {
        derive_view(
            self.store.tasks(),
            self.store.filter(),
            self.store.search_query(),
        )
    }

    pub fn counts(&self) -> StatusCounts {
        status_counts(self.store.tasks())
    }

    /// Switches the display language and remembers it. The switch sticks
    /// even when saving fails.
    #[tracing::instrument(skip(self))]
    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
        if let Err(err) = save_locale(self.prefs.as_ref(), locale) {
            warn!(error = %err, "language preference not saved");
        }
        info!(locale = %locale, "language switched");
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.store.set_filter(filter);
    }

    pub fn set_search_query(&mut self, query: String) {
        self.store.set_search_query(query);
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn is_form_open(&self) -> bool {
        self.form.is_some()
    }

    /// Task currently open in the edit dialog.
    pub fn editing(&self) -> Option<Uuid> {
        match self.form.as_ref()?.mode() {
            FormMode::Edit(id) => Some(id),
            FormMode::Create => None,
        }
    }

    pub fn open_create_form(&mut self) -> &mut TaskForm {
        debug!("opening create form");
        self.form.insert(TaskForm::create())
    }

    /// Opens the dialog pre-filled from the task; `None` if it is gone.
    pub fn open_edit_form(&mut self, id: Uuid) -> Option<&mut TaskForm> {
        let task = self.store.get(id)?;
        debug!(%id, "opening edit form");
        Some(self.form.insert(TaskForm::edit(task)))
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Validates the open form. On success the store is updated and the
    /// dialog closes; on failure it stays open with its errors.
    #[tracing::instrument(skip(self))]
    pub fn submit_form(&mut self) -> Option<Result<Submitted, Validation>> {
        let form = self.form.as_mut()?;
        let submission = match form.submit() {
            Ok(submission) => submission,
            Err(errors) => {
                debug!(?errors, "form submission blocked");
                return Some(Err(errors));
            }
        };
        self.form = None;
        Some(Ok(self.apply_submission(submission)))
    }

    fn apply_submission(&mut self, submission: Submission) -> Submitted {
        match submission.mode {
            FormMode::Create => Submitted::Created(self.store.create(submission.into_new_task())),
            FormMode::Edit(id) => {
                self.store.update(id, submission.into_patch());
                Submitted::Updated(id)
            }
        }
    }

    pub fn change_status(&mut self, id: Uuid, status: Status) {
        self.store.update(id, TaskPatch::status(status));
    }

    /// Deletes only when the user confirmed. Returns whether a task was
    /// removed.
    #[tracing::instrument(skip(self))]
    pub fn delete_confirmed(&mut self, id: Uuid, confirmed: bool) -> bool {
        if !confirmed {
            debug!("deletion declined");
            return false;
        }
        let existed = self.store.get(id).is_some();
        self.store.delete(id);
        if self.editing() == Some(id) {
            self.close_form();
        }
        existed
    }

    /// Resolves a full id or a unique prefix of its hex form.
    pub fn resolve(&self, reference: &str) -> Result<Uuid, TaskRefError> {
        let needle: String = reference
            .trim()
            .chars()
            .filter(|ch| *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        if needle.is_empty() {
            return Err(TaskRefError::Empty);
        }

        let mut matches = self
            .store
            .tasks()
            .iter()
            .filter(|task| task.id.simple().to_string().starts_with(&needle));
        let first = matches.next().ok_or(TaskRefError::Unknown)?;
        if matches.next().is_some() {
            return Err(TaskRefError::Ambiguous);
        }
        Ok(first.id)
    }
}
