use chrono::NaiveDate;
use uuid::Uuid;

use crate::datetime::{format_date_input, parse_date_input};
use crate::task::{NewTask, Priority, Task, TaskPatch};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MIN_CHARS: usize = 5;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    DueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    TitleRequired,
    TitleTooShort,
    TitleTooLong,
    DescriptionRequired,
    DescriptionTooShort,
    DescriptionTooLong,
    DueDateInvalid,
}

impl FieldError {
    pub fn field(self) -> Field {
        match self {
            FieldError::TitleRequired | FieldError::TitleTooShort | FieldError::TitleTooLong => {
                Field::Title
            }
            FieldError::DescriptionRequired
            | FieldError::DescriptionTooShort
            | FieldError::DescriptionTooLong => Field::Description,
            FieldError::DueDateInvalid => Field::DueDate,
        }
    }

    pub fn message_id(self) -> &'static str {
        match self {
            FieldError::TitleRequired => "taskForm.validation.titleRequired",
            FieldError::TitleTooShort => "taskForm.validation.titleMinLength",
            FieldError::TitleTooLong => "taskForm.validation.titleMaxLength",
            FieldError::DescriptionRequired => "taskForm.validation.descriptionRequired",
            FieldError::DescriptionTooShort => "taskForm.validation.descriptionMinLength",
            FieldError::DescriptionTooLong => "taskForm.validation.descriptionMaxLength",
            FieldError::DueDateInvalid => "taskForm.validation.dueDateInvalid",
        }
    }
}

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub title: Option<FieldError>,
    pub description: Option<FieldError>,
    pub due_date: Option<FieldError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }

    pub fn error_for(&self, field: Field) -> Option<FieldError> {
        match field {
            Field::Title => self.title,
            Field::Description => self.description,
            Field::DueDate => self.due_date,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = FieldError> + '_ {
        [self.title, self.description, self.due_date]
            .into_iter()
            .flatten()
    }

    fn clear(&mut self, field: Field) {
        match field {
            Field::Title => self.title = None,
            Field::Description => self.description = None,
            Field::DueDate => self.due_date = None,
        }
    }
}

pub fn validate(draft: &TaskDraft) -> Validation {
    Validation {
        title: check_length(
            &draft.title,
            TITLE_MIN_CHARS,
            TITLE_MAX_CHARS,
            [
                FieldError::TitleRequired,
                FieldError::TitleTooShort,
                FieldError::TitleTooLong,
            ],
        ),
        description: check_length(
            &draft.description,
            DESCRIPTION_MIN_CHARS,
            DESCRIPTION_MAX_CHARS,
            [
                FieldError::DescriptionRequired,
                FieldError::DescriptionTooShort,
                FieldError::DescriptionTooLong,
            ],
        ),
        due_date: parse_due_date(&draft.due_date)
            .err()
            .map(|_| FieldError::DueDateInvalid),
    }
}

fn check_length(
    raw: &str,
    min: usize,
    max: usize,
    [required, too_short, too_long]: [FieldError; 3],
) -> Option<FieldError> {
    let chars = raw.trim().chars().count();
    if chars == 0 {
        Some(required)
    } else if chars < min {
        Some(too_short)
    } else if chars > max {
        Some(too_long)
    } else {
        None
    }
}

fn parse_due_date(raw: &str) -> anyhow::Result<Option<NaiveDate>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date_input(raw).map(Some)
}

/// Trimmed, validated form values ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub mode: FormMode,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl Submission {
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
        }
    }

    /// Every form field is written back; an empty due date clears it.
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title),
            description: Some(self.description),
            status: None,
            priority: Some(self.priority),
            due_date: Some(self.due_date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(Uuid),
}

/// The create/edit dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    mode: FormMode,
    draft: TaskDraft,
    errors: Validation,
}

impl TaskForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            draft: TaskDraft::default(),
            errors: Validation::default(),
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit(task.id),
            draft: TaskDraft {
                title: task.title.clone(),
                description: task.description.clone(),
                priority: task.priority,
                due_date: task.due_date.map(format_date_input).unwrap_or_default(),
            },
            errors: Validation::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn errors(&self) -> &Validation {
        &self.errors
    }

    pub fn title_message_id(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "taskForm.createTitle",
            FormMode::Edit(_) => "taskForm.editTitle",
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
        self.errors.clear(Field::Title);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
        self.errors.clear(Field::Description);
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.draft.priority = priority;
    }

    pub fn set_due_date(&mut self, due_date: impl Into<String>) {
        self.draft.due_date = due_date.into();
        self.errors.clear(Field::DueDate);
    }

    /// Validates from scratch. On failure the errors stay on the form and
    /// are also returned.
    pub fn submit(&mut self) -> Result<Submission, Validation> {
        self.errors = validate(&self.draft);
        if !self.errors.is_valid() {
            return Err(self.errors.clone());
        }

        let due_date = parse_due_date(&self.draft.due_date).map_err(|_| self.errors.clone())?;
        Ok(Submission {
            mode: self.mode,
            title: self.draft.title.trim().to_string(),
            description: self.draft.description.trim().to_string(),
            priority: self.draft.priority,
            due_date,
        })
    }
}
