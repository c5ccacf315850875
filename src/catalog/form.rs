//! Create/edit form state and validation for a single category.
//!
//! Validation runs before anything reaches a repository: a name that is empty
//! after trimming never produces a request.

use std::borrow::Cow;
use thiserror::Error;

use crate::storage::{Category, CategoryUpdate, NewCategory};
use crate::util::strip_control_chars;

/// Upper bound on a category name, in characters.
pub const MAX_NOME_CHARS: usize = 120;
/// Upper bound on a description, in characters.
pub const MAX_DESCRICAO_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name is too long (max {MAX_NOME_CHARS} characters)")]
    NameTooLong,
}

/// Strip control characters and surrounding whitespace from a name.
///
/// Rejects names that end up empty, so `"  "` and a bare ANSI escape are both
/// refused.
pub fn clean_nome(input: &str) -> Result<String, FormError> {
    let stripped = strip_control_chars(input);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return Err(FormError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NOME_CHARS {
        return Err(FormError::NameTooLong);
    }
    Ok(trimmed.to_owned())
}

/// Blank descriptions are stored as NULL.
pub fn clean_descricao(input: &str) -> Option<String> {
    let stripped = strip_control_chars(input);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_DESCRICAO_CHARS).collect())
    }
}

// ============================================================================
// Form State
// ============================================================================

/// Which input receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Nome,
    Descricao,
}

/// Parent a new category will be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub id: i64,
    pub caminho: String,
}

/// What the form submits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create { parent: Option<ParentRef> },
    Edit { id: i64 },
}

/// Validated result of a submit, ready for the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormSubmission {
    Create(NewCategory),
    Update { id: i64, update: CategoryUpdate },
}

/// Text inputs for the create/edit dialog.
#[derive(Debug, Clone)]
pub struct CategoryForm {
    pub mode: FormMode,
    pub nome: String,
    pub descricao: String,
    pub field: FormField,
    /// After a successful create, reset and stay open for another sibling.
    pub keep_creating: bool,
    /// A request is in flight; further submits are ignored.
    pub submitting: bool,
}

impl CategoryForm {
    pub fn create(parent: Option<ParentRef>, keep_creating: bool) -> Self {
        Self {
            mode: FormMode::Create { parent },
            nome: String::new(),
            descricao: String::new(),
            field: FormField::Nome,
            keep_creating,
            submitting: false,
        }
    }

    pub fn edit(category: &Category) -> Self {
        Self {
            mode: FormMode::Edit { id: category.id },
            nome: category.nome.clone(),
            descricao: category.descricao.clone().unwrap_or_default(),
            field: FormField::Nome,
            keep_creating: false,
            submitting: false,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self.mode, FormMode::Create { .. })
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        match &self.mode {
            FormMode::Create { parent } => parent.as_ref(),
            FormMode::Edit { .. } => None,
        }
    }

    /// Replace the parent of a create form. No effect when editing.
    pub fn set_parent(&mut self, new_parent: Option<ParentRef>) {
        if let FormMode::Create { parent } = &mut self.mode {
            *parent = new_parent;
        }
    }

    pub fn active_input(&mut self) -> &mut String {
        match self.field {
            FormField::Nome => &mut self.nome,
            FormField::Descricao => &mut self.descricao,
        }
    }

    /// Append a typed character, capped per field.
    pub fn push_char(&mut self, c: char) {
        let cap = match self.field {
            FormField::Nome => MAX_NOME_CHARS,
            FormField::Descricao => MAX_DESCRICAO_CHARS,
        };
        let input = self.active_input();
        if input.chars().count() < cap {
            input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.active_input().pop();
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Nome => FormField::Descricao,
            FormField::Descricao => FormField::Nome,
        };
    }

    /// Validate the inputs and build the repository payload.
    pub fn submission(&self) -> Result<FormSubmission, FormError> {
        let nome = clean_nome(&self.nome)?;
        let descricao = clean_descricao(&self.descricao);
        Ok(match &self.mode {
            FormMode::Create { parent } => FormSubmission::Create(NewCategory {
                nome,
                descricao,
                parent_id: parent.as_ref().map(|p| p.id),
            }),
            FormMode::Edit { id } => FormSubmission::Update {
                id: *id,
                update: CategoryUpdate {
                    nome: Some(nome),
                    descricao: Some(descricao),
                },
            },
        })
    }

    /// Clear the inputs for the next sibling, keeping the parent.
    pub fn reset_for_next(&mut self) {
        self.nome.clear();
        self.descricao.clear();
        self.field = FormField::Nome;
        self.submitting = false;
    }

    /// Title shown on the dialog border.
    pub fn title(&self) -> Cow<'static, str> {
        match &self.mode {
            FormMode::Create { parent: None } => Cow::Borrowed(" New Category "),
            FormMode::Create { parent: Some(_) } => Cow::Borrowed(" New Subcategory "),
            FormMode::Edit { .. } => Cow::Borrowed(" Edit Category "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_nome_trims() {
        assert_eq!(clean_nome("  Bolos  ").unwrap(), "Bolos");
    }

    #[test]
    fn test_clean_nome_rejects_blank() {
        assert_eq!(clean_nome(""), Err(FormError::EmptyName));
        assert_eq!(clean_nome("   \t "), Err(FormError::EmptyName));
    }

    #[test]
    fn test_clean_nome_strips_escape_sequences() {
        assert_eq!(clean_nome("\x1b[31mTortas\x1b[0m").unwrap(), "Tortas");
        assert_eq!(clean_nome("\x1b[31m\x1b[0m"), Err(FormError::EmptyName));
    }

    #[test]
    fn test_clean_nome_length_cap() {
        let long = "a".repeat(MAX_NOME_CHARS + 1);
        assert_eq!(clean_nome(&long), Err(FormError::NameTooLong));
        let exact = "ç".repeat(MAX_NOME_CHARS);
        assert!(clean_nome(&exact).is_ok());
    }

    #[test]
    fn test_clean_descricao_blank_is_none() {
        assert_eq!(clean_descricao("   "), None);
        assert_eq!(clean_descricao(" Massa fina "), Some("Massa fina".to_string()));
    }

    #[test]
    fn test_create_submission_carries_parent() {
        let mut form = CategoryForm::create(
            Some(ParentRef {
                id: 7,
                caminho: "Bolos".to_string(),
            }),
            false,
        );
        form.nome = " Recheados ".to_string();
        assert_eq!(
            form.submission().unwrap(),
            FormSubmission::Create(NewCategory {
                nome: "Recheados".to_string(),
                descricao: None,
                parent_id: Some(7),
            })
        );
    }

    #[test]
    fn test_empty_submission_is_rejected() {
        let form = CategoryForm::create(None, false);
        assert_eq!(form.submission(), Err(FormError::EmptyName));
    }

    #[test]
    fn test_edit_submission_clears_blank_description() {
        let category = Category {
            id: 3,
            nome: "Doces".to_string(),
            parent_id: None,
            descricao: Some("antiga".to_string()),
            created_at: None,
            updated_at: None,
        };
        let mut form = CategoryForm::edit(&category);
        assert_eq!(form.descricao, "antiga");
        form.descricao.clear();
        assert_eq!(
            form.submission().unwrap(),
            FormSubmission::Update {
                id: 3,
                update: CategoryUpdate {
                    nome: Some("Doces".to_string()),
                    descricao: Some(None),
                },
            }
        );
    }

    #[test]
    fn test_typing_goes_to_active_field() {
        let mut form = CategoryForm::create(None, false);
        form.push_char('P');
        form.push_char('a');
        form.next_field();
        form.push_char('x');
        form.backspace();
        form.push_char('y');
        assert_eq!(form.nome, "Pa");
        assert_eq!(form.descricao, "y");
    }

    #[test]
    fn test_reset_for_next_keeps_parent() {
        let parent = ParentRef {
            id: 1,
            caminho: "Bolos".to_string(),
        };
        let mut form = CategoryForm::create(Some(parent.clone()), true);
        form.nome = "Simples".to_string();
        form.submitting = true;
        form.reset_for_next();
        assert!(form.nome.is_empty());
        assert!(!form.submitting);
        assert_eq!(form.parent(), Some(&parent));
    }

    #[test]
    fn test_set_parent_ignored_when_editing() {
        let category = Category {
            id: 3,
            nome: "Doces".to_string(),
            parent_id: None,
            descricao: None,
            created_at: None,
            updated_at: None,
        };
        let mut form = CategoryForm::edit(&category);
        form.set_parent(Some(ParentRef {
            id: 9,
            caminho: "X".to_string(),
        }));
        assert_eq!(form.parent(), None);
        assert_eq!(form.mode, FormMode::Edit { id: 3 });
    }
}
