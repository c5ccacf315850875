//! Category hierarchy, selection and form logic. Nothing here touches the
//! terminal or a store.

pub mod form;
pub mod hierarchy;
pub mod selection;

pub use form::{CategoryForm, FormError, FormField, FormMode, FormSubmission, ParentRef};
pub use hierarchy::{build_forest, CategoryEntry, CategoryForest, CategoryNode, PATH_SEPARATOR};
pub use selection::{CategorySelection, SelectOutcome, SelectionMode};
