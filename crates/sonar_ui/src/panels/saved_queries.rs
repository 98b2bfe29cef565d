//! Saved queries drawer and its create/edit form.

use sonar_core::{LocalStorage, SavedQuery, SonarError};
use std::sync::Arc;
use uuid::Uuid;

/// Field a validation message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Query,
}

/// A validation message for one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Create/edit form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedQueryForm {
    pub name: String,
    pub query: String,
    pub log_groups: Vec<String>,
}

impl SavedQueryForm {
    /// Form pre-filled from an existing saved query.
    pub fn from_saved(saved: &SavedQuery) -> Self {
        Self { name: saved.name.clone(), query: saved.query.clone(), log_groups: saved.log_groups.clone() }
    }

    /// Every failing field; empty when the form is valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError { field: FormField::Name, message: "Name is required" });
        }
        if self.query.trim().is_empty() {
            errors.push(FieldError { field: FormField::Query, message: "Query is required" });
        }
        errors
    }
}

/// Saved query library backed by local storage.
pub struct SavedQueriesPanel {
    storage: Arc<LocalStorage>,
    filter: String,
}

impl SavedQueriesPanel {
    pub fn new(storage: Arc<LocalStorage>) -> Self {
        Self { storage, filter: String::new() }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Saved queries matching the current filter, ordered by name.
    pub fn list(&self) -> Result<Vec<SavedQuery>, SonarError> {
        self.storage.search_saved_queries(&self.filter)
    }

    /// Create a saved query, or update `existing` when given.
    pub fn save(&self, form: &SavedQueryForm, existing: Option<Uuid>) -> Result<SavedQuery, SonarError> {
        if let Some(error) = form.validate().first() {
            return Err(SonarError::validation(error.message));
        }

        let name = form.name.trim();
        let saved = match existing {
            Some(id) => {
                let mut saved = self
                    .storage
                    .load_saved_query(id)?
                    .ok_or_else(|| SonarError::validation(format!("Saved query not found: {id}")))?;
                saved.name = name.to_string();
                saved.query = form.query.clone();
                saved.log_groups = form.log_groups.clone();
                saved
            }
            None => SavedQuery::new(name, form.query.clone(), form.log_groups.clone()),
        };

        self.storage.save_query(&saved)?;
        Ok(saved)
    }

    pub fn delete(&self, id: Uuid) -> Result<bool, SonarError> {
        self.storage.delete_saved_query(id)
    }

    /// Look up by id, then by exact name.
    pub fn resolve(&self, id_or_name: &str) -> Result<Option<SavedQuery>, SonarError> {
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            if let Some(saved) = self.storage.load_saved_query(id)? {
                return Ok(Some(saved));
            }
        }
        self.storage.find_saved_query(id_or_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> SavedQueriesPanel {
        SavedQueriesPanel::new(Arc::new(LocalStorage::open_in_memory().unwrap()))
    }

    #[test]
    fn test_validation_messages() {
        let form = SavedQueryForm { name: "  ".into(), query: "\n".into(), log_groups: Vec::new() };
        let errors = form.validate();
        assert_eq!(
            errors,
            vec![
                FieldError { field: FormField::Name, message: "Name is required" },
                FieldError { field: FormField::Query, message: "Query is required" },
            ]
        );

        let err = panel().save(&form, None).unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn test_save_update_filter_delete() {
        let panel = panel();
        let form = SavedQueryForm {
            name: " Errors ".into(),
            query: "filter @message like /ERROR/".into(),
            log_groups: vec!["/app/api".into()],
        };
        let created = panel.save(&form, None).unwrap();
        assert_eq!(created.name, "Errors");

        panel
            .save(
                &SavedQueryForm { name: "Slow".into(), query: "filter duration > 1000".into(), log_groups: vec![] },
                None,
            )
            .unwrap();

        let mut edit = SavedQueryForm::from_saved(&created);
        edit.log_groups.push("/app/worker".into());
        let updated = panel.save(&edit, Some(created.id)).unwrap();
        assert_eq!(updated.id, created.id);

        let mut panel = panel;
        panel.set_filter("WORKER");
        let found = panel.list().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].log_groups, vec!["/app/api", "/app/worker"]);

        panel.set_filter("");
        assert_eq!(panel.list().unwrap().len(), 2);

        assert_eq!(panel.resolve("Slow").unwrap().unwrap().query, "filter duration > 1000");
        assert_eq!(panel.resolve(&created.id.to_string()).unwrap().unwrap().name, "Errors");

        assert!(panel.delete(created.id).unwrap());
        assert!(panel.resolve("Errors").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_query_fails() {
        let form = SavedQueryForm { name: "x".into(), query: "fields @message".into(), log_groups: vec![] };
        assert!(panel().save(&form, Some(Uuid::new_v4())).is_err());
    }
}
