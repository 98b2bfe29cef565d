//! Log group picker.

/// Loading status of the option list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PickerStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    Finished,
    Error(String),
}

/// Available log groups and the ordered selection.
#[derive(Debug, Clone, Default)]
pub struct LogGroupPicker {
    options: Vec<String>,
    selected: Vec<String>,
    status: PickerStatus,
}

impl LogGroupPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &PickerStatus {
        &self.status
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Options containing `filter`, case-insensitively.
    pub fn filtered_options(&self, filter: &str) -> Vec<&str> {
        let filter = filter.to_lowercase();
        self.options
            .iter()
            .filter(|o| o.to_lowercase().contains(&filter))
            .map(String::as_str)
            .collect()
    }

    pub fn set_loading(&mut self) {
        self.status = PickerStatus::Loading;
    }

    /// Replace the option list. The selection is kept.
    pub fn set_options(&mut self, options: Vec<String>) {
        self.options = options;
        self.status = PickerStatus::Finished;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = PickerStatus::Error(message.into());
    }

    /// Selected log groups in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// The log group when exactly one is selected.
    pub fn single_selected(&self) -> Option<&str> {
        match self.selected.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Add a log group to the selection. Returns false if already selected.
    pub fn select(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.selected.contains(&name) {
            return false;
        }
        self.selected.push(name);
        true
    }

    /// Remove a log group from the selection.
    pub fn deselect(&mut self, name: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|s| s != name);
        self.selected.len() != before
    }

    /// Replace the selection, dropping duplicates.
    pub fn set_selected(&mut self, names: Vec<String>) {
        self.selected.clear();
        for name in names {
            self.select(name);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_order_and_single() {
        let mut picker = LogGroupPicker::new();
        assert_eq!(picker.status(), &PickerStatus::Idle);

        picker.set_loading();
        picker.set_options(vec!["/app/api".into(), "/app/worker".into(), "/aws/lambda/Fn".into()]);
        assert_eq!(picker.status(), &PickerStatus::Finished);
        assert_eq!(picker.filtered_options("APP"), vec!["/app/api", "/app/worker"]);

        assert!(picker.select("/app/worker"));
        assert_eq!(picker.single_selected(), Some("/app/worker"));
        assert!(picker.select("/app/api"));
        assert!(!picker.select("/app/api"));
        assert_eq!(picker.selected(), ["/app/worker".to_string(), "/app/api".to_string()]);
        assert_eq!(picker.single_selected(), None);

        assert!(picker.deselect("/app/worker"));
        assert!(!picker.deselect("/app/worker"));

        picker.set_selected(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(picker.selected().len(), 2);
        picker.clear_selection();
        assert!(picker.selected().is_empty());

        picker.set_error("Access denied");
        assert_eq!(picker.status(), &PickerStatus::Error("Access denied".into()));
        assert_eq!(picker.options().len(), 3);
    }
}
