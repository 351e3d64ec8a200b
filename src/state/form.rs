//! Form state: values, per-field errors and touched flags
//!
//! Editing a field clears that field's error and nothing else, so fixing one
//! input never hides the messages of the others.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::util::errors::format_error;

/// Key under which [`FormHandlers::handle_submit`] stores a failed submit.
pub const FORM_ERROR_KEY: &str = "_form";

/// One validation rule: `check` must hold for `field`, otherwise `message`.
#[derive(Clone)]
pub struct FieldRule<V> {
    pub field: String,
    pub message: String,
    check: Arc<dyn Fn(&V) -> bool + Send + Sync>,
}

impl<V> FieldRule<V> {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            check: Arc::new(check),
        }
    }

    pub fn passes(&self, value: &V) -> bool {
        (self.check)(value)
    }
}

impl<V> fmt::Debug for FieldRule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("field", &self.field)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState<V> {
    initial: BTreeMap<String, V>,
    values: BTreeMap<String, V>,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
}

impl<V> FormState<V>
where
    V: Clone + PartialEq + Default,
{
    pub fn new<I, K>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        let initial: BTreeMap<String, V> = initial.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: initial.clone(),
            initial,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
        }
    }

    pub fn values(&self) -> &BTreeMap<String, V> {
        &self.values
    }

    pub fn value(&self, field: &str) -> Option<&V> {
        self.values.get(field)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    /// Set one field and clear only that field's error.
    pub fn update_field(&mut self, field: impl Into<String>, value: V) {
        let field = field.into();
        self.errors.remove(&field);
        self.values.insert(field, value);
    }

    pub fn update_fields<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        for (field, value) in values {
            self.update_field(field, value);
        }
    }

    pub fn set_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    pub fn set_errors(&mut self, errors: BTreeMap<String, String>) {
        self.errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn touch(&mut self, field: impl Into<String>) {
        self.touched.insert(field.into());
    }

    /// Back to the initial values with no errors and nothing touched.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.touched.clear();
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Run `rules` and replace the field errors with the first failing
    /// message per field. Absent fields are checked as `V::default()`.
    pub fn validate(&mut self, rules: &[FieldRule<V>]) -> bool {
        let fallback = V::default();
        let mut errors = BTreeMap::new();
        for rule in rules {
            if errors.contains_key(&rule.field) {
                continue;
            }
            let value = self.values.get(&rule.field).unwrap_or(&fallback);
            if !rule.passes(value) {
                errors.insert(rule.field.clone(), rule.message.clone());
            }
        }
        debug!(failed = errors.len(), "Form validated");
        self.errors = errors;
        self.errors.is_empty()
    }
}

/// Change/blur/submit handlers bound to a form and its rules.
#[derive(Debug)]
pub struct FormHandlers<V> {
    form: FormState<V>,
    rules: Vec<FieldRule<V>>,
    submitting: bool,
}

impl<V> FormHandlers<V>
where
    V: Clone + PartialEq + Default,
{
    pub fn new(form: FormState<V>, rules: Vec<FieldRule<V>>) -> Self {
        Self {
            form,
            rules,
            submitting: false,
        }
    }

    pub fn form(&self) -> &FormState<V> {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState<V> {
        &mut self.form
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn handle_change(&mut self, field: impl Into<String>, value: V) {
        self.form.update_field(field, value);
    }

    /// Mark the field touched and re-check only its own rules.
    pub fn handle_blur(&mut self, field: impl Into<String>) {
        let field = field.into();
        self.form.touch(field.clone());

        let fallback = V::default();
        let value = self.form.value(&field).cloned().unwrap_or(fallback);
        let failed = self
            .rules
            .iter()
            .filter(|rule| rule.field == field)
            .find(|rule| !rule.passes(&value));
        match failed {
            Some(rule) => self.form.set_field_error(field, rule.message.clone()),
            None => {
                self.form.errors.remove(&field);
            }
        }
    }

    /// Validate every field and, when valid, run `submit` with the values.
    /// A failed submit is stored under [`FORM_ERROR_KEY`]. Returns whether
    /// the submit ran and succeeded.
    pub async fn handle_submit<F, Fut, E>(&mut self, submit: F) -> bool
    where
        F: FnOnce(BTreeMap<String, V>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        let fields: Vec<String> = self.rules.iter().map(|rule| rule.field.clone()).collect();
        for field in fields {
            self.form.touch(field);
        }
        if !self.form.validate(&self.rules) {
            return false;
        }

        self.submitting = true;
        let result = submit(self.form.values.clone()).await;
        self.submitting = false;

        match result {
            Ok(()) => true,
            Err(err) => {
                self.form.set_field_error(FORM_ERROR_KEY, format_error(&err));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::validation::{has_min_length, is_valid_email};

    fn signup_form() -> FormState<String> {
        FormState::new([("email", String::new()), ("name", String::new())])
    }

    fn signup_rules() -> Vec<FieldRule<String>> {
        vec![
            FieldRule::new("email", "Enter a valid email", |v: &String| is_valid_email(v)),
            FieldRule::new("name", "Name is too short", |v: &String| has_min_length(v, 2)),
        ]
    }

    #[test]
    fn test_update_field_clears_only_its_error() {
        let mut form = signup_form();
        form.set_field_error("email", "bad email");
        form.set_field_error("name", "bad name");

        form.update_field("email", "ada@shop.example".to_string());

        assert!(form.error("email").is_none());
        assert_eq!(form.error("name"), Some("bad name"));
        assert!(form.is_dirty());
    }

    #[test]
    fn test_reset_restores_initial() {
        let mut form = signup_form();
        form.update_fields([("name", "Ada".to_string())]);
        form.touch("name");
        form.set_field_error("email", "required");

        form.reset();
        assert!(!form.is_dirty());
        assert!(!form.has_errors());
        assert!(!form.is_touched("name"));
    }

    #[test]
    fn test_validate_reports_per_field() {
        let mut form = signup_form();
        form.update_field("name", "Ada".to_string());

        assert!(!form.validate(&signup_rules()));
        assert_eq!(form.error("email"), Some("Enter a valid email"));
        assert!(form.error("name").is_none());
    }

    #[test]
    fn test_blur_checks_single_field() {
        let mut handlers = FormHandlers::new(signup_form(), signup_rules());
        handlers.handle_change("name", "A".to_string());
        handlers.handle_blur("name");

        assert!(handlers.form().is_touched("name"));
        assert_eq!(handlers.form().error("name"), Some("Name is too short"));
        assert!(handlers.form().error("email").is_none());
    }

    #[tokio::test]
    async fn test_submit_runs_only_when_valid() {
        let mut handlers = FormHandlers::new(signup_form(), signup_rules());
        let ran = handlers.handle_submit(|_| async { Ok::<_, String>(()) }).await;
        assert!(!ran);
        assert!(handlers.form().is_touched("email"));

        handlers.handle_change("email", "ada@shop.example".to_string());
        handlers.handle_change("name", "Ada".to_string());
        let ran = handlers
            .handle_submit(|values| async move {
                assert_eq!(values["name"], "Ada");
                Err::<(), _>("server rejected")
            })
            .await;
        assert!(!ran);
        assert_eq!(handlers.form().error(FORM_ERROR_KEY), Some("server rejected"));
        assert!(!handlers.is_submitting());
    }
}
