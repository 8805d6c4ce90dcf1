//! Message templates for appointment notifications.
//!
//! Templates are static process-wide configuration. Rendering is plain
//! `{{variable}}` substitution; a placeholder with no value renders as an
//! empty string so template syntax never reaches a recipient.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::warn;

use shared_models::appointment::Appointment;

use crate::error::NotificationError;
use crate::models::NotificationContent;

pub const APPOINTMENT_REMINDER_24H: &str = "APPOINTMENT_REMINDER_24H";
pub const APPOINTMENT_REMINDER_2H: &str = "APPOINTMENT_REMINDER_2H";
pub const APPOINTMENT_CONFIRMATION: &str = "APPOINTMENT_CONFIRMATION";
pub const APPOINTMENT_CANCELLED: &str = "APPOINTMENT_CANCELLED";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub subject: Option<String>,
    pub message: String,
    /// Variables the template expects to be supplied.
    pub variables: Vec<String>,
}

impl Template {
    pub fn new(name: &str, subject: Option<&str>, message: &str, variables: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            subject: subject.map(str::to_string),
            message: message.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn render(&self, variables: &TemplateVariables) -> NotificationContent {
        NotificationContent {
            subject: self.subject.as_deref().map(|s| render_text(s, variables)),
            message: render_text(&self.message, variables),
        }
    }
}

/// Values substituted into templates, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables(BTreeMap<String, String>);

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Variables describing `appointment`, with the date shown using `date_format`.
    pub fn for_appointment(appointment: &Appointment, date_format: &str) -> Self {
        let mut vars = Self::new();
        vars.insert("clientName", &appointment.client)
            .insert("date", display_date(appointment.date, date_format))
            .insert("time", appointment.time.format("%H:%M"))
            .insert("type", &appointment.appointment_type)
            .insert("title", &appointment.title)
            .insert("description", appointment.description.as_deref().unwrap_or_default())
            .insert("case", appointment.case_ref.as_deref().unwrap_or_default());
        vars
    }
}

/// Formats `date` with `format`, falling back to ISO `YYYY-MM-DD` when the
/// format cannot render a date.
fn display_date(date: NaiveDate, format: &str) -> String {
    let mut rendered = String::new();
    if write!(rendered, "{}", date.format(format)).is_err() {
        warn!(date_format = format, "Display date format cannot render a date, using ISO");
        return date.to_string();
    }
    rendered
}

/// Replaces every `{{key}}` in `text`. Unknown keys become empty strings.
pub fn render_text(text: &str, variables: &TemplateVariables) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            variables.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

pub struct TemplateCatalog {
    templates: HashMap<String, Template>,
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.name.clone(), template);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Template, NotificationError> {
        self.templates
            .get(name)
            .ok_or_else(|| NotificationError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn render(
        &self,
        name: &str,
        variables: &TemplateVariables,
    ) -> Result<NotificationContent, NotificationError> {
        Ok(self.get(name)?.render(variables))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::empty()
            .with_template(Template::new(
                APPOINTMENT_REMINDER_24H,
                Some("Reminder: appointment tomorrow"),
                "Hello {{clientName}},\n\n\
                 This is a reminder that you have an appointment tomorrow:\n\n\
                 Date: {{date}}\n\
                 Time: {{time}}\n\
                 Type: {{type}}\n\
                 Title: {{title}}\n\n\
                 Please confirm your attendance or contact us if you need to reschedule.\n\n\
                 Kind regards,\n\
                 Scheduling Team",
                &["clientName", "date", "time", "type", "title"],
            ))
            .with_template(Template::new(
                APPOINTMENT_REMINDER_2H,
                Some("Reminder: your appointment is in 2 hours"),
                "Hello {{clientName}},\n\n\
                 Your appointment starts in 2 hours:\n\n\
                 Time: {{time}}\n\
                 {{title}}\n\n\
                 See you soon!",
                &["clientName", "time", "title"],
            ))
            .with_template(Template::new(
                APPOINTMENT_CONFIRMATION,
                Some("Appointment confirmed"),
                "Hello {{clientName}},\n\n\
                 Your appointment has been confirmed:\n\n\
                 Date: {{date}}\n\
                 Time: {{time}}\n\
                 Type: {{type}}\n\
                 Title: {{title}}\n\n\
                 See you then!",
                &["clientName", "date", "time", "type", "title"],
            ))
            .with_template(Template::new(
                APPOINTMENT_CANCELLED,
                Some("Appointment cancelled"),
                "Hello {{clientName}},\n\n\
                 Your appointment has been cancelled:\n\n\
                 Date: {{date}}\n\
                 Time: {{time}}\n\
                 Title: {{title}}\n\n\
                 Contact us if you would like to reschedule.",
                &["clientName", "date", "time", "title"],
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::TestAppointment;

    #[test]
    fn render_substitutes_every_occurrence() {
        let mut vars = TemplateVariables::new();
        vars.insert("name", "Ana");
        assert_eq!(render_text("{{name}} / {{ name }}", &vars), "Ana / Ana");
    }

    #[test]
    fn missing_variables_render_empty() {
        let vars = TemplateVariables::new();
        assert_eq!(render_text("Hi {{clientName}}!", &vars), "Hi !");
    }

    #[test]
    fn default_catalog_leaves_no_placeholders() {
        let catalog = TemplateCatalog::default();
        let appointment = TestAppointment::in_hours(30).to_appointment();
        let vars = TemplateVariables::for_appointment(&appointment, "%d/%m/%Y");

        for name in catalog.names() {
            let template = catalog.get(name).unwrap();
            for variable in &template.variables {
                assert!(vars.get(variable).is_some(), "{name} expects {variable}");
            }

            let content = template.render(&vars);
            assert!(!content.message.contains("{{"), "{name} leaked a placeholder");
            assert!(!content.subject.unwrap_or_default().contains("{{"));
        }
    }

    #[test]
    fn appointment_variables_use_display_format() {
        let appointment = TestAppointment::in_hours(30).to_appointment();
        let vars = TemplateVariables::for_appointment(&appointment, "%d/%m/%Y");

        assert_eq!(vars.get("date"), Some("02/01/2030"));
        assert_eq!(vars.get("time"), Some("15:00"));
        assert_eq!(vars.get("clientName"), Some("Ana Lima"));
    }

    #[test]
    fn date_format_with_time_fields_falls_back_to_iso() {
        let appointment = TestAppointment::in_hours(30).to_appointment();
        let vars = TemplateVariables::for_appointment(&appointment, "%d/%m/%Y %H:%M");

        assert_eq!(vars.get("date"), Some("2030-01-02"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let catalog = TemplateCatalog::default();
        let result = catalog.render("NOPE", &TemplateVariables::new());
        assert_matches!(result, Err(NotificationError::TemplateNotFound(name)) if name == "NOPE");
    }
}
