//! Transactional email templates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde_json::{Value, json};
use tracing::{debug, warn};

use nestly_core::error::{AppError, ErrorKind};
use nestly_core::events::expense::format_amount;
use nestly_core::result::AppResult;
use nestly_core::traits::{DeliveryOutcome, DeliveryProvider, EmailMessage};
use nestly_core::types::id::{ExpenseId, TaskId};

/// Shared by every template. `action_url` and `action_label` come from the caller.
const PARTIALS: &[(&str, &str)] = &[
    ("greeting_html", "<p>Hi {{name}},</p>"),
    ("greeting_text", "Hi {{{name}}},\n\n"),
    (
        "footer_html",
        r#"<p><a href="{{action_url}}">{{action_label}}</a></p><p>Nestly</p>"#,
    ),
    ("footer_text", "\n{{{action_label}}}: {{{action_url}}}\n\n- Nestly\n"),
];

/// `(name, subject, text body, html body)`. Text and subject use triple
/// braces; only the html body is escaped.
const TEMPLATES: &[(&str, &str, &str, &str)] = &[
    (
        "task_assigned",
        "New task: {{{task_title}}}",
        "{{> greeting_text}}{{{actor}}} assigned you a new task: \"{{{task_title}}}\".\n\
         {{#if due}}It is due {{{due}}}.\n{{/if}}{{> footer_text}}",
        "{{> greeting_html}}<p>{{actor}} assigned you a new task: \"{{task_title}}\".</p>\
         {{#if due}}<p>It is due {{due}}.</p>{{/if}}{{> footer_html}}",
    ),
    (
        "task_reassigned",
        "Task reassigned: {{{task_title}}}",
        "{{> greeting_text}}{{{actor}}} reassigned \"{{{task_title}}}\" from {{{previous}}} to you.\n\
         {{> footer_text}}",
        "{{> greeting_html}}<p>{{actor}} reassigned \"{{task_title}}\" from {{previous}} to you.</p>\
         {{> footer_html}}",
    ),
    (
        "task_completed",
        "Completed: {{{task_title}}}",
        "{{> greeting_text}}{{{actor}}} completed \"{{{task_title}}}\".\n{{> footer_text}}",
        "{{> greeting_html}}<p>{{actor}} completed \"{{task_title}}\".</p>{{> footer_html}}",
    ),
    (
        "task_due_soon",
        "Due soon: {{{task_title}}}",
        "{{> greeting_text}}Reminder: \"{{{task_title}}}\" is due {{{due}}}.\n{{> footer_text}}",
        "{{> greeting_html}}<p>Reminder: \"{{task_title}}\" is due {{due}}.</p>{{> footer_html}}",
    ),
    (
        "expense_settled",
        "Settled: {{{description}}}",
        "{{> greeting_text}}\"{{{description}}}\" ({{{amount}}}) is now fully settled. \
         Nothing left to pay.\n{{> footer_text}}",
        "{{> greeting_html}}<p>\"{{description}}\" ({{amount}}) is now fully settled. \
         Nothing left to pay.</p>{{> footer_html}}",
    ),
];

/// Addressee of a transactional email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRecipient {
    /// Email address.
    pub email: String,
    /// Display name used in the greeting.
    pub name: String,
}

impl MailRecipient {
    /// Creates a new recipient.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Renders and sends task and expense emails.
///
/// Every method returns the provider's outcome. Failures, including
/// template errors, are logged at warn and never surface as errors.
#[derive(Debug, Clone)]
pub struct TransactionalMailer {
    provider: Arc<dyn DeliveryProvider>,
    templates: Arc<Handlebars<'static>>,
    app_url: String,
}

impl TransactionalMailer {
    /// Compiles the templates. `app_url` prefixes every action link.
    pub fn new(provider: Arc<dyn DeliveryProvider>, app_url: &str) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .map_err(|e| template_error(name, e))?;
        }
        for (name, subject, text, html) in TEMPLATES {
            for (part, source) in [("subject", subject), ("text", text), ("html", html)] {
                let key = format!("{name}.{part}");
                registry
                    .register_template_string(&key, *source)
                    .map_err(|e| template_error(&key, e))?;
            }
        }

        Ok(Self {
            provider,
            templates: Arc::new(registry),
            app_url: app_url.trim_end_matches('/').to_string(),
        })
    }

    /// A task was assigned to the recipient.
    pub async fn send_task_assigned(
        &self,
        to: &MailRecipient,
        task_id: TaskId,
        task_title: &str,
        assigned_by: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> DeliveryOutcome {
        let data = json!({
            "task_title": task_title,
            "actor": assigned_by,
            "due": due_date.map(format_due),
        });
        self.deliver("task_assigned", to, data, ("View task", format!("/tasks/{task_id}")))
            .await
    }

    /// A task moved from someone else to the recipient.
    pub async fn send_task_reassigned(
        &self,
        to: &MailRecipient,
        task_id: TaskId,
        task_title: &str,
        reassigned_by: &str,
        previous_assignee: &str,
    ) -> DeliveryOutcome {
        let data = json!({
            "task_title": task_title,
            "actor": reassigned_by,
            "previous": previous_assignee,
        });
        self.deliver("task_reassigned", to, data, ("View task", format!("/tasks/{task_id}")))
            .await
    }

    /// A task the recipient created or follows was completed.
    pub async fn send_task_completed(
        &self,
        to: &MailRecipient,
        task_id: TaskId,
        task_title: &str,
        completed_by: &str,
    ) -> DeliveryOutcome {
        let data = json!({ "task_title": task_title, "actor": completed_by });
        self.deliver("task_completed", to, data, ("View task", format!("/tasks/{task_id}")))
            .await
    }

    /// Reminder for a task nearing its due date.
    pub async fn send_task_due_soon(
        &self,
        to: &MailRecipient,
        task_id: TaskId,
        task_title: &str,
        due_date: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let data = json!({ "task_title": task_title, "due": format_due(due_date) });
        self.deliver("task_due_soon", to, data, ("Open task", format!("/tasks/{task_id}")))
            .await
    }

    /// Every share of an expense has been paid.
    pub async fn send_expense_settled(
        &self,
        to: &MailRecipient,
        expense_id: ExpenseId,
        description: &str,
        amount_cents: i64,
        currency: &str,
    ) -> DeliveryOutcome {
        let data = json!({
            "description": description,
            "amount": format_amount(amount_cents, currency),
        });
        let action = ("View expense", format!("/expenses/{expense_id}"));
        self.deliver("expense_settled", to, data, action).await
    }

    async fn deliver(
        &self,
        template: &str,
        to: &MailRecipient,
        data: Value,
        action: (&str, String),
    ) -> DeliveryOutcome {
        let message = match self.render(template, to, data, action) {
            Ok(message) => message,
            Err(e) => {
                warn!(template, error = %e, "Email template failed to render");
                return DeliveryOutcome::Failed {
                    reason: e.message,
                };
            }
        };

        let outcome = self.provider.send(&message).await;
        match &outcome {
            DeliveryOutcome::Sent { message_id } => {
                debug!(
                    template,
                    provider = self.provider.name(),
                    message_id = %message_id,
                    "Email sent"
                );
            }
            DeliveryOutcome::Failed { reason } => {
                warn!(
                    template,
                    provider = self.provider.name(),
                    to = %message.to,
                    reason = %reason,
                    "Email delivery failed"
                );
            }
        }
        outcome
    }

    fn render(
        &self,
        template: &str,
        to: &MailRecipient,
        mut data: Value,
        (label, path): (&str, String),
    ) -> AppResult<EmailMessage> {
        if let Value::Object(fields) = &mut data {
            fields.insert("name".into(), Value::from(to.name.as_str()));
            fields.insert("action_label".into(), Value::from(label));
            fields.insert("action_url".into(), Value::from(format!("{}{path}", self.app_url)));
        }

        let part = |suffix: &str| {
            let key = format!("{template}.{suffix}");
            self.templates
                .render(&key, &data)
                .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("render {key}"), e))
        };

        Ok(EmailMessage {
            to: to.email.clone(),
            subject: part("subject")?,
            text_body: part("text")?,
            html_body: part("html")?,
        })
    }
}

fn template_error(name: &str, err: handlebars::TemplateError) -> AppError {
    AppError::with_source(
        ErrorKind::Configuration,
        format!("email template {name} does not compile"),
        err,
    )
}

fn format_due(due: DateTime<Utc>) -> String {
    due.format("%A, %B %-d at %H:%M UTC").to_string()
}
