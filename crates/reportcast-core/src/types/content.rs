//! Channel-ready message content.

use serde::{Deserialize, Serialize};

/// Formatted content handed to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text, optionally with a subject line.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        body: String,
    },

    /// A self-contained HTML document.
    Html { subject: String, body: String },

    /// A server-side template; only the variables travel.
    Template { variables: TemplateVariables },
}

impl MessageContent {
    /// Subject line, if the content has one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            MessageContent::Text { subject, .. } => subject.as_deref(),
            MessageContent::Html { subject, .. } => Some(subject),
            MessageContent::Template { .. } => None,
        }
    }

    /// Free-form body. Templates have none.
    pub fn body(&self) -> Option<&str> {
        match self {
            MessageContent::Text { body, .. } | MessageContent::Html { body, .. } => Some(body),
            MessageContent::Template { .. } => None,
        }
    }

    /// Template id for template content.
    pub fn template_id(&self) -> Option<&'static str> {
        match self {
            MessageContent::Template { variables } => Some(variables.template_id()),
            _ => None,
        }
    }

    /// Template variables for template content.
    pub fn variables(&self) -> Option<&TemplateVariables> {
        match self {
            MessageContent::Template { variables } => Some(variables),
            _ => None,
        }
    }

    /// The text recorded on the delivery ledger for this content.
    pub fn snapshot(&self) -> String {
        match self {
            MessageContent::Text { body, .. } | MessageContent::Html { body, .. } => body.clone(),
            MessageContent::Template { variables } => {
                let pairs = variables
                    .pairs()
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}] {}", variables.template_id(), pairs)
            }
        }
    }
}

/// Variables for a server-rendered template, one variant per template id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateVariables {
    #[serde(rename_all = "camelCase")]
    ReportSummary {
        academy_name: String,
        student_name: String,
        period: String,
        avg_score: u32,
        attendance_rate: u32,
        homework_rate: u32,
        report_url: String,
    },
}

impl TemplateVariables {
    /// Template id registered with the transport.
    pub fn template_id(&self) -> &'static str {
        match self {
            TemplateVariables::ReportSummary { .. } => "REPORT_SUMMARY",
        }
    }

    /// Variable name/value pairs in a stable order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            TemplateVariables::ReportSummary {
                academy_name,
                student_name,
                period,
                avg_score,
                attendance_rate,
                homework_rate,
                report_url,
            } => vec![
                ("academyName", academy_name.clone()),
                ("studentName", student_name.clone()),
                ("period", period.clone()),
                ("avgScore", avg_score.to_string()),
                ("attendanceRate", attendance_rate.to_string()),
                ("homeworkRate", homework_rate.to_string()),
                ("reportUrl", report_url.clone()),
            ],
        }
    }

    /// Substitute `#{name}` placeholders in a template text.
    pub fn render(&self, template: &str) -> String {
        self.pairs()
            .into_iter()
            .fold(template.to_string(), |text, (key, value)| {
                text.replace(&format!("#{{{}}}", key), &value)
            })
    }
}
