//! Content formatting.
//!
//! Pure functions from a [`Report`] and a target [`Channel`] to
//! [`MessageContent`]. Everything needed beyond the report (link base URL,
//! fallback academy name) comes in through [`FormatContext`]; nothing here
//! reads configuration or performs I/O.

use crate::error::FormatError;
use reportcast_core::{
    Channel, Config, ConfigError, MessageContent, Report, ReportData, TemplateVariables,
};
use std::fmt::Write;
use url::Url;

/// Inputs the formatter needs besides the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    /// Base URL of the report viewer.
    pub base_url: Url,

    /// Academy name used when the report carries none.
    pub academy_name: Option<String>,

    /// Shorter base URL for SMS links.
    pub short_base_url: Option<Url>,
}

impl FormatContext {
    pub fn new(base_url: Url, academy_name: Option<String>) -> Self {
        Self {
            base_url,
            academy_name,
            short_base_url: None,
        }
    }

    pub fn with_short_base_url(mut self, url: Url) -> Self {
        self.short_base_url = Some(url);
        self
    }

    /// Build from the `reports` section of the configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config.report_base_url()?,
            academy_name: config.reports.academy_name.clone(),
            short_base_url: config.report_short_base_url()?,
        })
    }
}

/// Link to the full report: `<base>/reports/<id>`.
pub fn report_link(base_url: &Url, report_id: &str) -> Result<String, FormatError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| FormatError::InvalidLink(base_url.to_string()))?
        .pop_if_empty()
        .push("reports")
        .push(report_id);
    Ok(url.to_string())
}

/// Format a report for a channel.
///
/// - `SMS`: compact link-oriented text, no subject; links use the short
///   base URL when one is configured
/// - `LMS`: subject, metrics summary and link (also the fallback form)
/// - `KAKAO`: template variables only
/// - `EMAIL`: subject plus a self-contained HTML document
pub fn format_report(
    report: &Report,
    channel: Channel,
    ctx: &FormatContext,
) -> Result<MessageContent, FormatError> {
    let academy = academy_name(report.data(), ctx)?;
    let link = report_link(&ctx.base_url, report.id())?;
    let data = report.data();

    Ok(match channel {
        Channel::Sms => {
            let link = match &ctx.short_base_url {
                Some(short) => report_link(short, report.id())?,
                None => link,
            };
            MessageContent::Text {
                subject: None,
                body: short_body(&academy, data, &link),
            }
        }
        Channel::Kakao => MessageContent::Template {
            variables: TemplateVariables::ReportSummary {
                academy_name: academy,
                student_name: data.student.name.clone(),
                period: data.period.to_string(),
                avg_score: data.avg_score,
                attendance_rate: data.attendance.rate,
                homework_rate: data.homework.rate,
                report_url: link,
            },
        },
        Channel::Email => MessageContent::Html {
            subject: subject(&academy, data),
            body: html_body(&academy, data, &link),
        },
        Channel::Lms => MessageContent::Text {
            subject: Some(subject(&academy, data)),
            body: long_body(&academy, data, &link),
        },
    })
}

fn academy_name(data: &ReportData, ctx: &FormatContext) -> Result<String, FormatError> {
    data.academy
        .as_ref()
        .map(|a| a.name.trim())
        .filter(|n| !n.is_empty())
        .or_else(|| {
            ctx.academy_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
        })
        .map(str::to_string)
        .ok_or(FormatError::MissingAcademy)
}

fn subject(academy: &str, data: &ReportData) -> String {
    format!("[{}] {} 학습 리포트", academy, data.student.name)
}

fn short_body(academy: &str, data: &ReportData, link: &str) -> String {
    format!(
        "[{}] {} 학습 리포트\n{}",
        academy, data.student.name, link
    )
}

fn long_body(academy: &str, data: &ReportData, link: &str) -> String {
    let mut body = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(body, "안녕하세요, {} 학생 보호자님.", data.student.name);
    let _ = writeln!(
        body,
        "{}에서 {} 학습 리포트를 보내드립니다.",
        academy, data.period
    );
    let _ = writeln!(body);
    let _ = writeln!(
        body,
        "■ 평균 점수: {}점 (시험 {}회)",
        data.avg_score,
        data.exams.len()
    );
    let _ = writeln!(
        body,
        "■ 출석률: {}% (출석 {}일 / 총 {}일)",
        data.attendance.rate, data.attendance.present_days, data.attendance.total_days
    );
    let _ = writeln!(
        body,
        "■ 과제 완료율: {}% ({}/{})",
        data.homework.rate, data.homework.completed, data.homework.total
    );
    if let Some(comment) = data.comment.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(body);
        let _ = writeln!(body, "[선생님 코멘트]");
        let _ = writeln!(body, "{}", comment.trim());
    }
    let _ = writeln!(body);
    let _ = write!(body, "자세한 리포트 보기: {}", link);
    body
}

fn html_body(academy: &str, data: &ReportData, link: &str) -> String {
    let mut exams = String::new();
    for exam in &data.exams {
        let _ = write!(
            exams,
            "<tr><td>{}</td><td>{}</td><td>{} / {}</td><td>{}%</td></tr>",
            escape(&exam.name),
            exam.date,
            exam.score,
            exam.max_score,
            exam.percentage
        );
    }
    if exams.is_empty() {
        exams.push_str("<tr><td colspan=\"4\">기간 내 시험이 없습니다.</td></tr>");
    }

    let mut consultations = String::new();
    for c in &data.consultations {
        let category = c
            .category
            .as_deref()
            .map(|cat| format!("[{}] ", escape(cat)))
            .unwrap_or_default();
        let _ = write!(
            consultations,
            "<li>{} {}{}</li>",
            c.date,
            category,
            escape(&c.summary)
        );
    }

    let comment = data
        .comment
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(|c| {
            format!(
                "<h2>선생님 코멘트</h2><p>{}</p>",
                escape(c.trim()).replace('\n', "<br>")
            )
        })
        .unwrap_or_default();

    let consultations = if consultations.is_empty() {
        String::new()
    } else {
        format!("<h2>상담 기록</h2><ul>{}</ul>", consultations)
    };

    format!(
        concat!(
            "<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"utf-8\">",
            "<title>{title}</title></head>",
            "<body style=\"font-family:sans-serif;max-width:640px;margin:0 auto\">",
            "<h1>{title}</h1>",
            "<p>{student} 학생의 {period} 학습 리포트입니다.</p>",
            "<table border=\"1\" cellpadding=\"6\" style=\"border-collapse:collapse\">",
            "<tr><th>평균 점수</th><td>{avg}점</td></tr>",
            "<tr><th>출석률</th><td>{att}% (출석 {present}일 / 지각 {late}일 / 결석 {absent}일)</td></tr>",
            "<tr><th>과제 완료율</th><td>{hw}% ({done}/{total})</td></tr>",
            "</table>",
            "<h2>시험 결과</h2>",
            "<table border=\"1\" cellpadding=\"6\" style=\"border-collapse:collapse\">",
            "<tr><th>시험</th><th>날짜</th><th>점수</th><th>백분율</th></tr>{exams}</table>",
            "{consultations}{comment}",
            "<p><a href=\"{link}\">전체 리포트 보기</a></p>",
            "<p style=\"color:#888\">{academy}</p>",
            "</body></html>"
        ),
        title = escape(&subject(academy, data)),
        student = escape(&data.student.name),
        period = data.period,
        avg = data.avg_score,
        att = data.attendance.rate,
        present = data.attendance.present_days,
        late = data.attendance.late_days,
        absent = data.attendance.absent_days,
        hw = data.homework.rate,
        done = data.homework.completed,
        total = data.homework.total,
        exams = exams,
        consultations = consultations,
        comment = comment,
        link = escape(link),
        academy = escape(academy),
    )
}

/// Escape text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
