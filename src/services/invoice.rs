use std::fmt::Write as _;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Datelike, Month};
use html_escape::encode_text;

use crate::error::ApiError;
use crate::model::invoice::InvoiceWeek;
use crate::model::timesheet::{Attachment, Timesheet};
use crate::services::mailer::OutgoingAttachment;
use crate::utils::weeks::distinct_weeks;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub struct InvoiceDocument {
    pub html: String,
    pub total_hours: f64,
    pub total_amount: f64,
}

/// Renders the e-mailed invoice: one table row per week plus a total row.
pub fn build_invoice_html(employee_name: Option<&str>, weeks: &[InvoiceWeek]) -> InvoiceDocument {
    let mut total_hours = 0.0;
    let mut total_amount = 0.0;

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<html>
  <body style="font-family: Arial, sans-serif; margin: 20px;">
    <h2>Invoice from CentraPro</h2>
    <p>Employee: {}</p>
    <table border="1" cellpadding="10">
      <tr><th>Week</th><th>Project</th><th>Task</th><th>Hours</th><th>Rate</th><th>Amount</th></tr>
"#,
        encode_text(employee_name.unwrap_or("Contractor"))
    );

    for week in weeks {
        let amount = week.amount();
        total_hours += week.hours;
        total_amount += amount;

        let _ = writeln!(
            html,
            "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{}h</td><td>${}</td><td>${:.2}</td></tr>",
            encode_text(&week.week_start),
            encode_text(&week.project),
            encode_text(&week.task),
            week.hours,
            week.hourly_rate,
            amount
        );
    }

    let _ = write!(
        html,
        r#"      <tr style="background: #f0f0f0; font-weight: bold;"><td colspan="3">TOTAL</td><td>{total_hours}h</td><td></td><td>${total_amount:.2}</td></tr>
    </table>
  </body>
</html>
"#
    );

    InvoiceDocument {
        html,
        total_hours,
        total_amount,
    }
}

pub fn decode_attachments(attachments: &[Attachment]) -> Result<Vec<OutgoingAttachment>, ApiError> {
    attachments
        .iter()
        .map(|att| {
            let content = STANDARD.decode(att.data.trim()).map_err(|e| {
                ApiError::bad_request(format!("Attachment {} is not valid base64: {e}", att.name))
            })?;
            Ok(OutgoingAttachment {
                filename: att.name.clone(),
                content,
                content_type: att
                    .content_type
                    .clone()
                    .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
            })
        })
        .collect()
}

/// Hours an employee logged in one calendar month, and how many ISO weeks they span.
#[derive(Debug, PartialEq)]
pub struct MonthSummary {
    pub total_hours: f64,
    pub weeks: usize,
}

pub fn summarize_month(
    timesheets: &[Timesheet],
    employee_id: u64,
    year: i32,
    month: u32,
) -> MonthSummary {
    let rows: Vec<&Timesheet> = timesheets
        .iter()
        .filter(|t| t.user_id == Some(employee_id))
        .filter(|t| t.date.year() == year && t.date.month() == month)
        .collect();

    MonthSummary {
        total_hours: rows.iter().map(|t| t.hours).sum(),
        weeks: distinct_weeks(rows.iter().map(|t| t.date)),
    }
}

pub fn month_name(month: u32) -> Option<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn week(start: &str, project: &str, hours: f64) -> InvoiceWeek {
        InvoiceWeek {
            week_start: start.into(),
            week_number: None,
            project: project.into(),
            task: "Development".into(),
            hours,
            hourly_rate: 65.0,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn totals_and_escapes_rows() {
        let doc = build_invoice_html(
            Some("Ann <Contractor>"),
            &[week("Dec 01, 2025", "Spruce & Co", 40.0), week("Dec 08, 2025", "Spruce", 32.5)],
        );
        assert_eq!(doc.total_hours, 72.5);
        assert_eq!(doc.total_amount, 72.5 * 65.0);
        assert!(doc.html.contains("Ann &lt;Contractor&gt;"));
        assert!(doc.html.contains("Spruce &amp; Co"));
        assert!(doc.html.contains("<td>40h</td><td>$65</td><td>$2600.00</td>"));
        assert!(doc.html.contains("$4712.50"));
    }

    #[test]
    fn rejects_invalid_base64() {
        let bad = Attachment {
            name: "a.pdf".into(),
            data: "%%%".into(),
            content_type: None,
            uploaded_at: None,
        };
        assert!(matches!(decode_attachments(&[bad]), Err(ApiError::BadRequest(_))));

        let good = Attachment {
            name: "b.txt".into(),
            data: "aGVsbG8=".into(),
            content_type: None,
            uploaded_at: None,
        };
        let decoded = decode_attachments(&[good]).unwrap();
        assert_eq!(decoded[0].content, b"hello");
        assert_eq!(decoded[0].content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn summarizes_one_employee_month() {
        let ts = |user: u64, y, m, d, hours| Timesheet {
            id: 0,
            user_id: Some(user),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            hours,
            project: "Spruce".into(),
            task: "Development".into(),
            hourly_rate: None,
            status: Default::default(),
            week_start: None,
            week_number: None,
            attachments: Vec::new(),
            rejection_reason: None,
            submitted_at: None,
            approved_at: None,
            created_at: Utc::now(),
            extra: Default::default(),
        };
        let rows = vec![
            ts(1, 2025, 12, 1, 8.0),
            ts(1, 2025, 12, 2, 8.0),
            ts(1, 2025, 12, 9, 8.0),
            ts(2, 2025, 12, 16, 8.0),
            ts(1, 2025, 11, 28, 8.0),
        ];
        assert_eq!(
            summarize_month(&rows, 1, 2025, 12),
            MonthSummary { total_hours: 24.0, weeks: 2 }
        );
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(13), None);
    }
}
