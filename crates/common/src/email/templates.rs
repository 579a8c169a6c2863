//! HTML email templates

use super::OutgoingEmail;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const FALLBACK_NAME: &str = "Student";

/// Escape text for interpolation into HTML
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Human date, e.g. "Monday, March 3, 2025"
pub fn format_day(at: DateTime<Utc>) -> String {
    at.format("%A, %B %-d, %Y").to_string()
}

fn link(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn layout(preview: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{preview}</title></head>
<body style="margin:0;padding:40px 8px;background:#f8fafc;font-family:sans-serif;">
<div style="max-width:600px;margin:0 auto;background:#ffffff;border-radius:6px;overflow:hidden;">
{body}
</div>
</body>
</html>"#
    )
}

/// Reminder for one due review
pub struct ReviewReminder<'a> {
    pub to: &'a str,
    pub user_name: Option<&'a str>,
    pub study_title: &'a str,
    pub study_source_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub review_number: i64,
    pub base_url: &'a str,
}

impl ReviewReminder<'_> {
    pub fn subject(&self) -> String {
        format!("Review Reminder: {}", self.study_title)
    }

    pub fn render(&self) -> OutgoingEmail {
        let title = html_escape(self.study_title);
        let name = html_escape(self.user_name.unwrap_or(FALLBACK_NAME));

        let body = format!(
            r#"<div style="padding:32px;background:#0d9488;color:#ffffff;text-align:center;">
<h1 style="margin:0 0 8px;">Review Reminder</h1>
<p style="margin:0;font-size:18px;">It's time for Review #{number}</p>
</div>
<div style="padding:32px;color:#374151;">
<p>Hi {name},</p>
<p>This is a friendly reminder that your scheduled review session for <strong>&quot;{title}&quot;</strong> is today!</p>
<div style="padding:16px;margin-bottom:24px;background:#f0fdf4;border:2px solid #86efac;border-radius:8px;">
<p style="margin:0 0 8px;font-weight:600;">Scheduled for: {day}</p>
<p style="margin:0;">Spaced repetition helps you retain information longer. Take 10-15 minutes today to review your learning plan.</p>
</div>
<p><a href="{reviews}" style="display:inline-block;padding:12px 24px;background:#16a34a;color:#ffffff;border-radius:8px;text-decoration:none;">Start Review Session</a></p>
</div>
<div style="padding:24px;background:#f9fafb;text-align:center;font-size:14px;">
<a href="{plan}">View Learning Plan</a> &middot; <a href="{dashboard}">Dashboard</a>
</div>"#,
            number = self.review_number,
            name = name,
            title = title,
            day = format_day(self.scheduled_at),
            reviews = link(self.base_url, "/reviews"),
            plan = link(self.base_url, &format!("/study/{}/plan", self.study_source_id)),
            dashboard = link(self.base_url, "/dashboard"),
        );

        OutgoingEmail::new(
            self.to,
            self.subject(),
            layout(&format!("Time to review: {}", title), &body),
        )
    }
}

/// One entry of the schedule listed in the plan-ready email
pub struct ScheduleEntry {
    pub at: DateTime<Utc>,
    pub description: String,
}

/// Notification that a learning plan was generated
pub struct PlanReady<'a> {
    pub to: &'a str,
    pub user_name: Option<&'a str>,
    pub study_title: &'a str,
    pub study_source_id: Uuid,
    pub schedule: &'a [ScheduleEntry],
    pub base_url: &'a str,
}

impl PlanReady<'_> {
    pub fn subject(&self) -> String {
        format!("Your Learning Plan for \"{}\" is Ready!", self.study_title)
    }

    pub fn render(&self) -> OutgoingEmail {
        let title = html_escape(self.study_title);
        let name = html_escape(self.user_name.unwrap_or(FALLBACK_NAME));

        let schedule: String = self
            .schedule
            .iter()
            .map(|entry| {
                format!(
                    r#"<div style="padding:12px 16px;margin-bottom:12px;background:#f3f4f6;border-left:4px solid #3b82f6;border-radius:8px;">
<p style="margin:0;font-weight:600;">{}</p>
<p style="margin:0;font-size:14px;color:#4b5563;">{}</p>
</div>"#,
                    format_day(entry.at),
                    html_escape(&entry.description)
                )
            })
            .collect();

        let body = format!(
            r#"<div style="padding:32px;background:#2563eb;color:#ffffff;text-align:center;">
<h1 style="margin:0 0 8px;">Your Learning Plan is Ready!</h1>
<p style="margin:0;font-size:18px;">{title}</p>
</div>
<div style="padding:32px;color:#374151;">
<p>Hi {name},</p>
<p>We've generated a personalized learning plan based on your diagnostic results. Your plan includes a structured study schedule with spaced repetition reviews.</p>
<h2 style="font-size:20px;">Your Review Schedule</h2>
{schedule}
<p style="font-size:14px;color:#4b5563;">We'll send you an email reminder on each review day.</p>
<p><a href="{plan}" style="display:inline-block;padding:12px 24px;background:#2563eb;color:#ffffff;border-radius:8px;text-decoration:none;">View Full Learning Plan</a></p>
</div>
<div style="padding:24px;background:#f9fafb;text-align:center;font-size:14px;">
<a href="{dashboard}">Go to Dashboard</a>
</div>"#,
            title = title,
            name = name,
            schedule = schedule,
            plan = link(self.base_url, &format!("/study/{}/plan", self.study_source_id)),
            dashboard = link(self.base_url, "/dashboard"),
        );

        OutgoingEmail::new(
            self.to,
            self.subject(),
            layout(&format!("Your learning plan for {} is ready!", title), &body),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_format_day() {
        let at = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        assert_eq!(format_day(at), "Monday, March 3, 2025");
    }

    #[test]
    fn test_reminder_render() {
        let source_id = Uuid::new_v4();
        let email = ReviewReminder {
            to: "ada@example.com",
            user_name: Some("ada"),
            study_title: "Cells <intro>",
            study_source_id: source_id,
            scheduled_at: Utc::now(),
            review_number: 2,
            base_url: "http://localhost:3000/",
        }
        .render();

        assert_eq!(email.subject, "Review Reminder: Cells <intro>");
        assert_eq!(email.to, vec!["ada@example.com".to_string()]);
        assert!(email.html.contains("Review #2"));
        assert!(email.html.contains("Cells &lt;intro&gt;"));
        assert!(!email.html.contains("Cells <intro>"));
        assert!(email.html.contains("http://localhost:3000/reviews"));
        assert!(email
            .html
            .contains(&format!("http://localhost:3000/study/{}/plan", source_id)));
    }

    #[test]
    fn test_plan_ready_lists_schedule() {
        let schedule = vec![
            ScheduleEntry {
                at: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
                description: "First review".to_string(),
            },
            ScheduleEntry {
                at: Utc.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap(),
                description: "Second review".to_string(),
            },
        ];
        let email = PlanReady {
            to: "ada@example.com",
            user_name: None,
            study_title: "Cell Biology",
            study_source_id: Uuid::new_v4(),
            schedule: &schedule,
            base_url: "http://localhost:3000",
        }
        .render();

        assert_eq!(email.subject, "Your Learning Plan for \"Cell Biology\" is Ready!");
        assert!(email.html.contains("Hi Student,"));
        assert!(email.html.contains("Monday, March 3, 2025"));
        assert!(email.html.contains("Saturday, March 8, 2025"));
    }
}
