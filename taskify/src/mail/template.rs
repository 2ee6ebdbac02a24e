//! HTML body for the assignment email.

use taskify_proto::mail::SendEmailRequest;

/// Dashboard link used when none is configured.
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000/dashboard";

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(input: &str) -> String {
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

/// Renders the assignment email body. All request fields are escaped.
#[must_use]
pub fn render_assignment_html(request: &SendEmailRequest, dashboard_url: &str) -> String {
    let to_name = escape_html(&request.to_name);
    let assigned_by = escape_html(&request.assigned_by);
    let title = escape_html(&request.task_title);
    let description = escape_html(&request.task_description);
    let dashboard_url = escape_html(dashboard_url);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>New Task Assigned</title>
</head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background-color: #f5f5f5;">
  <table width="100%" cellpadding="0" cellspacing="0" style="max-width: 600px; margin: 40px auto; background-color: #ffffff;">
    <tr>
      <td style="background: linear-gradient(135deg, #8B5CF6 0%, #EC4899 100%); padding: 40px; text-align: center; border-radius: 12px 12px 0 0;">
        <h1 style="margin: 0; color: #ffffff; font-size: 28px;">✓ Taskify</h1>
        <p style="margin: 10px 0 0 0; color: #ffffff; font-size: 16px;">New Task Assigned</p>
      </td>
    </tr>
    <tr>
      <td style="padding: 40px;">
        <p style="font-size: 16px; margin: 0 0 20px 0;">Hello <strong>{to_name}</strong>,</p>
        <p style="font-size: 16px; margin: 0 0 30px 0;">A new task has been assigned to you by <strong>{assigned_by}</strong>.</p>
        <div style="background-color: #f9fafb; padding: 24px; border-radius: 8px; border-left: 4px solid #8B5CF6; margin: 20px 0;">
          <h3 style="margin: 0 0 12px 0; color: #8B5CF6; font-size: 20px;">📋 {title}</h3>
          <p style="color: #6b7280; margin: 0; font-size: 15px;">{description}</p>
        </div>
        <div style="background-color: #fef3c7; border: 1px solid #fbbf24; border-radius: 8px; padding: 16px; margin: 20px 0;">
          <p style="margin: 0; color: #92400e; font-size: 14px;"><strong>👤 Assigned By:</strong> {assigned_by}</p>
        </div>
        <table width="100%" cellpadding="0" cellspacing="0">
          <tr>
            <td align="center" style="padding: 20px 0;">
              <a href="{dashboard_url}" style="display: inline-block; background: linear-gradient(135deg, #8B5CF6 0%, #EC4899 100%); color: #ffffff; padding: 14px 32px; text-decoration: none; border-radius: 8px; font-weight: 600;">View Task Dashboard →</a>
            </td>
          </tr>
        </table>
      </td>
    </tr>
    <tr>
      <td style="background-color: #f9fafb; padding: 30px; text-align: center; border-radius: 0 0 12px 12px; border-top: 1px solid #e5e7eb;">
        <p style="color: #6b7280; font-size: 14px; margin: 0;">📧 This is an automated notification from Taskify</p>
      </td>
    </tr>
  </table>
</body>
</html>
"#
    )
}
