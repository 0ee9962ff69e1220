pub struct Email {
    pub subject: String,
    pub html: String,
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn welcome(name: &str) -> Email {
    Email {
        subject: "Welcome to the Blog API".into(),
        html: format!(
            "<h1>Welcome, {}!</h1><p>Thanks for joining us.</p>",
            escape_html(name)
        ),
    }
}

/// `reset_password_url` is the page that accepts the token as its last path segment.
pub fn reset_password(reset_password_url: &str, token: &str) -> Email {
    let link = format!("{}/{}", reset_password_url.trim_end_matches('/'), token);
    Email {
        subject: "Reset Your Password".into(),
        html: format!(
            "<p>You requested a password reset.</p><p><a href=\"{}\">Reset Password</a></p>",
            escape_html(&link)
        ),
    }
}
