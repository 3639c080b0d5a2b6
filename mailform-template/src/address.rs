//! Mailbox lists in evaluated address headers.

use std::fmt;

/// Email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Optional display name.
    pub name: Option<String>,
    /// The address itself, kept as written (may be internationalized).
    pub email: String,
}

impl Mailbox {
    /// Parse `"Name <email@example.com>"` or a bare `email@example.com`.
    ///
    /// Returns `None` for blank input.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(start) = s.find('<')
            && let Some(end) = s.rfind('>')
            && start < end
        {
            let name = s[..start].trim().trim_matches('"').trim();
            let email = s[start + 1..end].trim();
            if email.is_empty() {
                return None;
            }
            return Some(Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: email.to_string(),
            });
        }

        (!s.is_empty()).then(|| Self {
            name: None,
            email: s.to_string(),
        })
    }

    /// Parse a comma separated mailbox list.
    ///
    /// Commas inside quoted display names or angle brackets do not split.
    pub fn parse_list(s: &str) -> Vec<Self> {
        let mut mailboxes = Vec::new();
        let mut quoted = false;
        let mut angle = false;
        let mut start = 0;

        for (pos, ch) in s.char_indices() {
            match ch {
                '"' => quoted = !quoted,
                '<' if !quoted => angle = true,
                '>' if !quoted => angle = false,
                ',' if !quoted && !angle => {
                    mailboxes.extend(Self::parse(&s[start..pos]));
                    start = pos + 1;
                }
                _ => {}
            }
        }
        mailboxes.extend(Self::parse(&s[start..]));
        mailboxes
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}
