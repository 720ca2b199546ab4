use serde::{Deserialize, Serialize};

pub const ANONYMOUS: &str = "Anonymous";

/// Display identity attached to discussion posts and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub name: String,
    pub initials: String,
}

impl UserIdentity {
    /// Blank names post as "Anonymous".
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        match initials(name) {
            Some(initials) => Self {
                name: name.to_string(),
                initials,
            },
            None => Self {
                name: ANONYMOUS.to_string(),
                initials: "A".to_string(),
            },
        }
    }
}

/// First letter of the first and last name parts, upper-cased.
pub fn initials(full_name: &str) -> Option<String> {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    let first = parts.first()?.chars().next()?;
    let mut out: String = first.to_uppercase().collect();
    if parts.len() > 1 {
        if let Some(last) = parts[parts.len() - 1].chars().next() {
            out.extend(last.to_uppercase());
        }
    }
    Some(out)
}

/// The signed-in user on whose behalf the sync layer acts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub identity: UserIdentity,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, name: &str) -> Self {
        Self {
            id: id.into(),
            identity: UserIdentity::from_name(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Caroline Tran").as_deref(), Some("CT"));
        assert_eq!(initials("  ada  king lovelace ").as_deref(), Some("AL"));
        assert_eq!(initials("cher").as_deref(), Some("C"));
        assert_eq!(initials("   "), None);
    }

    #[test]
    fn test_blank_name_is_anonymous() {
        let identity = UserIdentity::from_name("");
        assert_eq!(identity.name, ANONYMOUS);
        assert_eq!(identity.initials, "A");
    }
}
