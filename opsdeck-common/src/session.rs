//! Session context handed to panels
//!
//! Panels never look up the current user or active event on their own; the
//! caller builds a [`SessionContext`] and passes it in when attaching.

use serde::{Deserialize, Serialize};

/// The signed-in operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The event currently being worked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user: Option<SessionUser>,
    pub active_event: Option<EventRef>,
}

impl SessionContext {
    pub fn new(user: Option<SessionUser>, active_event: Option<EventRef>) -> Self {
        Self { user, active_event }
    }

    /// Identifier panels key their fetches on
    pub fn active_event_id(&self) -> Option<u64> {
        self.active_event.as_ref().map(|e| e.id)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    /// Short "who/where" line for panel headers
    pub fn describe(&self) -> String {
        let who = self
            .user
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or("anonymous");
        match &self.active_event {
            Some(EventRef {
                name: Some(name), ..
            }) => format!("{who} @ {name}"),
            Some(EventRef { id, name: None }) => format!("{who} @ event #{id}"),
            None => format!("{who} @ all events"),
        }
    }
}
