//! Roles handed over by the authentication layer and the pages they reach.

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use serde::Serialize;

use crate::io_utils;

/// Header row of the user export read by [`load_users`].
pub const USER_HEADERS: [&str; 3] = ["Email", "User Type", "Username"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Sales,
    Analyst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    /// Users per role.
    Staff,
    Dashboard,
    /// New-sale form.
    Sale,
}

impl Role {
    pub fn pages(self) -> &'static [Page] {
        match self {
            Role::Admin => &[Page::Staff, Page::Dashboard, Page::Sale],
            Role::Sales => &[Page::Dashboard, Page::Sale],
            Role::Analyst => &[Page::Dashboard],
        }
    }

    pub fn can_access(self, page: Page) -> bool {
        self.pages().contains(&page)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Analyst => "analyst",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    /// Accepts the stored user-type labels, including the legacy Italian ones.
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "sales" | "venditore" => Ok(Role::Sales),
            "analyst" | "analista" => Ok(Role::Analyst),
            other => Err(anyhow!("Unknown user role '{other}'")),
        }
    }
}

/// A user as stored by the authentication layer. Only `role` matters here;
/// the password hash is never part of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub mail: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub display_name: String,
}

/// Users per role, administrators left out.
pub fn count_by_role(users: &[UserRecord]) -> BTreeMap<Role, usize> {
    let mut counts = BTreeMap::new();
    for user in users.iter().filter(|user| user.role != Role::Admin) {
        *counts.entry(user.role).or_insert(0) += 1;
    }
    counts
}

/// Reads a user export with [`USER_HEADERS`]. Role labels are parsed with
/// [`Role::from_str`], so the stored legacy labels are accepted.
pub fn load_users(path: &Path) -> Result<Vec<UserRecord>> {
    let delimiter = io_utils::resolve_delimiter(path, None);
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Reading headers from {path:?}"))?
        .clone();
    if headers.iter().map(str::trim).ne(USER_HEADERS) {
        bail!("User export {path:?} must have headers {USER_HEADERS:?}, found {headers:?}");
    }

    reader
        .records()
        .map(|row| {
            let row = row.with_context(|| format!("Reading user export {path:?}"))?;
            let line = row.position().map(|pos| pos.line()).unwrap_or_default();
            let role = row[1]
                .parse::<Role>()
                .with_context(|| format!("Line {line} of {path:?}"))?;
            Ok(UserRecord {
                mail: row[0].trim().to_string(),
                password_hash: String::new(),
                role,
                display_name: row[2].trim().to_string(),
            })
        })
        .collect()
}
