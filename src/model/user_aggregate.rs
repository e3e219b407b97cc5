use super::{ContributorEntry, RepoId};

/// A contributor's standing across every crawled repository.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAggregate {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    pub html_url: String,
    pub score: f64,
    pub contributions: u64,
}

impl UserAggregate {
    /// A zero-score aggregate carrying the display metadata of `entry`.
    #[must_use]
    pub fn new(entry: &ContributorEntry) -> Self {
        Self {
            login: entry.login.clone(),
            id: entry.id,
            avatar_url: entry.avatar_url.clone(),
            html_url: entry.html_url.clone(),
            score: 0.0,
            contributions: 0,
        }
    }

    /// Replace the display metadata with the most recently seen entry for this login.
    pub fn refresh_display(&mut self, entry: &ContributorEntry) {
        self.id = entry.id;
        self.avatar_url.clone_from(&entry.avatar_url);
        self.html_url.clone_from(&entry.html_url);
    }
}

/// Points a user earned from one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoPoints {
    pub repo: RepoId,
    pub points: f64,
}
