//! Per-repository composition of a user's score.

use super::{RepoId, RepoPoints, UserAggregate};
use core::fmt::{Display, Formatter};

/// Sections past this many are candidates for folding into "Other".
const MAX_NAMED_SECTIONS: usize = 7;

/// Only sections below this share of the score get folded into "Other".
const OTHER_SHARE_CUTOFF: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionLabel {
    Repo(RepoId),
    Other,
}

impl Display for SectionLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Repo(id) => write!(f, "{id}"),
            Self::Other => f.write_str("Other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownSection {
    pub label: SectionLabel,
    /// Fraction of the user's score, in `0.0..=1.0`.
    pub share: f64,
    pub points: f64,
}

/// A ranked user together with where their points come from.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBreakdown {
    pub rank: usize,
    pub user: UserAggregate,
    pub sections: Vec<BreakdownSection>,
}

/// Order a user's per-repository points by share, folding the long tail into "Other".
#[must_use]
pub fn sections(score: f64, repos: &[RepoPoints]) -> Vec<BreakdownSection> {
    let mut sections: Vec<BreakdownSection> = repos
        .iter()
        .map(|r| BreakdownSection {
            label: SectionLabel::Repo(r.repo.clone()),
            share: if score > 0.0 { r.points / score } else { 0.0 },
            points: r.points,
        })
        .collect();

    sections.sort_by(|a, b| {
        b.share.total_cmp(&a.share).then_with(|| match (&a.label, &b.label) {
            (SectionLabel::Repo(x), SectionLabel::Repo(y)) => x.cmp(y),
            _ => core::cmp::Ordering::Equal,
        })
    });

    let fold_from = sections
        .iter()
        .enumerate()
        .position(|(i, s)| i >= MAX_NAMED_SECTIONS && s.share < OTHER_SHARE_CUTOFF);

    if let Some(start) = fold_from {
        let tail = sections.split_off(start);
        sections.push(BreakdownSection {
            label: SectionLabel::Other,
            share: tail.iter().map(|s| s.share).sum(),
            points: tail.iter().map(|s| s.points).sum(),
        });
    }

    sections
}
