//! Action filtering: which actions get emitted as documents.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chainsearch_chain::{AccountName, Action, ActionName, Name, NameError};
use thiserror::Error;

use crate::config::IndexerConfig;

/// One include/exclude rule. The empty name is a wildcard in the `action`
/// and `actor` positions; a real name can never collide with it because the
/// empty string is not a valid account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterEntry {
    pub account: AccountName,
    pub action: ActionName,
    pub actor: AccountName,
}

/// Errors from parsing `account:action:actor` entries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("expected 'account:action:actor', got {0} segment(s)")]
    SegmentCount(usize),

    #[error("account segment must not be empty")]
    EmptyAccount,

    #[error(transparent)]
    Name(#[from] NameError),
}

impl FromStr for FilterEntry {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split(':').collect();
        if segments.len() != 3 {
            return Err(FilterParseError::SegmentCount(segments.len()));
        }
        if segments[0].is_empty() {
            return Err(FilterParseError::EmptyAccount);
        }
        Ok(FilterEntry {
            account: segments[0].parse()?,
            action: segments[1].parse()?,
            actor: segments[2].parse()?,
        })
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account, self.action, self.actor)
    }
}

/// The include/exclude rule sets applied to every candidate action.
#[derive(Debug, Clone)]
pub struct ActionFilter {
    on_star: bool,
    on: BTreeSet<FilterEntry>,
    out: BTreeSet<FilterEntry>,
}

impl ActionFilter {
    /// Build from validated configuration entries. An empty `filter_on`
    /// (or a bare `*` entry) admits every action as a candidate.
    pub fn from_config(config: &IndexerConfig) -> Result<Self, FilterParseError> {
        let mut on_star = config.filter_on.is_empty();
        let mut on = BTreeSet::new();
        for entry in &config.filter_on {
            if entry == "*" {
                on_star = true;
            } else {
                on.insert(entry.parse()?);
            }
        }

        let mut out = BTreeSet::new();
        for entry in &config.filter_out {
            out.insert(entry.parse()?);
        }

        Ok(ActionFilter { on_star, on, out })
    }

    /// True when `act` should be emitted.
    pub fn include(&self, act: &Action) -> bool {
        let mut include = self.on_star
            || self.on.contains(&FilterEntry {
                account: act.account,
                action: act.name,
                actor: Name::default(),
            });
        if !include {
            include = act.authorization.iter().any(|a| {
                self.on.contains(&FilterEntry {
                    account: act.account,
                    action: act.name,
                    actor: a.actor,
                })
            });
        }
        if !include {
            return false;
        }

        if self.out.contains(&FilterEntry {
            account: act.account,
            action: Name::default(),
            actor: Name::default(),
        }) {
            return false;
        }
        if self.out.contains(&FilterEntry {
            account: act.account,
            action: act.name,
            actor: Name::default(),
        }) {
            return false;
        }
        !act.authorization.iter().any(|a| {
            self.out.contains(&FilterEntry {
                account: act.account,
                action: act.name,
                actor: a.actor,
            })
        })
    }
}
