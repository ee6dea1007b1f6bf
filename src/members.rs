use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A parliamentary member, as resolved by an external lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub party: String,
    pub party_abbr: String,
    pub current_mp: bool,
}

impl Member {
    /// Name as shown in posts: honorific stripped, party appended.
    pub fn display_name(&self) -> String {
        format!("{} ({})", remove_title(&self.name), self.party_abbr)
    }
}

/// Strip a leading honorific from a display name.
pub fn remove_title(name: &str) -> &str {
    let trimmed = name.trim();
    let Some((first, rest)) = trimmed.split_once(' ') else {
        return trimmed;
    };
    if ["sir", "dame", "mr", "mrs", "ms", "dr"]
        .iter()
        .any(|title| first.eq_ignore_ascii_case(title))
    {
        rest.trim_start()
    } else {
        trimmed
    }
}

/// Resolves a member id to their profile. The production implementor calls
/// the members API; tests and dry runs use [`StaticLookup`] or [`NoLookup`].
pub trait MemberLookup {
    fn member(&self, member_id: i64) -> Option<Member>;
}

/// Lookup backend that never resolves anyone. Claims render with the raw
/// member id.
pub struct NoLookup;

impl MemberLookup for NoLookup {
    fn member(&self, _member_id: i64) -> Option<Member> {
        None
    }
}

/// Fixed in-memory member directory.
#[derive(Debug, Default)]
pub struct StaticLookup(HashMap<i64, Member>);

impl StaticLookup {
    pub fn new(members: impl IntoIterator<Item = Member>) -> Self {
        StaticLookup(members.into_iter().map(|m| (m.id, m)).collect())
    }
}

impl MemberLookup for StaticLookup {
    fn member(&self, member_id: i64) -> Option<Member> {
        self.0.get(&member_id).cloned()
    }
}

/// Run-scoped memoization over a lookup backend. Built fresh each run and
/// dropped with it; failed lookups are cached too so one unresolvable id is
/// not retried per claim.
pub struct MemberCache<L> {
    backend: L,
    cache: HashMap<i64, Option<Member>>,
}

impl<L: MemberLookup> MemberCache<L> {
    pub fn new(backend: L) -> Self {
        MemberCache {
            backend,
            cache: HashMap::new(),
        }
    }

    pub fn member(&mut self, member_id: i64) -> Option<&Member> {
        self.cache
            .entry(member_id)
            .or_insert_with(|| {
                log::debug!("resolving member {member_id}");
                self.backend.member(member_id)
            })
            .as_ref()
    }
}

/// Claimants whose expenses are always surfaced regardless of amount.
/// Loaded once per run from a JSON name -> member id map.
#[derive(Debug, Clone, Default)]
pub struct NotableMembers(HashSet<i64>);

impl NotableMembers {
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        NotableMembers(ids.into_iter().collect())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening notable members file {}", path.display()))?;
        let by_name: HashMap<String, i64> = serde_json::from_reader(file)
            .with_context(|| format!("parsing notable members file {}", path.display()))?;
        log::info!("loaded {} notable members", by_name.len());
        Ok(NotableMembers(by_name.into_values().collect()))
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.0.contains(&member_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
