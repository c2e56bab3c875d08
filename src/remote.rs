//! Boundary to the two product instances
//!
//! Real HTTP clients for Nexus and Artifactory sit behind [`SourceApi`] and
//! [`DestinationApi`]; the core only sees connectivity checks and catalog
//! listings. Catalog data is cached with a freshness flag: a failed check
//! marks the cache stale, and stale entries are never trusted by validation.

use anyhow::Result;

/// A repository as listed by the source instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryInfo {
    pub name: String,
    /// Layout/format identifier, e.g. "maven2" or "npm".
    pub format: String,
}

impl RepositoryInfo {
    pub fn new(name: &str, format: &str) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
        }
    }
}

/// Everything a single source connectivity check brings back.
#[derive(Debug, Clone, Default)]
pub struct SourceInventory {
    pub repositories: Vec<RepositoryInfo>,
    pub groups: Vec<String>,
    pub users: Vec<String>,
    pub permissions: Vec<String>,
}

/// Source-instance collaborator: one synchronous check that either returns
/// the full inventory or fails (unreachable, bad credentials, ...).
pub trait SourceApi {
    fn check(&mut self) -> Result<SourceInventory>;
}

/// Destination-instance collaborator: reachability only; the core never
/// needs destination catalogs.
pub trait DestinationApi {
    fn check(&mut self) -> Result<()>;
}

/// Stand-in used until a real client is wired in. Every check fails, which
/// leaves catalogs stale and dependent plan fields unresolved.
pub struct Offline;

impl SourceApi for Offline {
    fn check(&mut self) -> Result<SourceInventory> {
        anyhow::bail!("no source instance configured")
    }
}

impl DestinationApi for Offline {
    fn check(&mut self) -> Result<()> {
        anyhow::bail!("no destination instance configured")
    }
}

/// Cached catalog of names known to exist on the source, with a freshness
/// flag. `entries == None` means never fetched.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Option<Vec<String>>,
    repositories: Vec<RepositoryInfo>,
    fresh: bool,
}

impl Catalog {
    pub fn refresh(&mut self, names: Vec<String>) {
        self.entries = Some(names);
        self.fresh = true;
    }

    pub fn refresh_repositories(&mut self, repositories: Vec<RepositoryInfo>) {
        self.entries = Some(repositories.iter().map(|r| r.name.clone()).collect());
        self.repositories = repositories;
        self.fresh = true;
    }

    /// Keep cached entries for display, but stop trusting them.
    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Cached names, only while fresh. A stale cache yields `None` so callers
    /// are forced back through a connectivity check before resolving against it.
    pub fn names(&self) -> Option<Vec<String>> {
        if self.fresh { self.entries.clone() } else { None }
    }

    pub fn repositories(&self) -> &[RepositoryInfo] {
        &self.repositories
    }

    /// True only when the catalog is fresh and lists `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fresh
            && self
                .entries
                .as_ref()
                .is_some_and(|names| names.iter().any(|n| n == name))
    }
}

/// All cached external state for one session.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub repositories: Catalog,
    pub groups: Catalog,
    pub users: Catalog,
    pub permissions: Catalog,
    pub destination_reachable: bool,
}

impl Catalogs {
    pub fn apply_inventory(&mut self, inventory: SourceInventory) {
        self.repositories.refresh_repositories(inventory.repositories);
        self.groups.refresh(inventory.groups);
        self.users.refresh(inventory.users);
        self.permissions.refresh(inventory.permissions);
    }

    pub fn invalidate_source(&mut self) {
        self.repositories.invalidate();
        self.groups.invalidate();
        self.users.invalidate();
        self.permissions.invalidate();
    }

    pub fn source_resolved(&self) -> bool {
        self.repositories.is_fresh()
            && self.groups.is_fresh()
            && self.users.is_fresh()
            && self.permissions.is_fresh()
    }
}
