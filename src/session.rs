//! Explicit session context
//!
//! One `Session` owns everything a migration session touches (the plan
//! tree, its change baseline, the cached catalogs, the two instance
//! collaborators and the display surface) and is passed by handle wherever
//! state is needed. No ambient globals.
//!
//! Every operation resolves to a [`Notice`]; nothing here terminates the
//! process. Failed I/O leaves the prior in-memory plan authoritative.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{ChangeTracker, ConfigTree, persist, plan, validate};
use crate::migrate::{MigrationEngine, ProgressTracker};
use crate::remote::{Catalogs, DestinationApi, SourceApi};
use crate::ui::{Surface, prompts};

/// Outcome of a session operation, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Ok(String),
    Error(String),
}

impl Notice {
    pub fn is_ok(&self) -> bool {
        matches!(self, Notice::Ok(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Ok(text) | Notice::Error(text) => text,
        }
    }
}

pub struct Session {
    tree: ConfigTree,
    changes: ChangeTracker,
    catalogs: Catalogs,
    source: Box<dyn SourceApi>,
    destination: Box<dyn DestinationApi>,
    surface: Box<dyn Surface>,
    plan_path: Option<PathBuf>,
}

impl Session {
    pub fn new(
        source: Box<dyn SourceApi>,
        destination: Box<dyn DestinationApi>,
        surface: Box<dyn Surface>,
    ) -> Self {
        let tree = plan::default_tree();
        let changes = ChangeTracker::new(&tree);
        Self {
            tree,
            changes,
            catalogs: Catalogs::default(),
            source,
            destination,
            surface,
            plan_path: None,
        }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn modified(&self) -> bool {
        self.changes.modified(&self.tree)
    }

    /// Probe the source instance. Success refreshes all source catalogs and
    /// rebinds plan selections against them; failure marks the catalogs
    /// stale, which downgrades dependent fields to unresolved at the next
    /// validate. Never aborts the session.
    pub fn check_source(&mut self) -> Notice {
        match self.source.check() {
            Ok(inventory) => {
                log::info!(
                    "source reachable: {} repositories, {} groups, {} users",
                    inventory.repositories.len(),
                    inventory.groups.len(),
                    inventory.users.len()
                );
                self.catalogs.apply_inventory(inventory);
                plan::reconcile(&mut self.tree, &self.catalogs);
                Notice::Ok("Source instance reachable, catalogs refreshed.".to_string())
            }
            Err(e) => {
                log::warn!("source connectivity check failed: {:#}", e);
                self.catalogs.invalidate_source();
                Notice::Error(format!("Source instance unreachable: {:#}", e))
            }
        }
    }

    pub fn check_destination(&mut self) -> Notice {
        match self.destination.check() {
            Ok(()) => {
                self.catalogs.destination_reachable = true;
                Notice::Ok("Destination instance reachable.".to_string())
            }
            Err(e) => {
                log::warn!("destination connectivity check failed: {:#}", e);
                self.catalogs.destination_reachable = false;
                Notice::Error(format!("Destination instance unreachable: {:#}", e))
            }
        }
    }

    /// Recompute plan validity. Stale catalogs are re-resolved through a
    /// fresh connectivity check first, so validation never trusts cached
    /// external data.
    pub fn verify(&mut self) -> bool {
        if !self.catalogs.source_resolved() {
            self.check_source();
        }
        plan::reconcile(&mut self.tree, &self.catalogs);
        validate::validate(&mut self.tree, &self.catalogs)
    }

    pub fn verify_notice(&mut self) -> Notice {
        if self.verify() {
            Notice::Ok("Configuration verified successfully.".to_string())
        } else {
            Notice::Error("Configuration verified, errors found.".to_string())
        }
    }

    /// Persist the plan. On success the written state becomes the new
    /// change baseline and the default path for later saves/loads. Saving
    /// over an existing file the session did not write asks for confirmation
    /// while interactive.
    pub fn save(&mut self, path: Option<&Path>) -> Notice {
        let target = match self.resolve_path(path) {
            Ok(target) => target,
            Err(e) => return Notice::Error(format!("Unable to save plan: {:#}", e)),
        };
        let foreign = self.plan_path.as_deref() != Some(target.as_path());
        if foreign && target.exists() && self.surface.interactive() {
            match prompts::prompt_overwrite_plan(&target.display().to_string()) {
                Ok(true) => {}
                Ok(false) => return Notice::Ok("Save cancelled.".to_string()),
                Err(e) => return Notice::Error(format!("Unable to confirm: {:#}", e)),
            }
        }
        match persist::save(&target, &self.tree) {
            Ok(()) => {
                self.changes.rebase(&self.tree);
                self.plan_path = Some(target.clone());
                Notice::Ok(format!("Successfully saved plan to {}", target.display()))
            }
            Err(e) => {
                log::warn!("save failed: {:#}", e);
                Notice::Error(format!("Unable to save plan: {:#}", e))
            }
        }
    }

    /// Replace the plan from a file. Unsaved changes gate on an explicit
    /// confirmation while interactive; a failed read or parse leaves the
    /// current plan untouched.
    pub fn load(&mut self, path: Option<&Path>) -> Notice {
        if self.modified() && self.surface.interactive() {
            match prompts::prompt_discard_changes() {
                Ok(true) => {}
                Ok(false) => return Notice::Ok("Load cancelled.".to_string()),
                Err(e) => return Notice::Error(format!("Unable to confirm: {:#}", e)),
            }
        }
        let target = match self.resolve_path(path) {
            Ok(target) => target,
            Err(e) => return Notice::Error(format!("Unable to load plan: {:#}", e)),
        };
        match persist::load(&target) {
            Ok(tree) => {
                self.tree = tree;
                // Loaded selections must resolve against live data, not a
                // cache from before the load.
                self.catalogs.invalidate_source();
                let valid = self.verify();
                self.changes.rebase(&self.tree);
                self.plan_path = Some(target);
                if valid {
                    Notice::Ok("Plan loaded successfully.".to_string())
                } else {
                    Notice::Error("Plan loaded, errors found.".to_string())
                }
            }
            Err(e) => {
                log::warn!("load failed: {:#}", e);
                Notice::Error(format!("Unable to load plan: {:#}", e))
            }
        }
    }

    /// Verify, snapshot, and hand the plan to the engine under a fresh
    /// progress tracker. Blocks until the engine returns.
    pub fn run(&mut self, engine: &mut dyn MigrationEngine) -> Notice {
        if !self.verify() {
            return Notice::Error("Cannot run migration, errors found.".to_string());
        }
        let snapshot = self.tree.snapshot();
        let mut tracker = ProgressTracker::new(self.surface.as_mut());
        let outcome = tracker.run(engine, &snapshot);
        if outcome.succeeded() {
            Notice::Ok("Migration successful!".to_string())
        } else {
            Notice::Error(format!("Migration error: {}", outcome.message))
        }
    }

    fn resolve_path(&self, path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => match &self.plan_path {
                Some(path) => Ok(path.clone()),
                None => default_plan_path(),
            },
        }
    }
}

/// Default plan location under the platform config directory.
pub fn default_plan_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("nexus-migrate");
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        log::info!("created config directory: {:?}", config_dir);
    }
    Ok(config_dir.join("plan.json"))
}
