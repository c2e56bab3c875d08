//! Tree-wide plan validation
//!
//! [`validate`] recomputes validity from scratch on every call: all node
//! errors are cleared first, then every domain rule runs against current
//! values. Errors attach to the offending nodes; nothing is raised. Callers
//! run this after every connectivity check, so no stale error state may
//! survive between calls.

use crate::config::plan;
use crate::config::tree::{ConfigNode, ConfigTree};
use crate::remote::{Catalog, Catalogs};

/// Recompute the tree-wide valid flag. Returns the new value.
pub fn validate(tree: &mut ConfigTree, catalogs: &Catalogs) -> bool {
    tree.clear_errors();

    check_url(tree, plan::SOURCE_URL);
    check_url(tree, plan::DEST_URL);
    check_required(tree, plan::DEST_USERNAME);
    check_required(tree, plan::DEST_PASSWORD);

    check_selections(tree, plan::REPOSITORIES, &catalogs.repositories, "repository");
    check_selections(tree, plan::GROUPS, &catalogs.groups, "group");
    check_selections(tree, plan::USERS, &catalogs.users, "user");
    check_selections(tree, plan::PERMISSIONS, &catalogs.permissions, "permission target");

    let errors = tree.error_count();
    if errors > 0 {
        log::debug!("plan validation found {} errors", errors);
    }
    tree.set_valid(errors == 0);
    tree.is_valid()
}

/// Required fields must hold a value; optional empty fields are always valid.
fn check_required(tree: &mut ConfigTree, path: &str) {
    if let Some(node) = tree.get_mut(path) {
        if node.required && node.is_blank() {
            node.error = Some("required".to_string());
        }
    }
}

fn check_url(tree: &mut ConfigTree, path: &str) {
    let Some(node) = tree.get_mut(path) else {
        return;
    };
    if node.is_blank() {
        if node.required {
            node.error = Some("required".to_string());
        }
        return;
    }
    let ok = node
        .as_text()
        .is_some_and(|url| url.starts_with("http://") || url.starts_with("https://"));
    if !ok {
        node.error = Some("must be an http(s) URL".to_string());
    }
}

/// Every entry marked for migration must resolve against the source catalog.
/// A stale catalog means nothing resolves: the selection is flagged as
/// unresolved rather than trusted from cache.
fn check_selections(tree: &mut ConfigTree, collection: &str, catalog: &Catalog, what: &str) {
    let Some(children) = tree.get_mut(collection).and_then(ConfigNode::children_mut) else {
        return;
    };
    for (name, entry) in children.iter_mut() {
        let selected = entry
            .children()
            .and_then(|c| c.get("migrate"))
            .and_then(ConfigNode::as_flag)
            .unwrap_or(false);
        if !selected {
            continue;
        }
        if !catalog.is_fresh() {
            entry.error = Some(format!(
                "unresolved {}: source catalog is stale, run a connectivity check",
                what
            ));
        } else if !catalog.contains(name) {
            entry.error = Some(format!("{} '{}' does not exist on the source", what, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with_destination() -> ConfigTree {
        let mut tree = plan::default_tree();
        tree.set_text(plan::SOURCE_URL, "http://nexus:8081").unwrap();
        tree.set_text(plan::DEST_URL, "http://artifactory:8081").unwrap();
        tree.set_text(plan::DEST_USERNAME, "admin").unwrap();
        tree.set_text(plan::DEST_PASSWORD, "password").unwrap();
        tree
    }

    fn fresh_catalogs() -> Catalogs {
        let mut catalogs = Catalogs::default();
        catalogs.repositories.refresh(vec!["libs-release".into()]);
        catalogs.groups.refresh(vec![]);
        catalogs.users.refresh(vec![]);
        catalogs.permissions.refresh(vec![]);
        catalogs
    }

    #[test]
    fn missing_required_fields_invalidate() {
        let mut tree = plan::default_tree();
        assert!(!validate(&mut tree, &Catalogs::default()));
        assert!(tree.get(plan::DEST_URL).unwrap().error.is_some());
        // Optional field with no value stays valid.
        assert!(tree.get(plan::SOURCE_USERNAME).unwrap().error.is_none());
    }

    #[test]
    fn malformed_urls_invalidate() {
        let mut tree = plan_with_destination();
        tree.set_text(plan::DEST_URL, "artifactory:8081").unwrap();
        assert!(!validate(&mut tree, &fresh_catalogs()));
        assert!(tree.get(plan::DEST_URL).unwrap().error.is_some());
    }

    #[test]
    fn complete_plan_is_valid() {
        let mut tree = plan_with_destination();
        assert!(validate(&mut tree, &fresh_catalogs()));
        assert!(tree.is_valid());
    }

    #[test]
    fn selection_must_exist_in_fresh_catalog() {
        let mut tree = plan_with_destination();
        tree.ensure_entry("repositories", "libs-release").unwrap();
        tree.set_flag("repositories/libs-release/migrate", true).unwrap();
        assert!(validate(&mut tree, &fresh_catalogs()));

        tree.ensure_entry("repositories", "vanished").unwrap();
        tree.set_flag("repositories/vanished/migrate", true).unwrap();
        assert!(!validate(&mut tree, &fresh_catalogs()));
        assert!(tree.get("repositories/vanished").unwrap().error.is_some());
    }

    #[test]
    fn stale_catalog_downgrades_selections() {
        let mut tree = plan_with_destination();
        tree.ensure_entry("repositories", "libs-release").unwrap();
        tree.set_flag("repositories/libs-release/migrate", true).unwrap();

        let mut catalogs = fresh_catalogs();
        assert!(validate(&mut tree, &catalogs));
        catalogs.invalidate_source();
        // Cached membership must not be trusted once stale.
        assert!(!validate(&mut tree, &catalogs));
        let err = tree.get("repositories/libs-release").unwrap().error.clone();
        assert!(err.unwrap().contains("stale"));
    }

    #[test]
    fn revalidation_never_accumulates_stale_errors() {
        let mut tree = plan::default_tree();
        assert!(!validate(&mut tree, &fresh_catalogs()));
        let first = tree.error_count();
        assert!(!validate(&mut tree, &fresh_catalogs()));
        assert_eq!(tree.error_count(), first);

        let mut tree = plan_with_destination();
        assert!(validate(&mut tree, &fresh_catalogs()));
        assert_eq!(tree.error_count(), 0);
    }
}
