//! The default migration-plan skeleton and catalog reconciliation
//!
//! A plan names the two instances, picks which repositories, groups, users
//! and permission targets to carry over, and toggles the artifact and
//! server-configuration phases. Selections reference things that live on the
//! source instance, so entries created before a connection exists (typically
//! by loading a saved plan) start out *provisional*: their transient
//! `available` flag is false until a connectivity check lets
//! [`reconcile`] bind them against the live catalog.

use crate::config::tree::{ConfigNode, ConfigTree};
use crate::remote::Catalogs;

pub const SOURCE_URL: &str = "source/url";
pub const SOURCE_USERNAME: &str = "source/username";
pub const SOURCE_PASSWORD: &str = "source/password";
pub const DEST_URL: &str = "destination/url";
pub const DEST_USERNAME: &str = "destination/username";
pub const DEST_PASSWORD: &str = "destination/password";
pub const REPOSITORIES: &str = "repositories";
pub const GROUPS: &str = "security/groups";
pub const USERS: &str = "security/users";
pub const PERMISSIONS: &str = "security/permissions";
pub const OPT_CONFIGURATIONS: &str = "options/configurations";
pub const OPT_ARTIFACTS: &str = "options/artifacts";

/// Build the default (empty) migration plan.
pub fn default_tree() -> ConfigTree {
    let root = ConfigNode::group("plan")
        .child(
            ConfigNode::group("source")
                .child(ConfigNode::text("url", "").required())
                .child(ConfigNode::text("username", ""))
                .child(ConfigNode::text("password", "").secret()),
        )
        .child(
            ConfigNode::group("destination")
                .child(ConfigNode::text("url", "").required())
                .child(ConfigNode::text("username", "").required())
                .child(ConfigNode::text("password", "").required().secret()),
        )
        .child(ConfigNode::collection("repositories", repository_entry))
        .child(
            ConfigNode::group("security")
                .child(ConfigNode::collection("groups", member_entry))
                .child(ConfigNode::collection("users", member_entry))
                .child(ConfigNode::collection("permissions", member_entry)),
        )
        .child(
            ConfigNode::group("options")
                .child(ConfigNode::flag("configurations", false))
                .child(ConfigNode::flag("artifacts", true)),
        );
    ConfigTree::new(root)
}

/// One repository selection. `target` empty means "keep the source name";
/// `format` and `available` mirror live catalog data and never persist.
pub fn repository_entry(name: &str) -> ConfigNode {
    ConfigNode::group(name)
        .child(ConfigNode::flag("migrate", false))
        .child(ConfigNode::text("target", ""))
        .child(ConfigNode::text("format", "").transient())
        .child(ConfigNode::flag("available", false).transient())
}

/// One group/user/permission selection.
pub fn member_entry(name: &str) -> ConfigNode {
    ConfigNode::group(name)
        .child(ConfigNode::flag("migrate", false))
        .child(ConfigNode::flag("available", false).transient())
}

/// Bind plan selections against the current source catalogs.
///
/// For every fresh catalog: names present on the source get an entry
/// (existing entries keep whatever was already configured) with
/// `available = true`; entries whose name has disappeared are kept but
/// downgraded to `available = false`. Stale catalogs leave the plan alone,
/// which is what lets validation flag those selections as unresolved.
pub fn reconcile(tree: &mut ConfigTree, catalogs: &Catalogs) {
    reconcile_collection(tree, REPOSITORIES, &catalogs.repositories.names());
    reconcile_collection(tree, GROUPS, &catalogs.groups.names());
    reconcile_collection(tree, USERS, &catalogs.users.names());
    reconcile_collection(tree, PERMISSIONS, &catalogs.permissions.names());

    if catalogs.repositories.is_fresh() {
        for info in catalogs.repositories.repositories() {
            let path = format!("{}/{}/format", REPOSITORIES, info.name);
            if let Some(node) = tree.get_mut(&path) {
                node.value = crate::config::tree::ConfigValue::Text(info.format.clone());
            }
        }
    }
}

fn reconcile_collection(tree: &mut ConfigTree, collection: &str, names: &Option<Vec<String>>) {
    let Some(names) = names else {
        return;
    };
    for name in names {
        match tree.ensure_entry(collection, name) {
            Ok(_) => {}
            Err(e) => {
                log::warn!("could not bind catalog entry '{}/{}': {:#}", collection, name, e);
                continue;
            }
        }
        let path = format!("{}/{}/available", collection, name);
        if let Err(e) = tree.set_flag(&path, true) {
            log::warn!("could not mark '{}' available: {:#}", path, e);
        }
    }
    let Some(children) = tree.get(collection).and_then(|n| n.children()) else {
        return;
    };
    let missing: Vec<String> = children
        .keys()
        .filter(|name| !names.iter().any(|n| n == *name))
        .cloned()
        .collect();
    for name in missing {
        let path = format!("{}/{}/available", collection, name);
        if let Err(e) = tree.set_flag(&path, false) {
            log::warn!("could not mark '{}' unavailable: {:#}", path, e);
        }
    }
}
