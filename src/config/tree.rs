//! Hierarchical configuration tree for the migration plan
//!
//! Every setting in a migration plan lives at a stable `/`-separated path
//! (e.g. `destination/url`, `repositories/libs-release/migrate`). Nodes carry
//! their own metadata: whether they persist to the plan file, whether their
//! value is a secret, and any validation error currently attached to them.

use std::collections::BTreeMap;

use serde_json::Value;

/// The value held by a single configuration node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// No value entered yet.
    Empty,
    Flag(bool),
    Text(String),
    /// An interior node; children are kept sorted so serialization order is stable.
    Map(BTreeMap<String, ConfigNode>),
}

impl ConfigValue {
    pub fn is_map(&self) -> bool {
        matches!(self, ConfigValue::Map(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    pub name: String,
    pub value: ConfigValue,
    pub default: ConfigValue,
    pub required: bool,
    pub secret: bool,
    /// Transient nodes (connectivity status, catalog availability) never
    /// reach the plan file.
    pub persist: bool,
    pub dirty: bool,
    pub error: Option<String>,
    /// For dynamic collections (repositories, groups, ...): builds a child
    /// node for a name first seen in a plan file or a live catalog.
    pub entry_template: Option<fn(&str) -> ConfigNode>,
}

impl ConfigNode {
    fn base(name: &str, value: ConfigValue) -> Self {
        Self {
            name: name.to_string(),
            default: value.clone(),
            value,
            required: false,
            secret: false,
            persist: true,
            dirty: false,
            error: None,
            entry_template: None,
        }
    }

    pub fn leaf(name: &str) -> Self {
        Self::base(name, ConfigValue::Empty)
    }

    pub fn text(name: &str, default: &str) -> Self {
        Self::base(name, ConfigValue::Text(default.to_string()))
    }

    pub fn flag(name: &str, default: bool) -> Self {
        Self::base(name, ConfigValue::Flag(default))
    }

    pub fn group(name: &str) -> Self {
        Self::base(name, ConfigValue::Map(BTreeMap::new()))
    }

    /// Dynamic collection node; unknown children are built from `template`.
    pub fn collection(name: &str, template: fn(&str) -> ConfigNode) -> Self {
        let mut node = Self::group(name);
        node.entry_template = Some(template);
        node
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.persist = false;
        self
    }

    /// Attach a child to a map node. No-op with a warning on a leaf; plan
    /// construction is static so that would be a programming error, not a
    /// runtime condition worth propagating.
    pub fn child(mut self, node: ConfigNode) -> Self {
        match self.value {
            ConfigValue::Map(ref mut children) => {
                children.insert(node.name.clone(), node);
            }
            _ => log::warn!("attempted to attach a child to leaf node '{}'", self.name),
        }
        self
    }

    pub fn children(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match &self.value {
            ConfigValue::Map(children) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, ConfigNode>> {
        match &mut self.value {
            ConfigValue::Map(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match &self.value {
            ConfigValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// True when the node holds no meaningful value (empty, or an empty string).
    pub fn is_blank(&self) -> bool {
        match &self.value {
            ConfigValue::Empty => true,
            ConfigValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    fn get(&self, mut segments: std::str::Split<'_, char>) -> Option<&ConfigNode> {
        match segments.next() {
            None => Some(self),
            Some(seg) => self.children()?.get(seg)?.get(segments),
        }
    }

    fn get_mut(&mut self, mut segments: std::str::Split<'_, char>) -> Option<&mut ConfigNode> {
        match segments.next() {
            None => Some(self),
            Some(seg) => self.children_mut()?.get_mut(seg)?.get_mut(segments),
        }
    }

    /// Lossless dump of this subtree's values, transient and secret fields
    /// included, with no default trimming.
    pub fn values(&self) -> Value {
        match &self.value {
            ConfigValue::Empty => Value::Null,
            ConfigValue::Flag(b) => Value::Bool(*b),
            ConfigValue::Text(s) => Value::String(s.clone()),
            ConfigValue::Map(children) => {
                let mut obj = serde_json::Map::new();
                for (name, child) in children {
                    obj.insert(name.clone(), child.values());
                }
                Value::Object(obj)
            }
        }
    }

    /// Mirror of [`values`](Self::values): applies a raw value dump back onto
    /// this subtree. Unknown keys without an entry template are skipped with
    /// a warning so a plan from a newer version degrades instead of failing.
    pub fn apply_values(&mut self, value: &Value) {
        match (&mut self.value, value) {
            (ConfigValue::Map(children), Value::Object(obj)) => {
                let template = self.entry_template;
                for (key, val) in obj {
                    if !children.contains_key(key) {
                        match template {
                            Some(template) => {
                                children.insert(key.clone(), template(key));
                            }
                            None => {
                                log::warn!("ignoring unknown plan key '{}/{}'", self.name, key);
                                continue;
                            }
                        }
                    }
                    if let Some(child) = children.get_mut(key) {
                        child.apply_values(val);
                    }
                }
            }
            (ConfigValue::Map(_), other) => {
                log::warn!("ignoring scalar for section '{}': {}", self.name, other)
            }
            (_, Value::Null) => self.value = ConfigValue::Empty,
            (_, Value::Bool(b)) => self.value = ConfigValue::Flag(*b),
            (_, Value::String(s)) => self.value = ConfigValue::Text(s.clone()),
            (_, other) => {
                log::warn!("ignoring unsupported value for '{}': {}", self.name, other)
            }
        }
    }

    fn prune(&mut self) {
        if let Some(children) = self.children_mut() {
            for child in children.values_mut() {
                child.prune();
            }
            children.retain(|_, child| match &child.value {
                ConfigValue::Map(grandchildren) => !grandchildren.is_empty(),
                value => *value != child.default,
            });
        }
    }

    fn clear_errors(&mut self) {
        self.error = None;
        if let Some(children) = self.children_mut() {
            for child in children.values_mut() {
                child.clear_errors();
            }
        }
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        if let Some(children) = self.children_mut() {
            for child in children.values_mut() {
                child.clear_dirty();
            }
        }
    }

    fn count_errors(&self) -> usize {
        let own = usize::from(self.error.is_some());
        match self.children() {
            Some(children) => own + children.values().map(ConfigNode::count_errors).sum::<usize>(),
            None => own,
        }
    }
}

/// The full migration plan, rooted at a single map node.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    root: ConfigNode,
    valid: bool,
}

impl ConfigTree {
    pub fn new(root: ConfigNode) -> Self {
        Self { root, valid: false }
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ConfigNode {
        &mut self.root
    }

    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        self.root.get(path.split('/'))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut ConfigNode> {
        self.root.get_mut(path.split('/'))
    }

    /// Set the value at `path`. Returns whether the stored value actually
    /// changed: writing a value equal to the current one is not a
    /// modification and does not mark the node dirty.
    pub fn set(&mut self, path: &str, value: ConfigValue) -> anyhow::Result<bool> {
        let node = self
            .get_mut(path)
            .ok_or_else(|| anyhow::anyhow!("no such configuration field: {}", path))?;
        if node.value.is_map() {
            anyhow::bail!("'{}' is a section, not a field", path);
        }
        if node.value == value {
            return Ok(false);
        }
        node.value = value;
        node.dirty = true;
        Ok(true)
    }

    pub fn set_text(&mut self, path: &str, value: &str) -> anyhow::Result<bool> {
        self.set(path, ConfigValue::Text(value.to_string()))
    }

    pub fn set_flag(&mut self, path: &str, value: bool) -> anyhow::Result<bool> {
        self.set(path, ConfigValue::Flag(value))
    }

    /// Fetch or create an entry of a dynamic collection (e.g. one repository
    /// under `repositories`). Fails if the collection has no entry template.
    pub fn ensure_entry(&mut self, collection: &str, name: &str) -> anyhow::Result<&mut ConfigNode> {
        let node = self
            .get_mut(collection)
            .ok_or_else(|| anyhow::anyhow!("no such configuration section: {}", collection))?;
        let template = node
            .entry_template
            .ok_or_else(|| anyhow::anyhow!("'{}' is not a dynamic collection", collection))?;
        let children = node
            .children_mut()
            .ok_or_else(|| anyhow::anyhow!("'{}' is not a section", collection))?;
        Ok(children
            .entry(name.to_string())
            .or_insert_with(|| template(name)))
    }

    /// Drop nodes whose value equals their default, collapsing sections that
    /// become empty. Used to keep plan files minimal.
    pub fn prune(&mut self) {
        self.root.prune();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            root: self.root.clone(),
        }
    }

    pub fn to_values(&self) -> Value {
        self.root.values()
    }

    pub fn apply_values(&mut self, values: &Value) {
        self.root.apply_values(values);
    }

    pub fn clear_errors(&mut self) {
        self.root.clear_errors();
        self.valid = false;
    }

    pub fn clear_dirty(&mut self) {
        self.root.clear_dirty();
    }

    pub fn error_count(&self) -> usize {
        self.root.count_errors()
    }

    pub(crate) fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Result of the most recent [`validate`](crate::config::validate::validate) run.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Immutable point-in-time copy of a [`ConfigTree`], used as the change
/// baseline and as the plan handed to the migration engine.
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: ConfigNode,
}

impl Snapshot {
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        self.root.get(path.split('/'))
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(ConfigNode::as_text)
    }

    pub fn flag(&self, path: &str) -> bool {
        self.get(path).and_then(ConfigNode::as_flag).unwrap_or(false)
    }

    /// Iterate the entries of a collection section, in stable name order.
    pub fn entries(&self, path: &str) -> Vec<(&str, &ConfigNode)> {
        match self.get(path).and_then(ConfigNode::children) {
            Some(children) => children
                .iter()
                .map(|(name, node)| (name.as_str(), node))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn values(&self) -> Value {
        self.root.values()
    }
}
