use indexmap::IndexMap;

use crate::config::ConfigDescriptor;


/// The source side of a mapping rule: a symbolic name from the old config,
/// or a raw integer id for entries the old config never names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKey {
    Name(String),
    Id(i32),
}

/// The target side of a mapping rule: a symbolic name resolved against the
/// new config, or a raw integer id used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Name(String),
    Id(i32),
}

impl From<&str> for RuleKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<i32> for RuleKey {
    fn from(id: i32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RuleTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<i32> for RuleTarget {
    fn from(id: i32) -> Self {
        Self::Id(id)
    }
}

/// One mod's contribution to the mapping tables: where its old and new
/// config files live, and the rule dictionaries that steer name translation.
///
/// Rules are optional for symbols the configs enumerate automatically; an
/// enumerated symbol with no applicable rule maps to the same name in the
/// new config. Rule names act as dot-delimited prefixes: a rule for `pipe`
/// rewrites `pipe.item.wood` to `<target>.item.wood` unless a longer prefix
/// matches.
#[derive(Debug)]
pub struct ModRules {
    pub name:       &'static str,
    pub old_config: ConfigDescriptor,
    pub new_config: ConfigDescriptor,

    pub blocks: IndexMap<RuleKey, RuleTarget>,
    pub items:  IndexMap<RuleKey, RuleTarget>,
    /// Damage-value-specific item rules: `(name, damage)` → `(target, damage)`.
    /// These take precedence over any prefix rule for the same name.
    pub item_damage: IndexMap<(String, i16), (RuleTarget, i16)>,
}

impl ModRules {
    pub fn new(
        name: &'static str,
        old_config: ConfigDescriptor,
        new_config: ConfigDescriptor,
    ) -> Self {
        Self {
            name,
            old_config,
            new_config,
            blocks: IndexMap::new(),
            items: IndexMap::new(),
            item_damage: IndexMap::new(),
        }
    }

    pub fn block(mut self, key: impl Into<RuleKey>, target: impl Into<RuleTarget>) -> Self {
        self.blocks.insert(key.into(), target.into());
        self
    }

    pub fn item(mut self, key: impl Into<RuleKey>, target: impl Into<RuleTarget>) -> Self {
        self.items.insert(key.into(), target.into());
        self
    }

    pub fn item_damage(
        mut self,
        name: &str,
        damage: i16,
        target: impl Into<RuleTarget>,
        target_damage: i16,
    ) -> Self {
        self.item_damage
            .insert((name.to_owned(), damage), (target.into(), target_damage));
        self
    }
}
