use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::rules::{ModRules, RuleKey, RuleTarget};


/// Items occupy the upper half of the shared numeric space; symbolic item
/// ids in config files are stored unshifted.
const ITEM_ID_SHIFT: i32 = 256;

/// What a source identifier maps to in the item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapTarget {
    /// Unconditional remap: every damage value keeps its damage.
    Id(i32),
    /// Damage-split remap: each damage value maps to its own (id, damage)
    /// pair, and encountering an unlisted damage value is an error.
    ByDamage(BTreeMap<i16, (i32, i16)>),
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "mod {mod_name}: prefix rule {prefix} has an integer target, \
         which cannot absorb the remainder of {symbol}"
    )]
    IntegerPrefixTarget {
        mod_name: &'static str,
        prefix:   String,
        symbol:   String,
    },
}

/// The frozen identifier tables. Built once at startup, read-only afterward.
///
/// The item table is a superset of the block table: every block entry is
/// mirrored into it, because placed blocks and dropped blocks share numeric
/// space.
#[derive(Debug)]
pub struct MapInfo {
    blocks: HashMap<i32, i32>,
    items:  HashMap<i32, MapTarget>,
}

impl MapInfo {
    /// Builds the tables from the per-mod rule dictionaries plus the vanilla
    /// identity ranges. Old configs are resolved against `input_base`, new
    /// configs against `output_base`.
    pub fn build(
        input_base: &Path,
        output_base: &Path,
        vanilla_block_ranges: &[(i32, i32)],
        vanilla_item_ranges: &[(i32, i32)],
        mods: &[ModRules],
    ) -> Result<Self, MapError> {
        let mut blocks = HashMap::new();
        let mut items = HashMap::new();

        for mod_rules in mods {
            info!("generating mapping rules for mod {}", mod_rules.name);
            let old_config = Config::load(input_base, &mod_rules.old_config)?;
            let new_config = Config::load(output_base, &mod_rules.new_config)?;

            build_block_rules(&mut blocks, &old_config, &new_config, mod_rules)?;
            build_item_rules(&mut items, &old_config, &new_config, mod_rules)?;
        }

        // Vanilla ids last: identity entries win over anything a mod rule
        // claimed inside the vanilla ranges.
        let mut vanilla = 0usize;
        for &(low, high) in vanilla_block_ranges {
            for id in low..=high {
                blocks.insert(id, id);
                vanilla += 1;
            }
        }
        for &(low, high) in vanilla_item_ranges {
            for id in low..=high {
                items.insert(id, MapTarget::Id(id));
                vanilla += 1;
            }
        }
        info!("generated {vanilla} vanilla identity mappings");

        Ok(Self::from_tables(blocks, items))
    }

    /// Assembles map info from already-resolved tables, mirroring the block
    /// entries into the item table (blocks-as-items).
    pub fn from_tables(blocks: HashMap<i32, i32>, mut items: HashMap<i32, MapTarget>) -> Self {
        for (&source, &target) in &blocks {
            items.insert(source, MapTarget::Id(target));
        }
        Self { blocks, items }
    }

    /// The target id for a placed block, or `None` for an unhandled id.
    pub fn remap_block(&self, id: i32) -> Option<i32> {
        self.blocks.get(&id).copied()
    }

    /// The target for an item id, or `None` for an unhandled id.
    pub fn item_target(&self, id: i32) -> Option<&MapTarget> {
        self.items.get(&id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// The best applicable rule for a source key: integer keys match only
/// themselves, names match by longest dot-delimited prefix.
fn find_directive(key: &RuleKey, rules: &indexmap::IndexMap<RuleKey, RuleTarget>) -> Option<RuleKey> {
    match key {
        RuleKey::Id(id) => Some(RuleKey::Id(*id)),
        RuleKey::Name(name) => {
            let parts: Vec<&str> = name.split('.').collect();
            for length in (1..=parts.len()).rev() {
                let prefix = RuleKey::Name(parts[..length].join("."));
                if rules.contains_key(&prefix) {
                    return Some(prefix);
                }
            }
            None
        }
    }
}

/// Applies a directive to a source key, producing the target symbol or id.
/// A name-valued prefix rule substitutes the prefix and keeps the remainder.
fn apply_directive(
    mod_name: &'static str,
    key: &RuleKey,
    directive: Option<RuleKey>,
    rules: &indexmap::IndexMap<RuleKey, RuleTarget>,
) -> Result<RuleTarget, MapError> {
    let Some(directive) = directive else {
        // No rule: the symbol keeps its name in the new config.
        return match key {
            RuleKey::Name(name) => Ok(RuleTarget::Name(name.clone())),
            RuleKey::Id(id) => Ok(RuleTarget::Id(*id)),
        };
    };

    let target = &rules[&directive];
    match (&directive, target, key) {
        (RuleKey::Id(_), target, _) => Ok(target.clone()),
        (RuleKey::Name(prefix), RuleTarget::Name(target), RuleKey::Name(name)) => {
            Ok(RuleTarget::Name(format!("{target}{}", &name[prefix.len()..])))
        }
        (RuleKey::Name(prefix), RuleTarget::Id(id), RuleKey::Name(name)) => {
            if prefix == name {
                Ok(RuleTarget::Id(*id))
            } else {
                Err(MapError::IntegerPrefixTarget {
                    mod_name,
                    prefix: prefix.clone(),
                    symbol: name.clone(),
                })
            }
        }
        // An Id key always selects an Id directive above.
        (RuleKey::Name(_), _, RuleKey::Id(id)) => Ok(RuleTarget::Id(*id)),
    }
}

/// The source keys a mod maps: the automatic enumeration when the old
/// config supports one, the explicitly named rules otherwise, and
/// integer-keyed rules in either case.
fn keys_to_map(
    automatic: Option<Vec<String>>,
    rule_names: impl Iterator<Item = RuleKey>,
    rule_ids: impl Iterator<Item = RuleKey>,
) -> Vec<RuleKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    let named: Box<dyn Iterator<Item = RuleKey>> = match automatic {
        Some(names) => {
            debug!("using automatic symbol enumeration");
            Box::new(names.into_iter().map(RuleKey::Name))
        }
        None => {
            debug!("using only manually-configured symbols");
            Box::new(rule_names)
        }
    };

    for key in named.chain(rule_ids) {
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}

fn build_block_rules(
    output: &mut HashMap<i32, i32>,
    old_config: &Config,
    new_config: &Config,
    mod_rules: &ModRules,
) -> Result<(), MapError> {
    info!("building block map for {}", mod_rules.name);

    let keys = keys_to_map(
        old_config.auto_blocks(),
        mod_rules
            .blocks
            .keys()
            .filter(|key| matches!(key, RuleKey::Name(_)))
            .cloned(),
        mod_rules
            .blocks
            .keys()
            .filter(|key| matches!(key, RuleKey::Id(_)))
            .cloned(),
    );

    for key in keys {
        let directive = find_directive(&key, &mod_rules.blocks);
        let target = apply_directive(mod_rules.name, &key, directive, &mod_rules.blocks)?;

        let source_id = match &key {
            RuleKey::Id(id) => *id,
            RuleKey::Name(name) => match old_config.get_block(name) {
                Some(id) => id,
                // A rule for a module the old install never enabled.
                None => {
                    debug!("block {name}: missing from old config, skipping");
                    continue;
                }
            },
        };

        let target_id = match &target {
            RuleTarget::Id(id) => Some(*id),
            RuleTarget::Name(name) => new_config.get_block(name),
        };

        match target_id {
            Some(target_id) => {
                debug!("block {key:?}: {source_id} -> {target_id}");
                output.insert(source_id, target_id);
            }
            None => debug!("block {key:?}: missing from new config, assuming absent from world"),
        }
    }
    Ok(())
}

fn build_item_rules(
    output: &mut HashMap<i32, MapTarget>,
    old_config: &Config,
    new_config: &Config,
    mod_rules: &ModRules,
) -> Result<(), MapError> {
    info!("building item map for {}", mod_rules.name);

    let damage_names: HashSet<&str> = mod_rules
        .item_damage
        .keys()
        .map(|(name, _)| name.as_str())
        .collect();

    let keys = keys_to_map(
        old_config.auto_items(),
        mod_rules
            .items
            .keys()
            .filter(|key| matches!(key, RuleKey::Name(_)))
            .cloned()
            .chain(
                mod_rules
                    .item_damage
                    .keys()
                    .map(|(name, _)| RuleKey::Name(name.clone())),
            ),
        mod_rules
            .items
            .keys()
            .filter(|key| matches!(key, RuleKey::Id(_)))
            .cloned(),
    );

    for key in keys {
        // Per-damage rules beat prefix rules for the same source name.
        if let RuleKey::Name(name) = &key {
            if damage_names.contains(name.as_str()) {
                build_damage_entry(output, old_config, new_config, mod_rules, name)?;
                continue;
            }
        }

        let directive = find_directive(&key, &mod_rules.items);
        let target = apply_directive(mod_rules.name, &key, directive, &mod_rules.items)?;

        let source_id = match &key {
            RuleKey::Id(id) => *id,
            RuleKey::Name(name) => match old_config.get_item(name) {
                Some(id) => id + ITEM_ID_SHIFT,
                None => {
                    debug!("item {name}: missing from old config, skipping");
                    continue;
                }
            },
        };

        let target_id = match &target {
            RuleTarget::Id(id) => Some(*id),
            RuleTarget::Name(name) => resolve_item_name(new_config, name),
        };

        match target_id {
            Some(target_id) => {
                debug!("item {key:?}: {source_id} -> {target_id}");
                output.insert(source_id, MapTarget::Id(target_id));
            }
            None => debug!("item {key:?}: missing from new config, assuming absent from world"),
        }
    }
    Ok(())
}

fn build_damage_entry(
    output: &mut HashMap<i32, MapTarget>,
    old_config: &Config,
    new_config: &Config,
    mod_rules: &ModRules,
    name: &str,
) -> Result<(), MapError> {
    let Some(source_id) = old_config.get_item(name).map(|id| id + ITEM_ID_SHIFT) else {
        debug!("item {name}: missing from old config, skipping damage rules");
        return Ok(());
    };

    let mut damage_map = BTreeMap::new();
    for ((rule_name, damage), (target, target_damage)) in &mod_rules.item_damage {
        if rule_name != name {
            continue;
        }

        let target_id = match target {
            RuleTarget::Id(id) => Some(*id),
            RuleTarget::Name(target_name) => resolve_item_name(new_config, target_name),
        };

        match target_id {
            Some(target_id) => {
                damage_map.insert(*damage, (target_id, *target_damage));
            }
            None => warn!(
                "item {name} damage {damage}: target missing from new config, \
                 assuming absent from world",
            ),
        }
    }

    if damage_map.is_empty() {
        warn!("item {name}: no damage values could be mapped");
    } else {
        debug!("item {name}: {} damage value(s) mapped", damage_map.len());
        output.insert(source_id, MapTarget::ByDamage(damage_map));
    }
    Ok(())
}

/// Item targets prefer the item lookup (shifted) and fall back to the block
/// lookup for targets that turned out to be blocks.
fn resolve_item_name(new_config: &Config, name: &str) -> Option<i32> {
    new_config
        .get_item(name)
        .map(|id| id + ITEM_ID_SHIFT)
        .or_else(|| new_config.get_block(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigDescriptor, ConfigFormat};

    fn hier(text: &str) -> Config {
        Config::parse_hier(text, false).unwrap()
    }

    // The descriptor is unused by the in-memory build helpers, but ModRules
    // requires one; point it at nothing.
    fn dummy_descriptor() -> ConfigDescriptor {
        ConfigDescriptor::new(ConfigFormat::Ini, "unused.cfg")
    }

    fn build_with(
        old: &Config,
        new: &Config,
        rules: &ModRules,
    ) -> (HashMap<i32, i32>, HashMap<i32, MapTarget>) {
        let mut blocks = HashMap::new();
        let mut items = HashMap::new();
        build_block_rules(&mut blocks, old, new, rules).unwrap();
        build_item_rules(&mut items, old, new, rules).unwrap();
        (blocks, items)
    }

    #[test]
    fn automatic_enumeration_with_prefix_substitution() {
        let old = hier("blocks {\n\x20   pipe.wood = 200\n\x20   pipe.stone = 201\n}\n");
        let new = hier("blocks {\n\x20   tube.wood = 300\n\x20   tube.stone = 301\n}\n");

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor())
            .block("pipe", "tube");

        let (blocks, _) = build_with(&old, &new, &rules);
        assert_eq!(blocks.get(&200), Some(&300));
        assert_eq!(blocks.get(&201), Some(&301));
    }

    #[test]
    fn longer_prefix_wins() {
        let old = hier("blocks {\n\x20   pipe.wood = 200\n}\n");
        let new = hier("blocks {\n\x20   special = 310\n\x20   tube.wood = 300\n}\n");

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor())
            .block("pipe", "tube")
            .block("pipe.wood", "special");

        let (blocks, _) = build_with(&old, &new, &rules);
        assert_eq!(blocks.get(&200), Some(&310));
    }

    #[test]
    fn item_ids_are_shifted_and_fall_back_to_blocks() {
        let old = hier("items {\n\x20   gear = 5000\n\x20   placer = 5001\n}\n");
        // `gear` is still an item in the new config; `placer` became a block.
        let new = hier(
            "items {\n\x20   gear = 6000\n}\n\
             blocks {\n\x20   placer = 140\n}\n",
        );

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor());

        let (_, items) = build_with(&old, &new, &rules);
        assert_eq!(items.get(&5256), Some(&MapTarget::Id(6256)));
        assert_eq!(items.get(&5257), Some(&MapTarget::Id(140)));
    }

    #[test]
    fn integer_keys_map_only_themselves() {
        let old = hier("blocks {\n\x20   known = 10\n}\n");
        let new = hier("blocks {\n\x20   known = 11\n}\n");

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor())
            .block(4095, 90);

        let (blocks, _) = build_with(&old, &new, &rules);
        assert_eq!(blocks.get(&4095), Some(&90));
        assert_eq!(blocks.get(&10), Some(&11));
    }

    #[test]
    fn damage_rules_beat_prefix_rules() {
        let old = hier("items {\n\x20   dust = 5100\n}\n");
        let new = hier("items {\n\x20   dust.red = 6100\n\x20   dust.blue = 6101\n}\n");

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor())
            .item("dust", "would-not-resolve")
            .item_damage("dust", 0, "dust.red", 0)
            .item_damage("dust", 1, "dust.blue", 7);

        let (_, items) = build_with(&old, &new, &rules);
        let target = items.get(&5356).unwrap();
        let MapTarget::ByDamage(by_damage) = target else {
            panic!("expected a damage-split entry, got {target:?}");
        };
        assert_eq!(by_damage.get(&0), Some(&(6356, 0)));
        assert_eq!(by_damage.get(&1), Some(&(6357, 7)));
    }

    #[test]
    fn missing_target_is_benign() {
        let old = hier("blocks {\n\x20   gone = 20\n}\n");
        let new = hier("blocks {\n\x20   other = 21\n}\n");

        let rules = ModRules::new("test", dummy_descriptor(), dummy_descriptor());
        let (blocks, _) = build_with(&old, &new, &rules);
        assert!(!blocks.contains_key(&20));
    }

    #[test]
    fn blocks_are_mirrored_into_the_item_table() {
        let mut blocks = HashMap::new();
        blocks.insert(17, 300);
        let mut items = HashMap::new();
        items.insert(17, MapTarget::Id(999));
        items.insert(400, MapTarget::Id(401));

        let info = MapInfo::from_tables(blocks, items);
        assert_eq!(info.remap_block(17), Some(300));
        // The block entry wins over the stale item entry.
        assert_eq!(info.item_target(17), Some(&MapTarget::Id(300)));
        assert_eq!(info.item_target(400), Some(&MapTarget::Id(401)));
    }
}
