use worldshift_mapping::MapTarget;
use worldshift_nbt::{Tag, TagCompound, TagKind};

use crate::{nav, RemapContext, RemapError};


/// Translates one item compound's `id` (and `Damage`, for damage-split
/// mappings) through the item table, then offers the compound to every
/// registered transformer's item hook so nested containers are descended.
///
/// An item compound without an `id` child is left alone; empty compounds
/// pad out fixed-length inventories.
pub fn remap_item_compound(
    item: &mut TagCompound,
    ctx: &RemapContext<'_>,
) -> Result<(), RemapError> {
    if item.get("id").is_none() {
        return Ok(());
    }

    let id = nav::require_number(item, "id", &[TagKind::Short])?;
    let id = id as i32;
    let damage = nav::optional_number(item, "Damage", &[TagKind::Short])?;

    let target = ctx.map.item_target(id).ok_or(RemapError::UnmappedItem(id))?;
    let (new_id, new_damage) = match target {
        MapTarget::Id(new_id) => (*new_id, damage),
        MapTarget::ByDamage(by_damage) => {
            let damage = damage.ok_or(RemapError::DamageRequired(id))? as i16;
            let &(new_id, new_damage) = by_damage
                .get(&damage)
                .ok_or(RemapError::DamageNotMapped { id, damage })?;
            (new_id, Some(i64::from(new_damage)))
        }
    };

    let new_id = i16::try_from(new_id).map_err(|_| RemapError::ItemIdOutOfRange(new_id))?;
    item.insert("id", Tag::Short(new_id));
    if let Some(new_damage) = new_damage {
        item.insert("Damage", Tag::Short(new_damage as i16));
    }

    for transformer in ctx.transformers {
        transformer.remap_item(item, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use worldshift_mapping::MapInfo;

    use super::*;

    fn map_with(items: HashMap<i32, MapTarget>) -> MapInfo {
        MapInfo::from_tables(HashMap::new(), items)
    }

    fn item(id: i16, damage: Option<i16>) -> TagCompound {
        let mut compound = TagCompound::new();
        compound.insert("id", Tag::Short(id));
        if let Some(damage) = damage {
            compound.insert("Damage", Tag::Short(damage));
        }
        compound.insert("Count", Tag::Byte(1));
        compound
    }

    #[test]
    fn plain_remap_rewrites_id_and_keeps_damage() {
        let mut items = HashMap::new();
        items.insert(4, MapTarget::Id(90));
        let map = map_with(items);
        let ctx = RemapContext {
            map: &map,
            transformers: &[],
        };

        let mut compound = item(4, Some(3));
        remap_item_compound(&mut compound, &ctx).unwrap();
        assert_eq!(compound.get("id"), Some(&Tag::Short(90)));
        assert_eq!(compound.get("Damage"), Some(&Tag::Short(3)));
    }

    #[test]
    fn damage_split_rewrites_both() {
        let mut by_damage = BTreeMap::new();
        by_damage.insert(0i16, (700, 2i16));
        let mut items = HashMap::new();
        items.insert(5, MapTarget::ByDamage(by_damage));
        let map = map_with(items);
        let ctx = RemapContext {
            map: &map,
            transformers: &[],
        };

        let mut compound = item(5, Some(0));
        remap_item_compound(&mut compound, &ctx).unwrap();
        assert_eq!(compound.get("id"), Some(&Tag::Short(700)));
        assert_eq!(compound.get("Damage"), Some(&Tag::Short(2)));

        // Missing damage on a split mapping is fatal.
        let mut no_damage = item(5, None);
        let err = remap_item_compound(&mut no_damage, &ctx).unwrap_err();
        assert!(matches!(err, RemapError::DamageRequired(5)));

        // So is a damage value outside the table.
        let mut wrong_damage = item(5, Some(9));
        let err = remap_item_compound(&mut wrong_damage, &ctx).unwrap_err();
        assert!(matches!(err, RemapError::DamageNotMapped { id: 5, damage: 9 }));
    }

    #[test]
    fn unmapped_item_is_fatal_and_empty_compound_is_skipped() {
        let map = map_with(HashMap::new());
        let ctx = RemapContext {
            map: &map,
            transformers: &[],
        };

        let mut empty = TagCompound::new();
        remap_item_compound(&mut empty, &ctx).unwrap();

        let mut compound = item(42, None);
        let err = remap_item_compound(&mut compound, &ctx).unwrap_err();
        assert!(matches!(err, RemapError::UnmappedItem(42)));
    }
}
