use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use log::{debug, info};

use worldshift_mapping::MapInfo;
use worldshift_nbt::io::{read_tree, tree_to_bytes, write_tree, Framing};
use worldshift_region::{parse_region_name, RegionFile};
use worldshift_remap::RemapContext;

use crate::{profile, Args};


/// Runs the whole migration: mapping tables, every dimension's regions,
/// multiplayer player files, and the single-player data in `level.dat`.
///
/// Strictly sequential; one chunk is in flight at a time, and nothing is
/// written for a region until every chunk in it has been transformed.
pub(crate) fn run(args: &Args) -> anyhow::Result<()> {
    let input_world = args.input_base.join(&args.input_world);
    if !input_world.is_dir() {
        bail!(
            "input world directory {} is not an existing directory",
            input_world.display(),
        );
    }
    let output_world = args.output_base.join(&args.output_world);
    fs::create_dir_all(&output_world)
        .with_context(|| format!("creating {}", output_world.display()))?;

    info!("constructing mapping tables");
    let map = MapInfo::build(
        &args.input_base,
        &args.output_base,
        profile::VANILLA_BLOCK_RANGES,
        profile::VANILLA_ITEM_RANGES,
        &profile::mod_rules(),
    )?;
    info!(
        "mapping {} block id(s) and {} item id(s)",
        map.block_count(),
        map.item_count(),
    );

    let transformers = profile::transformers();
    let ctx = RemapContext {
        map:          &map,
        transformers: &transformers,
    };

    process_dimensions(&input_world, &output_world, &ctx)?;
    process_players(&input_world, &output_world, &ctx)?;
    process_level_dat(&input_world, &output_world, &ctx)?;
    Ok(())
}

/// The root `region` directory plus every `DIM*/region` that exists.
fn find_dimensions(input_world: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dimensions = vec![PathBuf::from("region")];

    let mut dim_names: Vec<String> = Vec::new();
    for entry in fs::read_dir(input_world)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with("DIM") && input_world.join(name).join("region").is_dir() {
            dim_names.push(name.to_owned());
        }
    }
    dim_names.sort();

    dimensions.extend(dim_names.into_iter().map(|name| PathBuf::from(name).join("region")));
    Ok(dimensions)
}

fn process_dimensions(
    input_world: &Path,
    output_world: &Path,
    ctx: &RemapContext<'_>,
) -> anyhow::Result<()> {
    for dimension in find_dimensions(input_world)? {
        let input_dim = input_world.join(&dimension);
        if !input_dim.is_dir() {
            // A world with no overworld regions at all.
            continue;
        }
        info!("processing dimension {}", dimension.display());

        let output_dim = output_world.join(&dimension);
        fs::create_dir_all(&output_dim)
            .with_context(|| format!("creating {}", output_dim.display()))?;

        let mut region_names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&input_dim)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if parse_region_name(name).is_some() {
                    region_names.push(name.to_owned());
                }
            }
        }
        region_names.sort();

        for name in region_names {
            process_region(&input_dim.join(&name), &output_dim.join(&name), ctx)
                .with_context(|| format!("processing region {name}"))?;
        }
    }
    Ok(())
}

fn process_region(
    input_path: &Path,
    output_path: &Path,
    ctx: &RemapContext<'_>,
) -> anyhow::Result<()> {
    info!("processing region {}", input_path.display());
    let mut region = RegionFile::read(input_path)?;

    let mut done = 0usize;
    for (slot, record) in region.chunks_mut() {
        let plain = record.decompress(slot)?;
        let (mut root, root_name) = read_tree(&mut plain.as_slice(), Framing::Plain)
            .with_context(|| format!("parsing chunk in slot {slot}"))?;

        worldshift_remap::remap_chunk(&mut root, ctx)
            .with_context(|| format!("transforming chunk in slot {slot}"))?;

        let bytes = tree_to_bytes(Framing::Plain, &root_name, &root)?;
        record.recompress(slot, &bytes)?;
        done += 1;
    }
    debug!("transformed {done} chunk(s)");

    region.write(output_path)?;
    Ok(())
}

fn process_players(
    input_world: &Path,
    output_world: &Path,
    ctx: &RemapContext<'_>,
) -> anyhow::Result<()> {
    let input_players = input_world.join("players");
    if !input_players.is_dir() {
        return Ok(());
    }
    let output_players = output_world.join("players");
    fs::create_dir_all(&output_players)?;

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(&input_players)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    for name in names {
        info!("processing player {name}");
        let bytes = fs::read(input_players.join(&name))?;
        let (mut root, root_name) = read_tree(&mut bytes.as_slice(), Framing::Gzip)
            .with_context(|| format!("parsing player file {name}"))?;

        worldshift_remap::remap_player(&mut root, ctx)
            .with_context(|| format!("transforming player file {name}"))?;

        let mut out = fs::File::create(output_players.join(&name))?;
        write_tree(&mut out, Framing::Gzip, &root_name, &root)?;
    }
    Ok(())
}

fn process_level_dat(
    input_world: &Path,
    output_world: &Path,
    ctx: &RemapContext<'_>,
) -> anyhow::Result<()> {
    let input_path = input_world.join("level.dat");
    if !input_path.is_file() {
        return Ok(());
    }
    info!("processing level.dat");

    let bytes = fs::read(&input_path)?;
    let (mut root, root_name) =
        read_tree(&mut bytes.as_slice(), Framing::Gzip).context("parsing level.dat")?;

    // The single-player data lives at Data/Player; a dedicated-server
    // level.dat has no player compound and is rewritten untouched.
    let player = root
        .get_mut("Data")
        .and_then(worldshift_nbt::Tag::as_compound_mut)
        .and_then(|data| data.get_mut("Player"))
        .and_then(worldshift_nbt::Tag::as_compound_mut);
    match player {
        Some(player) => {
            worldshift_remap::remap_player(player, ctx).context("transforming level.dat")?;
        }
        None => info!("level.dat has no player compound, copying through"),
    }

    let mut out = fs::File::create(output_world.join("level.dat"))?;
    write_tree(&mut out, Framing::Gzip, &root_name, &root)?;
    Ok(())
}
