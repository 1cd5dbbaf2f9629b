use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use glam::IVec2;
use strandhold_shared::{
    generate_world, BlockKind, Occupant, OccupantTag, ResourceKind, Terrain, WorldHandle, WorldSettings,
};

struct Options {
    config: Option<PathBuf>,
    seed: Option<u64>,
    map: bool,
}

fn main() {
    let options = match parse_args(env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("Usage: world_inspector [--config <path>] [--seed <u64>] [--no-map]");
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&options) {
        eprintln!("world_inspector error: {err}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        config: None,
        seed: None,
        map: true,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or("--config expects a path argument")?;
                options.config = Some(PathBuf::from(value));
            }
            "--seed" => {
                let value = args.next().ok_or("--seed expects a numeric argument")?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|err| format!("invalid seed '{value}': {err}"))?;
                options.seed = Some(seed);
            }
            "--no-map" => options.map = false,
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(options))
}

fn run(options: &Options) -> Result<(), String> {
    let mut settings = match &options.config {
        Some(path) => WorldSettings::load(path).map_err(|err| err.to_string())?,
        None => WorldSettings::default(),
    };
    if let Some(seed) = options.seed {
        settings.seed = seed;
    }

    let world = generate_world(&settings).map_err(|err| format!("failed to generate world: {err}"))?;

    println!(
        "World: {}x{} cells, seed {}, chunk size {}",
        world.terrain().width(),
        world.terrain().height(),
        world.seed(),
        world.mapper().chunk_size()
    );
    for (label, count) in terrain_counts(&world) {
        println!("  {label}: {count}");
    }
    for (label, count) in occupant_counts(&world) {
        println!("  {label}: {count}");
    }

    if options.map {
        println!();
        for line in render_map(&world) {
            println!("{line}");
        }
    }
    Ok(())
}

fn terrain_counts(world: &WorldHandle) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (cell, terrain) in world.terrain().cells() {
        let label = match terrain {
            Terrain::Water => "water".to_string(),
            Terrain::Sand => "sand".to_string(),
            Terrain::Biome(id) => world
                .biome_name(cell)
                .map_or_else(|| format!("biome {}", id.0), str::to_string),
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

fn occupant_counts(world: &WorldHandle) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for occupant in world.overlay().as_slice().iter().flatten() {
        let label = match occupant.tag() {
            OccupantTag::Resource(ResourceKind::Tree) => "trees",
            OccupantTag::Resource(ResourceKind::Rock) => "rocks",
            OccupantTag::Block(_) => "blocks",
            OccupantTag::Obstacle => "obstacles",
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

fn cell_glyph(terrain: Terrain, occupant: Option<&Occupant>) -> char {
    match occupant {
        Some(Occupant::Resource(node)) if node.kind == ResourceKind::Tree => 'T',
        Some(Occupant::Resource(_)) => 'o',
        Some(Occupant::Block(block)) if block.kind == BlockKind::Wood => '=',
        Some(Occupant::Block(_)) => '#',
        Some(Occupant::Obstacle) => 'X',
        None => match terrain {
            Terrain::Water => '~',
            Terrain::Sand => '.',
            Terrain::Biome(id) => char::from_digit(u32::from(id.0 % 10), 10).unwrap_or('?'),
        },
    }
}

fn render_map(world: &WorldHandle) -> Vec<String> {
    let terrain = world.terrain();
    (0..terrain.height())
        .map(|y| {
            (0..terrain.width())
                .map(|x| {
                    let cell = IVec2::new(x, y);
                    let ground = world.terrain_at(cell).unwrap_or(Terrain::Water);
                    cell_glyph(ground, world.overlay().occupant(cell))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use strandhold_shared::{BiomeId, BlockKind, Occupant, PlacedBlock, Terrain};

    use super::{cell_glyph, parse_args};

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_seed_and_config() {
        let options = parse_args(args(&["--seed", "7", "--config", "world.toml", "--no-map"]))
            .expect("valid arguments")
            .expect("not a help request");
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.config.as_deref(), Some(std::path::Path::new("world.toml")));
        assert!(!options.map);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&["--seed", "abc"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--help"])).expect("help is valid").is_none());
    }

    #[test]
    fn glyphs_prefer_occupants_over_ground() {
        assert_eq!(cell_glyph(Terrain::Water, None), '~');
        assert_eq!(cell_glyph(Terrain::Sand, None), '.');
        assert_eq!(cell_glyph(Terrain::Biome(BiomeId(13)), None), '3');
        let block = Occupant::Block(PlacedBlock::new(BlockKind::Stone));
        assert_eq!(cell_glyph(Terrain::Sand, Some(&block)), '#');
        assert_eq!(cell_glyph(Terrain::Sand, Some(&Occupant::Obstacle)), 'X');
    }
}
