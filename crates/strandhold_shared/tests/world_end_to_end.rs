use glam::IVec2;
use strandhold_shared::worldgen::is_isolated_sand;
use strandhold_shared::{find_path, generate_world, Goal, OverlayGrid, Terrain, WorldHandle, WorldSettings};

fn world_with(seed: u64, width: i32, height: i32) -> WorldHandle {
    let mut settings = WorldSettings::with_seed(seed);
    settings.generation.width = width;
    settings.generation.height = height;
    generate_world(&settings).expect("generate world")
}

#[test]
fn same_seed_generates_byte_identical_grids() {
    let a = world_with(1234, 96, 80);
    let b = world_with(1234, 96, 80);

    let terrain_a = bincode::serialize(a.terrain()).expect("encode terrain");
    let terrain_b = bincode::serialize(b.terrain()).expect("encode terrain");
    assert_eq!(terrain_a, terrain_b);

    let overlay_a = bincode::serialize(a.overlay()).expect("encode overlay");
    let overlay_b = bincode::serialize(b.overlay()).expect("encode overlay");
    assert_eq!(overlay_a, overlay_b);
}

#[test]
fn small_dry_world_has_no_water_and_regenerates_identically() {
    let mut settings = WorldSettings::with_seed(42);
    settings.generation.width = 10;
    settings.generation.height = 10;
    settings.generation.biomes = vec!["dark_grass".into(), "grass".into()];
    settings.generation.water_threshold = -0.9;

    let first = generate_world(&settings).expect("generate world");
    assert!(first.terrain().as_slice().iter().all(|t| !t.is_water()));

    let second = generate_world(&settings).expect("generate world");
    assert_eq!(first.terrain(), second.terrain());
    assert_eq!(first.overlay(), second.overlay());
}

#[test]
fn no_isolated_sand_survives_generation() {
    for seed in [3, 77, 500, 9_001] {
        let mut settings = WorldSettings::with_seed(seed);
        settings.generation.width = 120;
        settings.generation.height = 120;
        settings.generation.water_threshold = -0.2;
        let world = generate_world(&settings).expect("generate world");

        for (cell, terrain) in world.terrain().cells() {
            if *terrain == Terrain::Sand {
                assert!(
                    !is_isolated_sand(world.terrain(), cell),
                    "seed {seed}: isolated sand at {cell}"
                );
            }
        }
    }
}

#[test]
fn straight_path_on_empty_overlay() {
    let mut settings = WorldSettings::with_seed(8);
    settings.generation.width = 12;
    settings.generation.height = 12;
    let world = generate_world(&settings).expect("generate world");

    let empty = OverlayGrid::empty(12, 12);
    let path = find_path(
        IVec2::ZERO,
        Goal::Cell(IVec2::new(5, 0)),
        &empty,
        None,
        world.nav_settings().max_expansions,
    );
    let expected: Vec<IVec2> = (0..=5).map(|x| IVec2::new(x, 0)).collect();
    assert!(path.complete);
    assert_eq!(path.steps, expected);
}

#[test]
fn settings_file_round_trip_regenerates_the_same_world() {
    let mut settings = WorldSettings::with_seed(2_024);
    settings.generation.width = 40;
    settings.generation.height = 40;
    let text = settings.to_toml_string().expect("serialize settings");
    let reloaded =
        WorldSettings::from_toml_str(&text, std::path::Path::new("strandhold.toml")).expect("parse settings");

    let original = generate_world(&settings).expect("generate world");
    let restored = generate_world(&reloaded).expect("generate world");
    assert_eq!(original.terrain(), restored.terrain());
    assert_eq!(original.overlay(), restored.overlay());
}
