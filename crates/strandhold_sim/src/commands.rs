use glam::IVec2;
use strandhold_shared::BlockKind;

const SPAWN_USAGE: &str = "Usage: /spawn <count>";
const HARVEST_USAGE: &str = "Usage: /harvest <x> <y>";
const PLACE_USAGE: &str = "Usage: /place <x> <y> <wood|stone>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Noop,
    Stop,
    Status,
    Spawn(u32),
    Harvest(IVec2),
    Place { cell: IVec2, kind: BlockKind },
    Help,
    InvalidUsage(String),
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Noop;
    }

    let input = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if input.is_empty() {
        return Command::Noop;
    }

    let mut head_tail = input.splitn(2, char::is_whitespace);
    let command = head_tail.next().unwrap_or_default().to_ascii_lowercase();
    let rest = head_tail.next().unwrap_or("").trim();
    let mut args = rest.split_whitespace();

    match command.as_str() {
        "stop" | "quit" => Command::Stop,
        "status" => Command::Status,
        "spawn" => match (args.next(), args.next()) {
            (None, None) => Command::Spawn(1),
            (Some(count), None) => match count.parse::<u32>() {
                Ok(parsed) if parsed > 0 => Command::Spawn(parsed),
                _ => Command::InvalidUsage(SPAWN_USAGE.to_string()),
            },
            _ => Command::InvalidUsage(SPAWN_USAGE.to_string()),
        },
        "harvest" => match (args.next(), args.next(), args.next()) {
            (Some(x), Some(y), None) => match parse_cell(x, y) {
                Some(cell) => Command::Harvest(cell),
                None => Command::InvalidUsage(HARVEST_USAGE.to_string()),
            },
            _ => Command::InvalidUsage(HARVEST_USAGE.to_string()),
        },
        "place" => match (args.next(), args.next(), args.next(), args.next()) {
            (Some(x), Some(y), Some(kind), None) => {
                match (parse_cell(x, y), parse_block_kind(kind)) {
                    (Some(cell), Some(kind)) => Command::Place { cell, kind },
                    _ => Command::InvalidUsage(PLACE_USAGE.to_string()),
                }
            }
            _ => Command::InvalidUsage(PLACE_USAGE.to_string()),
        },
        "help" => Command::Help,
        _ => Command::Unknown(input.to_string()),
    }
}

fn parse_cell(x: &str, y: &str) -> Option<IVec2> {
    Some(IVec2::new(x.parse().ok()?, y.parse().ok()?))
}

fn parse_block_kind(name: &str) -> Option<BlockKind> {
    match name.to_ascii_lowercase().as_str() {
        "wood" => Some(BlockKind::Wood),
        "stone" => Some(BlockKind::Stone),
        _ => None,
    }
}
