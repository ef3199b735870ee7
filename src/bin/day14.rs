use std::cmp;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

const SOURCE: Point = Point { x: 500, y: 0 };

/// Upper bound on arena cells, one byte each.
const MAX_CELLS: i64 = 1 << 26;

#[derive(Debug, Error, PartialEq)]
enum CaveError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("rock segment {from} -> {to} is diagonal")]
    Diagonal { from: Point, to: Point },
    #[error("scan contains no rock")]
    NoRock,
    #[error("rock coordinates span too large a cave")]
    TooLarge,
    #[error("position {x},{y} is outside the cave")]
    OutOfBounds { x: i64, y: i64 },
}

#[derive(Parser, Debug)]
#[command(about = "Regolith reservoir: pour sand into a cave of rock paths")]
struct Args {
    /// Rock paths, one per line
    #[arg(default_value = "input.txt")]
    input: PathBuf,

    /// Log intermediate results, including rendered caves
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Cell {
    Air, Rock, Sand,
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Rest(Point),
    Abyss,
    SourceBlocked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Point {
    x: i64,
    y: i64,
}

impl Point {
    fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }

    fn falls(&self) -> [Point; 3] {
        [
            Point::new(self.x, self.y + 1),
            Point::new(self.x - 1, self.y + 1),
            Point::new(self.x + 1, self.y + 1),
        ]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

type RockPath = Vec<Point>;

fn parse_paths(input: &str) -> Result<Vec<RockPath>, CaveError> {
    let mut paths = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let path = line.split(" -> ")
            .map(|pair| parse_point(pair).map_err(|reason| CaveError::Parse { line: i + 1, reason }))
            .collect::<Result<RockPath, _>>()?;
        paths.push(path);
    }
    log::debug!("parsed {} rock paths", paths.len());
    Ok(paths)
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected x,y, got {s:?}"))?;
    let x = x.trim().parse::<i64>().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y = y.trim().parse::<i64>().map_err(|e| format!("bad y {y:?}: {e}"))?;
    if y < 0 {
        return Err(format!("rock above the sand source: {s:?}"));
    }
    Ok(Point::new(x, y))
}

/// Leftmost column, width, height and cell count of an arena spanning
/// `x_lo..=x_hi` plus a one-column margin each side, down to `floor`.
fn arena_dims(x_lo: i64, x_hi: i64, floor: i64) -> Option<(i64, i64, i64, i64)> {
    let x_min = x_lo.checked_sub(1)?;
    let width = x_hi.checked_add(1)?.checked_sub(x_min)?.checked_add(1)?;
    let height = floor.checked_add(1)?;
    let cells = width.checked_mul(height).filter(|&n| n <= MAX_CELLS)?;
    Some((x_min, width, height, cells))
}

/// Bounds-checked grid covering every position a grain can reach, including
/// the spread of the pile over the floor two rows below the deepest rock.
struct Cave {
    cells: Vec<Cell>,
    x_min: i64,
    width: i64,
    height: i64,
    rock_bottom: i64,
    floor: Option<i64>,
}

impl Cave {
    fn from_paths(paths: &[RockPath]) -> Result<Self, CaveError> {
        let rocks = || paths.iter().flatten();
        let rock_bottom = rocks().map(|p| p.y).max().ok_or(CaveError::NoRock)?;
        let floor = rock_bottom.checked_add(2).ok_or(CaveError::TooLarge)?;
        let x_lo = cmp::min(rocks().map(|p| p.x).min().unwrap_or(SOURCE.x), SOURCE.x - floor);
        let x_hi = cmp::max(rocks().map(|p| p.x).max().unwrap_or(SOURCE.x), SOURCE.x.saturating_add(floor));
        let (x_min, width, height, cells) = arena_dims(x_lo, x_hi, floor).ok_or(CaveError::TooLarge)?;
        let x_max = x_min + width - 1;
        let mut cave = Cave {
            cells: vec![Cell::Air; cells as usize],
            x_min,
            width,
            height,
            rock_bottom,
            floor: None,
        };
        for path in paths {
            if let [only] = &path[..] {
                cave.set(*only, Cell::Rock)?;
            }
            for seg in path.windows(2) {
                cave.set_line(seg[0], seg[1], Cell::Rock)?;
            }
        }
        log::debug!("cave spans x={x_min}..={x_max}, deepest rock at y={rock_bottom}");
        Ok(cave)
    }

    fn add_floor(&mut self) -> Result<(), CaveError> {
        let y = self.rock_bottom + 2;
        let left = Point::new(self.x_min, y);
        let right = Point::new(self.x_min + self.width - 1, y);
        self.set_line(left, right, Cell::Rock)?;
        self.floor = Some(y);
        Ok(())
    }

    fn index(&self, p: Point) -> Result<usize, CaveError> {
        let col = p.x - self.x_min;
        if !(0..self.width).contains(&col) || !(0..self.height).contains(&p.y) {
            return Err(CaveError::OutOfBounds { x: p.x, y: p.y });
        }
        Ok((p.y * self.width + col) as usize)
    }

    fn get(&self, p: Point) -> Result<Cell, CaveError> {
        Ok(self.cells[self.index(p)?])
    }

    fn set(&mut self, p: Point, cell: Cell) -> Result<(), CaveError> {
        let i = self.index(p)?;
        self.cells[i] = cell;
        Ok(())
    }

    fn set_line(&mut self, from: Point, to: Point, cell: Cell) -> Result<(), CaveError> {
        if from.x == to.x {
            for y in cmp::min(from.y, to.y)..=cmp::max(from.y, to.y) {
                self.set(Point::new(from.x, y), cell)?;
            }
        } else if from.y == to.y {
            for x in cmp::min(from.x, to.x)..=cmp::max(from.x, to.x) {
                self.set(Point::new(x, from.y), cell)?;
            }
        } else {
            return Err(CaveError::Diagonal { from, to });
        }
        Ok(())
    }

    fn drop_sand(&mut self) -> Result<Outcome, CaveError> {
        if self.get(SOURCE)? != Cell::Air {
            return Ok(Outcome::SourceBlocked);
        }
        let mut cur = SOURCE;
        'falling: loop {
            // Without a floor, anything past the deepest rock never stops.
            if self.floor.is_none() && cur.y >= self.rock_bottom {
                return Ok(Outcome::Abyss);
            }
            for next in cur.falls() {
                if self.get(next)? == Cell::Air {
                    cur = next;
                    continue 'falling;
                }
            }
            self.set(cur, Cell::Sand)?;
            return Ok(Outcome::Rest(cur));
        }
    }

    /// Smallest box holding every non-air cell, as half-open corners.
    fn active_box(&self) -> Option<(Point, Point)> {
        let occupied = || {
            self.cells.iter()
                .enumerate()
                .filter(|&(_, &c)| c != Cell::Air)
                .map(|(i, _)| i as i64)
                .map(|i| Point::new(i % self.width + self.x_min, i / self.width))
        };
        let x1 = occupied().map(|p| p.x).min()?;
        let x2 = occupied().map(|p| p.x).max()?;
        let y1 = occupied().map(|p| p.y).min()?;
        let y2 = occupied().map(|p| p.y).max()?;
        Some((Point::new(x1, y1), Point::new(x2 + 1, y2 + 1)))
    }
}

impl fmt::Display for Cave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((p1, p2)) = self.active_box() else {
            return writeln!(f, "empty");
        };
        for y in p1.y..p2.y {
            write!(f, "{y:3} ")?;
            for x in p1.x..p2.x {
                let c = match self.get(Point::new(x, y)) {
                    Ok(Cell::Rock) => '#',
                    Ok(Cell::Sand) => 'o',
                    Ok(Cell::Air) | Err(_) => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Pour sand until a grain fails to come to rest; returns the grains at rest.
fn pour(cave: &mut Cave) -> Result<usize, CaveError> {
    let mut count = 0;
    loop {
        match cave.drop_sand()? {
            Outcome::Rest(p) if p == SOURCE => return Ok(count + 1),
            Outcome::Rest(_) => count += 1,
            Outcome::Abyss | Outcome::SourceBlocked => return Ok(count),
        }
    }
}

fn part1(paths: &[RockPath]) -> Result<usize, CaveError> {
    let mut cave = Cave::from_paths(paths)?;
    let count = pour(&mut cave)?;
    log::debug!("cave after {count} grains:\n{cave}");
    Ok(count)
}

fn part2(paths: &[RockPath]) -> Result<usize, CaveError> {
    let mut cave = Cave::from_paths(paths)?;
    cave.add_floor()?;
    let count = pour(&mut cave)?;
    log::debug!("floored cave after {count} grains:\n{cave}");
    Ok(count)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);
    let input = fs::read_to_string(&args.input)
        .map_err(|e| format!("read {}: {e}", args.input.display()))?;
    let paths = parse_paths(&input)?;
    println!("Part 1: {}", part1(&paths)?);
    println!("Part 2: {}", part2(&paths)?);
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE: &str = "\
498,4 -> 498,6 -> 496,6
503,4 -> 502,4 -> 502,9 -> 494,9";

    #[test]
    fn test_parse_paths() {
        let paths = parse_paths(EXAMPLE).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], vec![Point::new(498, 4), Point::new(498, 6), Point::new(496, 6)]);
    }

    #[test]
    fn test_parse_bad_point() {
        assert!(matches!(parse_paths("498,4 -> 498"), Err(CaveError::Parse { line: 1, .. })));
        assert!(matches!(parse_paths("1,1\n498,x"), Err(CaveError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_diagonal_rejected() {
        let paths = parse_paths("498,4 -> 500,6").unwrap();
        assert_eq!(
            Cave::from_paths(&paths).err(),
            Some(CaveError::Diagonal { from: Point::new(498, 4), to: Point::new(500, 6) }),
        );
    }

    #[test]
    fn test_no_rock() {
        assert_eq!(part1(&[]), Err(CaveError::NoRock));
    }

    #[test]
    fn test_cave_too_large() {
        let paths = parse_paths("1000000000000,5 -> 1000000000000,6").unwrap();
        assert_eq!(part1(&paths), Err(CaveError::TooLarge));
        let paths = parse_paths("9223372036854775807,5").unwrap();
        assert_eq!(part2(&paths), Err(CaveError::TooLarge));
        let paths = parse_paths("500,9223372036854775807").unwrap();
        assert_eq!(part1(&paths), Err(CaveError::TooLarge));
    }

    #[test]
    fn test_out_of_bounds() {
        let paths = parse_paths(EXAMPLE).unwrap();
        let cave = Cave::from_paths(&paths).unwrap();
        assert_eq!(cave.get(Point::new(500, -1)), Err(CaveError::OutOfBounds { x: 500, y: -1 }));
        assert_eq!(cave.get(Point::new(0, 5)), Err(CaveError::OutOfBounds { x: 0, y: 5 }));
        assert_eq!(cave.get(Point::new(502, 7)), Ok(Cell::Rock));
    }

    #[test]
    fn test_first_grain() {
        let paths = parse_paths(EXAMPLE).unwrap();
        let mut cave = Cave::from_paths(&paths).unwrap();
        assert_eq!(cave.drop_sand(), Ok(Outcome::Rest(Point::new(500, 8))));
        assert_eq!(cave.drop_sand(), Ok(Outcome::Rest(Point::new(499, 8))));
        assert_eq!(cave.drop_sand(), Ok(Outcome::Rest(Point::new(501, 8))));
    }

    #[test]
    fn test_render() {
        let paths = parse_paths("500,2 -> 502,2").unwrap();
        let cave = Cave::from_paths(&paths).unwrap();
        assert_eq!(cave.to_string(), "  2 ###\n");
    }

    #[test]
    fn test_part1() {
        let paths = parse_paths(EXAMPLE).unwrap();
        assert_eq!(part1(&paths).unwrap(), 24);
    }

    #[test]
    fn test_part2() {
        let paths = parse_paths(EXAMPLE).unwrap();
        assert_eq!(part2(&paths).unwrap(), 93);
    }

    #[test]
    fn test_part1_source_blocked() {
        // A cup around the source fills to the brim without anything escaping.
        let paths = parse_paths("499,0 -> 499,1 -> 501,1 -> 501,0").unwrap();
        assert_eq!(part1(&paths).unwrap(), 1);
    }
}
