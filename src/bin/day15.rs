use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

/// Multiplier applied to the x coordinate of the distress beacon.
const TUNING_MULTIPLIER: i64 = 4_000_000;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Sensor at x=(-?[0-9]+), y=(-?[0-9]+): closest beacon is at x=(-?[0-9]+), y=(-?[0-9]+)$").unwrap()
});

#[derive(Debug, Error, PartialEq)]
enum ScanError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("no uncovered position within 0..={search_size} on either axis")]
    NoGapFound { search_size: i64 },
    #[error("no sensor reaches row {row}")]
    EmptyCoverage { row: i64 },
}

#[derive(Parser, Debug)]
#[command(about = "Beacon exclusion zone: count covered positions and locate the distress beacon")]
struct Args {
    /// Sensor report, one reading per line
    #[arg(default_value = "input.txt")]
    input: PathBuf,

    /// Row on which to count positions that cannot hold a beacon
    #[arg(long, default_value_t = 2_000_000, allow_negative_numbers = true)]
    row: i64,

    /// Largest x and y searched for the distress beacon
    #[arg(long, default_value_t = 4_000_000)]
    search_size: i64,

    /// Log intermediate results
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct Point {
    x: i64,
    y: i64,
}

impl Point {
    fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }

    fn manhattan(&self, other: &Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
struct Reading {
    sensor: Point,
    beacon: Point,
}

impl Reading {
    fn from_coords(sensor_x: i64, sensor_y: i64, beacon_x: i64, beacon_y: i64) -> Self {
        Self {
            sensor: Point::new(sensor_x, sensor_y),
            beacon: Point::new(beacon_x, beacon_y),
        }
    }

    fn radius(&self) -> i64 {
        self.sensor.manhattan(&self.beacon)
    }

    /// The x positions on `row` that are no farther from the sensor than its beacon.
    fn coverage_at_row(&self, row: i64) -> Option<Interval> {
        let half_width = self.radius() - (row - self.sensor.y).abs();
        if half_width < 0 {
            return None;
        }
        Some(Interval::new(self.sensor.x - half_width, self.sensor.x + half_width))
    }
}

/// Inclusive span of x coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Interval {
    lo: i64,
    hi: i64,
}

impl Interval {
    fn new(lo: i64, hi: i64) -> Self {
        Interval { lo, hi }
    }

    fn width(&self) -> u64 {
        self.hi.abs_diff(self.lo) + 1
    }

    fn contains(&self, x: i64) -> bool {
        (self.lo..=self.hi).contains(&x)
    }
}

fn parse_readings(input: &str) -> Result<Vec<Reading>, ScanError> {
    let mut readings: Vec<Reading> = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = LINE_RE.captures(line) else {
            return Err(ScanError::Parse {
                line: i + 1,
                reason: format!("unexpected line format: {line:?}"),
            });
        };
        let mut coords = [0i64; 4];
        for (v, m) in coords.iter_mut().zip(caps.iter().skip(1)) {
            let s = m.map(|m| m.as_str()).unwrap_or_default();
            *v = s.parse().map_err(|e| ScanError::Parse {
                line: i + 1,
                reason: format!("bad coordinate {s:?}: {e}"),
            })?;
        }
        readings.push(Reading::from_coords(coords[0], coords[1], coords[2], coords[3]));
    }
    log::debug!("parsed {} sensor readings", readings.len());
    Ok(readings)
}

/// One interval per reading that reaches `row`, in reading order.
fn row_coverage(readings: &[Reading], row: i64) -> Vec<Interval> {
    readings.iter()
        .filter_map(|r| r.coverage_at_row(row))
        .collect()
}

/// Collapse intervals sorted by `lo` into disjoint intervals separated by at
/// least one uncovered position. Returns None for empty input.
fn merge_sorted(sorted: &[Interval]) -> Option<Vec<Interval>> {
    let (first, rest) = sorted.split_first()?;
    let mut merged = vec![*first];
    for iv in rest {
        match merged.last_mut() {
            Some(tail) if iv.lo <= tail.hi.saturating_add(1) => tail.hi = tail.hi.max(iv.hi),
            _ => merged.push(*iv),
        }
    }
    Some(merged)
}

fn merged_coverage(readings: &[Reading], row: i64) -> Result<Vec<Interval>, ScanError> {
    let mut intervals = row_coverage(readings, row);
    intervals.sort_unstable_by_key(|iv| iv.lo);
    merge_sorted(&intervals).ok_or(ScanError::EmptyCoverage { row })
}

/// First x in `min..=max` outside every interval of a merged set.
fn first_gap(merged: &[Interval], min: i64, max: i64) -> Option<i64> {
    let mut x = min;
    for iv in merged {
        if x > max {
            return None;
        }
        if iv.hi < x {
            continue;
        }
        if iv.lo > x {
            return Some(x);
        }
        x = iv.hi + 1;
    }
    (x <= max).then_some(x)
}

fn find_gap(readings: &[Reading], search_size: i64) -> Result<Point, ScanError> {
    for y in 0..=search_size {
        let merged = merged_coverage(readings, y)?;
        if let Some(x) = first_gap(&merged, 0, search_size) {
            log::info!("uncovered position at x={x}, y={y}");
            return Ok(Point::new(x, y));
        }
        log::trace!("row {y} fully covered by {} intervals", merged.len());
    }
    Err(ScanError::NoGapFound { search_size })
}

fn part1(readings: &[Reading], row: i64) -> u64 {
    let mut intervals = row_coverage(readings, row);
    intervals.sort_unstable_by_key(|iv| iv.lo);
    let Some(merged) = merge_sorted(&intervals) else {
        log::debug!("no sensor reaches row {row}");
        return 0;
    };
    log::debug!("row {row} merged coverage: {merged:?}");
    let covered: u64 = merged.iter().map(Interval::width).sum();
    // Known sensors and beacons on the row are not candidate positions.
    let occupied = readings.iter()
        .flat_map(|r| [r.sensor, r.beacon])
        .filter(|p| p.y == row && merged.iter().any(|iv| iv.contains(p.x)))
        .collect::<HashSet<_>>()
        .len() as u64;
    covered - occupied
}

fn part2(readings: &[Reading], search_size: i64) -> Result<i64, ScanError> {
    let p = find_gap(readings, search_size)?;
    Ok(p.x * TUNING_MULTIPLIER + p.y)
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
    let readings = parse_readings(&input)?;
    println!("Part 1: {}", part1(&readings, args.row));
    println!("Part 2: {}", part2(&readings, args.search_size)?);
    Ok(())
}
