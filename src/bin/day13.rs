use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::slice;

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
enum PacketError {
    #[error("unexpected {found:?} at byte {pos}")]
    UnexpectedByte { pos: usize, found: char },
    #[error("packet ended before its closing bracket")]
    UnexpectedEnd,
    #[error("trailing input after packet at byte {pos}")]
    TrailingInput { pos: usize },
    #[error("integer out of range at byte {pos}")]
    BadInteger { pos: usize },
    #[error("group {group} should hold 2 packets, found {lines}")]
    MalformedGroup { group: usize, lines: usize },
}

#[derive(Parser, Debug)]
#[command(about = "Distress signal: order nested packet lists")]
struct Args {
    /// Packet pairs separated by blank lines
    #[arg(default_value = "input.txt")]
    input: PathBuf,

    /// Log intermediate results
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Debug)]
enum Packet {
    Int(u32),
    List(Vec<Packet>),
}

impl Packet {
    fn parse(s: &str) -> Result<Self, PacketError> {
        let mut parser = PacketParser::new(s);
        let packet = parser.list()?;
        match parser.peek() {
            None => Ok(packet),
            Some(_) => Err(PacketError::TrailingInput { pos: parser.pos }),
        }
    }

    fn divider(n: u32) -> Self {
        Packet::List(vec![Packet::List(vec![Packet::Int(n)])])
    }
}

// A lone integer compares as if it were a single-element list.
impl Ord for Packet {
    fn cmp(&self, other: &Self) -> Ordering {
        use Packet::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Int(_), List(b)) => slice::from_ref(self).cmp(b.as_slice()),
            (List(a), Int(_)) => a.as_slice().cmp(slice::from_ref(other)),
        }
    }
}

impl PartialOrd for Packet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Packet {}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Int(n) => write!(f, "{n}"),
            Packet::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

struct PacketParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PacketParser<'a> {
    fn new(s: &'a str) -> Self {
        Self { bytes: s.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, want: u8) -> Result<(), PacketError> {
        match self.peek() {
            Some(b) if b == want => {
                self.pos += 1;
                Ok(())
            },
            Some(b) => Err(PacketError::UnexpectedByte { pos: self.pos, found: b as char }),
            None => Err(PacketError::UnexpectedEnd),
        }
    }

    fn packet(&mut self) -> Result<Packet, PacketError> {
        match self.peek() {
            Some(b'[') => self.list(),
            Some(b) if b.is_ascii_digit() => self.int(),
            Some(b) => Err(PacketError::UnexpectedByte { pos: self.pos, found: b as char }),
            None => Err(PacketError::UnexpectedEnd),
        }
    }

    fn list(&mut self) -> Result<Packet, PacketError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Packet::List(items));
        }
        loop {
            items.push(self.packet()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Packet::List(items));
                },
                Some(b) => return Err(PacketError::UnexpectedByte { pos: self.pos, found: b as char }),
                None => return Err(PacketError::UnexpectedEnd),
            }
        }
    }

    fn int(&mut self) -> Result<Packet, PacketError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Packet::Int)
            .ok_or(PacketError::BadInteger { pos: start })
    }
}

fn read_pairs(input: &str) -> Result<Vec<(Packet, Packet)>, PacketError> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in input.lines().map(str::trim) {
        if !line.is_empty() {
            current.push(line);
        } else if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let mut pairs = Vec::new();
    for (i, lines) in groups.iter().enumerate() {
        let [left, right] = &lines[..] else {
            return Err(PacketError::MalformedGroup { group: i + 1, lines: lines.len() });
        };
        pairs.push((Packet::parse(left)?, Packet::parse(right)?));
    }
    log::debug!("parsed {} packet pairs", pairs.len());
    Ok(pairs)
}

fn part1(pairs: &[(Packet, Packet)]) -> usize {
    pairs.iter()
        .enumerate()
        .filter(|(_, (left, right))| left < right)
        .map(|(i, _)| i + 1)
        .sum()
}

fn part2(pairs: &[(Packet, Packet)]) -> usize {
    let first = Packet::divider(2);
    let second = Packet::divider(6);
    let packets = || pairs.iter().flat_map(|(a, b)| [a, b]);
    // The first divider sorts before the second, so it shifts the second one back by one.
    let first_pos = 1 + packets().filter(|&p| *p < first).count();
    let second_pos = 2 + packets().filter(|&p| *p < second).count();
    log::debug!("dividers {first} at {first_pos}, {second} at {second_pos}");
    first_pos * second_pos
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
    let pairs = read_pairs(&input)?;
    println!("Part 1: {}", part1(&pairs));
    println!("Part 2: {}", part2(&pairs));
    Ok(())
}
