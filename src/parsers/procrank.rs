use regex::Regex;
use tracing::warn;

use crate::items::{ProcrankItem, ProcrankLine};
use crate::parsers::LineParser;

/// Parse a procrank memory cell into kB. Accepts a unit suffix
/// (`b`/`k`/`m`/`g`, case-insensitive); a bare number is already kB.
pub fn parse_mem_kb(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (digits, unit) = match trimmed.char_indices().last() {
        Some((index, ch)) if ch.is_ascii_alphabetic() => {
            (&trimmed[..index], ch.to_ascii_lowercase())
        }
        _ => (trimmed, 'k'),
    };
    let value: u64 = digits.parse().ok()?;
    match unit {
        'b' => Some(value / 1024),
        'k' => Some(value),
        'm' => Some(value * 1024),
        'g' => Some(value * 1024 * 1024),
        _ => None,
    }
}

enum State {
    /// Waiting for the header row.
    Unseen,
    /// Header parsed; every line is a data row until the dash terminator.
    HeaderSeen,
    /// Dash terminator seen; everything after it is ignored.
    Done,
}

/// Parses a procrank table: the first non-blank line is the header row
/// (column names resolved by name, the way the header order can drift
/// across Android versions), each following line is one process row, and
/// a `------ ------ ------` row terminates the table. Rows that do not
/// fit the header are logged and skipped.
pub struct ProcrankParser {
    re_end: Regex,
    state: State,
    column_count: usize,
    pid_index: Option<usize>,
    vss_index: Option<usize>,
    rss_index: Option<usize>,
    pss_index: Option<usize>,
    uss_index: Option<usize>,
    item: ProcrankItem,
}

impl Default for ProcrankParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcrankParser {
    pub fn new() -> Self {
        Self {
            re_end: Regex::new(r"^\s*-{6,}(?:\s+-{6,}){2,}\s*$").expect("table end pattern"),
            state: State::Unseen,
            column_count: 0,
            pid_index: None,
            vss_index: None,
            rss_index: None,
            pss_index: None,
            uss_index: None,
            item: ProcrankItem::default(),
        }
    }

    pub fn parse<'a, I>(lines: I) -> ProcrankItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }

    fn read_header(&mut self, line: &str) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        self.column_count = columns.len();
        self.pid_index = columns.iter().position(|name| *name == "PID");
        self.vss_index = columns.iter().position(|name| *name == "Vss");
        self.rss_index = columns.iter().position(|name| *name == "Rss");
        self.pss_index = columns.iter().position(|name| *name == "Pss");
        self.uss_index = columns.iter().position(|name| *name == "Uss");
        self.state = State::HeaderSeen;
    }

    fn read_row(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < self.column_count {
            warn!(line, "procrank row has too few columns; skipping");
            return;
        }
        // The last column is the command line, which may itself contain
        // spaces; everything past the fixed columns folds into it.
        let mut fields: Vec<String> = tokens[..self.column_count - 1]
            .iter()
            .map(|token| token.to_string())
            .collect();
        fields.push(tokens[self.column_count - 1..].join(" "));

        let pid: u32 = match self.pid_index.and_then(|i| fields[i].parse().ok()) {
            Some(pid) => pid,
            None => {
                warn!(line, "procrank row has no parsable pid; skipping");
                return;
            }
        };
        // A column named in the header whose cell does not parse means the
        // whole row is suspect; drop it rather than record partial numbers.
        let mut bad_cell = false;
        let mut mem = |index: Option<usize>| match index {
            Some(i) => {
                let parsed = parse_mem_kb(&fields[i]);
                if parsed.is_none() {
                    bad_cell = true;
                }
                parsed
            }
            None => None,
        };
        let row = ProcrankLine {
            process_name: fields[self.column_count - 1].clone(),
            vss_kb: mem(self.vss_index),
            rss_kb: mem(self.rss_index),
            pss_kb: mem(self.pss_index),
            uss_kb: mem(self.uss_index),
        };
        if bad_cell {
            warn!(line, "procrank row has unparsable memory cells; skipping");
            return;
        }
        self.item.processes.insert(pid, row);
    }
}

impl LineParser for ProcrankParser {
    type Output = ProcrankItem;

    fn feed(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match self.state {
            State::Unseen => self.read_header(line),
            State::HeaderSeen => {
                if self.re_end.is_match(line) {
                    self.state = State::Done;
                } else {
                    self.read_row(line);
                }
            }
            State::Done => {}
        }
    }

    fn commit(self) -> ProcrankItem {
        self.item
    }
}
