use std::collections::{HashMap, VecDeque};
use std::io::BufRead;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::items::{LogcatEvent, LogcatItem};
use crate::parsers::{AnrParser, JavaCrashParser, LineParser, NativeCrashParser};

/// Bound on the rolling buffer of raw lines kept for preamble capture.
const MAX_BUFFER_LINES: usize = 500;
/// How many buffered lines go into each preamble.
const PREAMBLE_LINES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Anr,
    JavaCrash,
    NativeCrash,
}

/// Lines accumulated for one in-flight event, keyed by
/// (level, tag, pid, tid) while open.
struct OpenRecord {
    kind: RecordKind,
    event_time: Option<NaiveDateTime>,
    pid: u32,
    tid: Option<u32>,
    app: Option<String>,
    lines: Vec<String>,
    last_preamble: String,
    process_preamble: String,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
struct RecordKey {
    level: char,
    tag: String,
    pid: u32,
    tid: Option<u32>,
}

struct ParsedLine {
    time: Option<NaiveDateTime>,
    pid: u32,
    tid: Option<u32>,
    level: char,
    tag: String,
    msg: String,
}

/// Scans a full logcat capture (threadtime or time format, auto-detected
/// per line), groups `ActivityManager`/`AndroidRuntime`/`DEBUG` output
/// into ANR, Java crash and native crash events, and stamps each event
/// with its time, pid/tid, owning app and two preambles of surrounding
/// log lines.
///
/// Single use: `commit` consumes the parser together with its ring
/// buffer and open-record map.
pub struct LogcatParser {
    re_threadtime: Regex,
    re_time: Regex,
    re_anr_start: Regex,
    year: i32,
    year_inferred: bool,
    ring: VecDeque<(Option<u32>, String)>,
    records: Vec<OpenRecord>,
    open: HashMap<RecordKey, usize>,
    start_time: Option<NaiveDateTime>,
    stop_time: Option<NaiveDateTime>,
}

impl Default for LogcatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogcatParser {
    /// Logcat timestamps carry no year, so the current local year is
    /// assumed and the result is flagged `year_inferred`. Use
    /// [`LogcatParser::with_year`] when the capture year is known.
    pub fn new() -> Self {
        Self::build(Local::now().year(), true)
    }

    pub fn with_year(year: i32) -> Self {
        Self::build(year, false)
    }

    fn build(year: i32, year_inferred: bool) -> Self {
        Self {
            re_threadtime: Regex::new(
                r"^(?P<month>\d{2})-(?P<day>\d{2})\s+(?P<hour>\d{2}):(?P<min>\d{2}):(?P<sec>\d{2})\.(?P<ms>\d{3})\s+(?P<pid>\d+)\s+(?P<tid>\d+)\s+(?P<level>[VDIWEF])\s+(?P<tag>.+?)\s*: (?P<msg>.*)$",
            )
            .expect("threadtime pattern"),
            re_time: Regex::new(
                r"^(?P<month>\d{2})-(?P<day>\d{2})\s+(?P<hour>\d{2}):(?P<min>\d{2}):(?P<sec>\d{2})\.(?P<ms>\d{3})\s+(?P<level>[VDIWEF])/(?P<tag>.+?)\s*\(\s*(?P<pid>\d+)\): (?P<msg>.*)$",
            )
            .expect("time pattern"),
            re_anr_start: Regex::new(r"^ANR (?:in|at) (?P<app>[^\s(]+)").expect("anr start pattern"),
            year,
            year_inferred,
            ring: VecDeque::new(),
            records: Vec::new(),
            open: HashMap::new(),
            start_time: None,
            stop_time: None,
        }
    }

    pub fn parse<'a, I>(lines: I) -> LogcatItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }

    pub fn parse_reader<R: BufRead>(reader: R) -> Result<LogcatItem, ParseError> {
        let mut parser = Self::new();
        super::feed_reader(&mut parser, reader)?;
        Ok(parser.commit())
    }

    fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        if let Some(caps) = self.re_threadtime.captures(line) {
            return Some(ParsedLine {
                time: self.timestamp(&caps["month"], &caps["day"], &caps["hour"], &caps["min"], &caps["sec"], &caps["ms"]),
                pid: caps["pid"].parse().ok()?,
                tid: caps["tid"].parse().ok(),
                level: caps["level"].chars().next()?,
                tag: caps["tag"].to_string(),
                msg: caps["msg"].to_string(),
            });
        }
        if let Some(caps) = self.re_time.captures(line) {
            return Some(ParsedLine {
                time: self.timestamp(&caps["month"], &caps["day"], &caps["hour"], &caps["min"], &caps["sec"], &caps["ms"]),
                pid: caps["pid"].parse().ok()?,
                tid: None,
                level: caps["level"].chars().next()?,
                tag: caps["tag"].to_string(),
                msg: caps["msg"].to_string(),
            });
        }
        None
    }

    fn timestamp(
        &self,
        month: &str,
        day: &str,
        hour: &str,
        min: &str,
        sec: &str,
        ms: &str,
    ) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, month.parse().ok()?, day.parse().ok()?)?;
        date.and_hms_milli_opt(
            hour.parse().ok()?,
            min.parse().ok()?,
            sec.parse().ok()?,
            ms.parse().ok()?,
        )
    }

    fn push_ring(&mut self, entry: (Option<u32>, String)) {
        self.ring.push_back(entry);
        if self.ring.len() > MAX_BUFFER_LINES {
            self.ring.pop_front();
        }
    }

    fn snapshot_preamble(&self, pid: Option<u32>) -> String {
        let lines: Vec<&str> = self
            .ring
            .iter()
            .filter(|(line_pid, _)| pid.is_none() || *line_pid == pid)
            .map(|(_, line)| line.as_str())
            .collect();
        let start = lines.len().saturating_sub(PREAMBLE_LINES);
        lines[start..].join("\n")
    }

    fn open_record(&mut self, key: RecordKey, kind: RecordKind, parsed: &ParsedLine, app: Option<String>) {
        let record = OpenRecord {
            kind,
            event_time: parsed.time,
            pid: parsed.pid,
            tid: parsed.tid,
            app,
            lines: Vec::new(),
            last_preamble: self.snapshot_preamble(None),
            process_preamble: self.snapshot_preamble(Some(parsed.pid)),
        };
        self.records.push(record);
        self.open.insert(key, self.records.len() - 1);
    }

    fn finish(self) -> LogcatItem {
        let mut events = Vec::new();
        for record in self.records {
            let lines = record.lines.iter().map(String::as_str);
            let event = match record.kind {
                RecordKind::Anr => AnrParser::parse(lines).map(|mut item| {
                    item.event_time = record.event_time;
                    item.pid = Some(record.pid);
                    item.tid = record.tid;
                    if item.app.is_none() {
                        item.app = record.app.clone();
                    }
                    item.last_preamble = Some(record.last_preamble.clone());
                    item.process_preamble = Some(record.process_preamble.clone());
                    LogcatEvent::Anr(item)
                }),
                RecordKind::JavaCrash => JavaCrashParser::parse(lines).map(|mut item| {
                    item.event_time = record.event_time;
                    item.pid = Some(record.pid);
                    item.tid = record.tid;
                    item.last_preamble = Some(record.last_preamble.clone());
                    item.process_preamble = Some(record.process_preamble.clone());
                    LogcatEvent::JavaCrash(item)
                }),
                RecordKind::NativeCrash => NativeCrashParser::parse(lines).map(|mut item| {
                    item.event_time = record.event_time;
                    item.pid = Some(record.pid);
                    item.tid = record.tid;
                    item.last_preamble = Some(record.last_preamble.clone());
                    item.process_preamble = Some(record.process_preamble.clone());
                    LogcatEvent::NativeCrash(item)
                }),
            };
            match event {
                Some(event) => events.push(event),
                None => warn!(
                    pid = record.pid,
                    "accumulated logcat record did not parse as an event; dropping"
                ),
            }
        }

        LogcatItem {
            start_time: self.start_time,
            stop_time: self.stop_time,
            year_inferred: self.year_inferred,
            events,
        }
    }
}

impl LineParser for LogcatParser {
    type Output = LogcatItem;

    fn feed(&mut self, line: &str) {
        let parsed = self.parse_line(line);
        // The line joins the ring only after event handling, so a record's
        // preambles hold strictly the lines preceding its first line.
        let ring_entry = (parsed.as_ref().map(|p| p.pid), line.to_string());

        let Some(parsed) = parsed else {
            if !line.trim().is_empty() {
                debug!(line, "logcat line did not match threadtime or time format");
            }
            self.push_ring(ring_entry);
            return;
        };

        if parsed.time.is_some() {
            if self.start_time.is_none() {
                self.start_time = parsed.time;
            }
            self.stop_time = parsed.time;
        }

        let key = RecordKey {
            level: parsed.level,
            tag: parsed.tag.clone(),
            pid: parsed.pid,
            tid: parsed.tid,
        };

        match (parsed.level, parsed.tag.as_str()) {
            ('E', "ActivityManager") => {
                if let Some(caps) = self.re_anr_start.captures(&parsed.msg) {
                    // A fresh ANR header always opens a new record, so
                    // back-to-back ANRs from the same pid stay distinct.
                    let app = Some(caps["app"].to_string());
                    self.open_record(key.clone(), RecordKind::Anr, &parsed, app);
                }
                if let Some(&index) = self.open.get(&key) {
                    self.records[index].lines.push(parsed.msg);
                }
            }
            ('E', "AndroidRuntime") => {
                if !self.open.contains_key(&key) {
                    self.open_record(key.clone(), RecordKind::JavaCrash, &parsed, None);
                }
                if let Some(&index) = self.open.get(&key) {
                    self.records[index].lines.push(parsed.msg);
                }
            }
            ('I', "DEBUG") => {
                if !self.open.contains_key(&key) {
                    self.open_record(key.clone(), RecordKind::NativeCrash, &parsed, None);
                }
                if let Some(&index) = self.open.get(&key) {
                    self.records[index].lines.push(parsed.msg);
                }
            }
            _ => {}
        }

        self.push_ring(ring_entry);
    }

    fn commit(self) -> LogcatItem {
        self.finish()
    }
}
