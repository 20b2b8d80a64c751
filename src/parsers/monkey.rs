use chrono::NaiveDateTime;
use regex::Regex;
use tracing::warn;

use crate::items::{LogcatEvent, MonkeyLogItem};
use crate::parsers::{AnrParser, JavaCrashParser, LineParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrashKind {
    Anr,
    JavaCrash,
}

/// Crash block being accumulated after a `NOT RESPONDING` or `CRASH`
/// anchor, together with the app and pid the anchor named.
struct Capture {
    kind: CrashKind,
    app: String,
    pid: Option<u32>,
    lines: Vec<String>,
}

/// Parses the console output of a `monkey` stress run: the seed/count
/// line, the option echoes, the start/stop banners with device uptime,
/// injection progress, the dropped-event tallies, and at most one crash
/// (ANR or Java crash) that ended the run.
pub struct MonkeyLogParser {
    re_seed: Regex,
    re_throttle: Regex,
    re_security: Regex,
    re_package: Regex,
    re_category: Regex,
    re_start: Regex,
    re_stop: Regex,
    re_sending: Regex,
    re_finished: Regex,
    re_injected: Regex,
    re_dropped: Regex,
    re_not_responding: Regex,
    re_crash: Regex,
    re_no_activities: Regex,
    re_aborted: Regex,
    capture: Option<Capture>,
    item: MonkeyLogItem,
}

impl Default for MonkeyLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MonkeyLogParser {
    pub fn new() -> Self {
        Self {
            re_seed: Regex::new(r":Monkey: seed=(?P<seed>-?\d+) count=(?P<count>\d+)")
                .expect("seed pattern"),
            re_throttle: Regex::new(r"--throttle (?P<throttle>\d+)").expect("throttle pattern"),
            re_security: Regex::new(r"--ignore-security-exceptions")
                .expect("security option pattern"),
            re_package: Regex::new(r"^:AllowPackage: (?P<package>\S+)").expect("package pattern"),
            re_category: Regex::new(r"^:IncludeCategory: (?P<category>\S+)")
                .expect("category pattern"),
            re_start: Regex::new(
                r"^# (?P<date>.+) - device uptime = (?P<uptime>\d+\.\d+): Monkey command used for this test:",
            )
            .expect("start banner pattern"),
            re_stop: Regex::new(
                r"^# (?P<date>.+) - device uptime = (?P<uptime>\d+\.\d+): Monkey command ran for: (?P<min>\d+):(?P<sec>\d+) \(mm:ss\)",
            )
            .expect("stop banner pattern"),
            re_sending: Regex::new(r"^\s*// Sending event #(?P<count>\d+)")
                .expect("sending pattern"),
            re_finished: Regex::new(r"// Monkey finished").expect("finished pattern"),
            re_injected: Regex::new(r"^Events injected: (?P<count>\d+)")
                .expect("injected pattern"),
            re_dropped: Regex::new(
                r"^:Dropped: keys=(?P<keys>\d+) pointers=(?P<pointers>\d+) trackballs=(?P<trackballs>\d+) flips=(?P<flips>\d+)(?: rotations=(?P<rotations>\d+))?",
            )
            .expect("dropped pattern"),
            re_not_responding: Regex::new(r"// NOT RESPONDING: (?P<app>\S+) \(pid (?P<pid>\d+)\)")
                .expect("not responding pattern"),
            re_crash: Regex::new(r"// CRASH: (?P<app>\S+) \(pid (?P<pid>\d+)\)")
                .expect("crash pattern"),
            re_no_activities: Regex::new(r"\*\* No activities found to run, monkey aborted")
                .expect("no activities pattern"),
            re_aborted: Regex::new(r"^\*\* Monkey aborted").expect("aborted pattern"),
            capture: None,
            item: MonkeyLogItem::default(),
        }
    }

    pub fn parse<'a, I>(lines: I) -> MonkeyLogItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }

    /// Monkey banners carry the date in one of two shapes depending on
    /// the host: `Wednesday, 04/25/2012 01:37:12 AM` or the `date`
    /// output `Tue Apr 24 17:35:28 PDT 2012`.
    fn parse_wall_time(raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim();
        if let Ok(time) = NaiveDateTime::parse_from_str(trimmed, "%A, %m/%d/%Y %I:%M:%S %p") {
            return Some(time);
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() == 6 {
            // Drop the timezone token; NaiveDateTime has no use for it.
            let without_tz = format!(
                "{} {} {} {} {}",
                tokens[0], tokens[1], tokens[2], tokens[3], tokens[5]
            );
            if let Ok(time) = NaiveDateTime::parse_from_str(&without_tz, "%a %b %e %H:%M:%S %Y") {
                return Some(time);
            }
        }
        warn!(raw = trimmed, "unrecognized monkey banner timestamp");
        None
    }

    /// True for the anchors that always end a crash capture.
    fn ends_capture(&self, line: &str) -> bool {
        self.re_aborted.is_match(line)
            || self.re_injected.is_match(line)
            || self.re_dropped.is_match(line)
            || self.re_stop.is_match(line)
    }

    fn finalize_capture(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        if self.item.crash.is_some() {
            return;
        }
        // The monkey prefixes Java stacks with `// `; ANR dumps come
        // through raw. Strip the prefix so the block parsers see the
        // lines as logcat would have shown them.
        let lines: Vec<&str> = capture
            .lines
            .iter()
            .map(|line| line.strip_prefix("// ").unwrap_or(line))
            .collect();
        let event = match capture.kind {
            CrashKind::Anr => AnrParser::parse(lines.iter().copied()).map(|mut item| {
                if item.app.is_none() {
                    item.app = Some(capture.app.clone());
                }
                if item.pid.is_none() {
                    item.pid = capture.pid;
                }
                LogcatEvent::Anr(item)
            }),
            CrashKind::JavaCrash => JavaCrashParser::parse(lines.iter().copied()).map(|mut item| {
                if item.app.is_none() {
                    item.app = Some(capture.app.clone());
                }
                if item.pid.is_none() {
                    item.pid = capture.pid;
                }
                LogcatEvent::JavaCrash(item)
            }),
        };
        match event {
            Some(event) => self.item.crash = Some(event),
            None => warn!(
                app = capture.app,
                "monkey crash block did not parse as an event; dropping"
            ),
        }
    }
}

impl LineParser for MonkeyLogParser {
    type Output = MonkeyLogItem;

    fn feed(&mut self, line: &str) {
        if self.capture.is_some() {
            // A blank line or one of the run-summary anchors closes the
            // crash block.
            if line.trim().is_empty() {
                self.finalize_capture();
                return;
            }
            if !self.ends_capture(line) {
                if let Some(capture) = self.capture.as_mut() {
                    capture.lines.push(line.to_string());
                }
                return;
            }
            self.finalize_capture();
        }

        if let Some(caps) = self.re_seed.captures(line) {
            self.item.seed = caps["seed"].parse().ok();
            self.item.target_count = caps["count"].parse().ok();
        }
        if let Some(caps) = self.re_throttle.captures(line) {
            self.item.throttle = caps["throttle"].parse().ok();
        }
        if self.re_security.is_match(line) {
            self.item.ignore_security_exceptions = true;
        }
        if let Some(caps) = self.re_package.captures(line) {
            self.item.packages.push(caps["package"].to_string());
        }
        if let Some(caps) = self.re_category.captures(line) {
            self.item.categories.push(caps["category"].to_string());
        }

        if let Some(caps) = self.re_stop.captures(line) {
            self.item.stop_time = Self::parse_wall_time(&caps["date"]);
            self.item.stop_uptime_secs = caps["uptime"].parse().ok();
            let minutes: u64 = caps["min"].parse().unwrap_or(0);
            let seconds: u64 = caps["sec"].parse().unwrap_or(0);
            self.item.total_duration_secs = Some(minutes * 60 + seconds);
        } else if let Some(caps) = self.re_start.captures(line) {
            self.item.start_time = Self::parse_wall_time(&caps["date"]);
            self.item.start_uptime_secs = caps["uptime"].parse().ok();
        }

        if let Some(caps) = self.re_sending.captures(line) {
            if let Ok(count) = caps["count"].parse::<u64>() {
                let best = self.item.intermediate_count.unwrap_or(0).max(count);
                self.item.intermediate_count = Some(best);
            }
        }
        if self.re_finished.is_match(line) {
            self.item.is_finished = true;
        }
        if let Some(caps) = self.re_injected.captures(line) {
            self.item.final_count = caps["count"].parse().ok();
        }
        if let Some(caps) = self.re_dropped.captures(line) {
            self.item.dropped_keys = caps["keys"].parse().ok();
            self.item.dropped_pointers = caps["pointers"].parse().ok();
            self.item.dropped_trackballs = caps["trackballs"].parse().ok();
            self.item.dropped_flips = caps["flips"].parse().ok();
            self.item.dropped_rotations = caps.name("rotations").and_then(|m| m.as_str().parse().ok());
        }
        if self.re_no_activities.is_match(line) {
            self.item.no_activities = true;
        }

        if let Some(caps) = self.re_not_responding.captures(line) {
            self.capture = Some(Capture {
                kind: CrashKind::Anr,
                app: caps["app"].to_string(),
                pid: caps["pid"].parse().ok(),
                lines: Vec::new(),
            });
        } else if let Some(caps) = self.re_crash.captures(line) {
            self.capture = Some(Capture {
                kind: CrashKind::JavaCrash,
                app: caps["app"].to_string(),
                pid: caps["pid"].parse().ok(),
                lines: Vec::new(),
            });
        }
    }

    fn commit(mut self) -> MonkeyLogItem {
        self.finalize_capture();
        self.item
    }
}
