use std::io::BufRead;

use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::items::{AnrItem, BugreportItem, LogcatEvent};
use crate::parsers::{
    LineParser, LogcatParser, MemInfoParser, ProcrankParser, SectionDispatcher,
    SystemPropsParser, TracesParser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    MemInfo,
    Procrank,
    SystemProps,
    SystemLog,
    AnrTraces,
    /// Recognized as a section header, but nothing consumes the body.
    NoOp,
}

/// Parses a full `dumpstate` bugreport. Sections are located by their
/// `------ NAME ------` headers; each known section is handed to its
/// dedicated parser, everything else is discarded. The dumpstate
/// timestamp from the preamble supplies the year for the system log,
/// and a "VM TRACES AT LAST ANR" section back-fills the thread dump of
/// the matching ANR found in that log.
pub struct BugreportParser {
    dispatcher: SectionDispatcher<Section>,
    re_dumpstate: Regex,
    lines: Vec<String>,
}

impl Default for BugreportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BugreportParser {
    pub fn new() -> Self {
        // The catch-all must come last so named sections win.
        let dispatcher = SectionDispatcher::new()
            .route(r"^------ MEMORY INFO .*$", Section::MemInfo)
            .route(r"^------ PROCRANK .*$", Section::Procrank)
            .route(r"^------ SYSTEM PROPERTIES .*$", Section::SystemProps)
            .route(r"^------ SYSTEM LOG .*$", Section::SystemLog)
            .route(r"^------ VM TRACES AT LAST ANR .*$", Section::AnrTraces)
            .route(r"^------ .* ------$", Section::NoOp);
        Self {
            dispatcher,
            re_dumpstate: Regex::new(
                r"^==\s*dumpstate:\s*(?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})",
            )
            .expect("dumpstate pattern"),
            lines: Vec::new(),
        }
    }

    pub fn parse<'a, I>(lines: I) -> BugreportItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }

    pub fn parse_reader<R: BufRead>(reader: R) -> Result<BugreportItem, ParseError> {
        let mut parser = Self::new();
        super::feed_reader(&mut parser, reader)?;
        Ok(parser.commit())
    }

    fn parse_preamble(&self, lines: &[String]) -> Option<NaiveDateTime> {
        for line in lines {
            if let Some(caps) = self.re_dumpstate.captures(line) {
                match NaiveDateTime::parse_from_str(&caps["timestamp"], "%Y-%m-%d %H:%M:%S") {
                    Ok(time) => return Some(time),
                    Err(_) => {
                        warn!(line = line.as_str(), "unparsable dumpstate timestamp");
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Copy the ANR thread dump from the traces section onto the matching
    /// ANR in the system log. The framework dumps traces for the most
    /// recent ANR, so the log is scanned newest-first; a merge conflict
    /// means the sections disagree and the log entry is left untouched.
    fn backfill_traces(item: &mut BugreportItem, traces_app: &str, stack: Option<String>) {
        let Some(log) = item.system_log.as_mut() else {
            return;
        };
        let patch = AnrItem {
            app: Some(traces_app.to_string()),
            trace: stack,
            ..AnrItem::default()
        };
        for event in log.events.iter_mut().rev() {
            let LogcatEvent::Anr(anr) = event else {
                continue;
            };
            if anr.app.as_deref() != Some(traces_app) {
                continue;
            }
            match anr.merge(&patch) {
                Ok(merged) => *anr = merged,
                Err(error) => {
                    warn!(app = traces_app, %error, "traces section conflicts with logcat ANR");
                }
            }
            return;
        }
        debug!(app = traces_app, "traces section matched no ANR in the system log");
    }
}

impl LineParser for BugreportParser {
    type Output = BugreportItem;

    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn commit(self) -> BugreportItem {
        let blocks = self
            .dispatcher
            .split_blocks(self.lines.iter().map(String::as_str));

        let mut item = BugreportItem::default();
        let mut traces = None;
        for block in &blocks {
            let lines = block.lines.iter().map(String::as_str);
            match block.route {
                None => item.timestamp = self.parse_preamble(&block.lines),
                Some(Section::MemInfo) => {
                    item.mem_info = Some(MemInfoParser::parse(lines));
                }
                Some(Section::Procrank) => {
                    item.procrank = Some(ProcrankParser::parse(lines));
                }
                Some(Section::SystemProps) => {
                    item.system_props = Some(SystemPropsParser::parse(lines));
                }
                Some(Section::SystemLog) => {
                    let mut parser = match item.timestamp {
                        Some(timestamp) => LogcatParser::with_year(timestamp.year()),
                        None => LogcatParser::new(),
                    };
                    parser.feed_all(lines);
                    item.system_log = Some(parser.commit());
                }
                Some(Section::AnrTraces) => {
                    traces = TracesParser::parse(lines);
                }
                Some(Section::NoOp) => {}
            }
        }

        if let Some(traces) = traces {
            if let Some(app) = traces.app.as_deref() {
                Self::backfill_traces(&mut item, app, traces.stack.clone());
            }
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const REPORT: &str = "\
========================================================
== dumpstate: 2012-04-25 20:45:10
========================================================

------ MEMORY INFO (/proc/meminfo) ------
MemTotal:         353332 kB
MemFree:           65420 kB

------ PROCRANK (procrank) ------
  PID      Vss      Rss      Pss      Uss  cmdline
 1313  78128K  77996K  48603K  45812K  system_server
                          ------   ------  ------
          0K       0K   49973K  144601K  TOTAL

------ SYSTEM PROPERTIES ------
[ro.build.version.release]: [4.0.4]
[ro.product.model]: [Galaxy Nexus]

------ SYSTEM LOG (logcat -v threadtime -d *:v) ------
04-25 17:17:08.445   312   366 E ActivityManager: ANR in com.android.email
04-25 17:17:08.445   312   366 E ActivityManager: Reason: keyDispatchingTimedOut
04-25 17:17:08.445   312   366 E ActivityManager: Load: 0.71 / 0.83 / 0.51

------ VM TRACES AT LAST ANR (/data/anr/traces.txt: 2012-04-25 17:17:08) ------

----- pid 2887 at 2012-04-25 17:17:08 -----
Cmd line: com.android.email

DALVIK THREADS:
\"main\" prio=5 tid=1 SUSPENDED
  at android.os.MessageQueue.nativePollOnce(Native Method)

------ ZYGOTE LOG ------
some unparsed content
";

    #[test]
    fn parses_the_dumpstate_timestamp() {
        let item = BugreportParser::parse(REPORT.lines());
        assert_eq!(
            item.timestamp,
            NaiveDate::from_ymd_opt(2012, 4, 25).and_then(|d| d.and_hms_opt(20, 45, 10))
        );
    }

    #[test]
    fn routes_each_section_to_its_parser() {
        let item = BugreportParser::parse(REPORT.lines());
        let mem_info = item.mem_info.expect("mem info");
        assert_eq!(mem_info.rows.get("MemTotal"), Some(&353332));
        let procrank = item.procrank.expect("procrank");
        assert_eq!(procrank.processes.len(), 1);
        let props = item.system_props.expect("system props");
        assert_eq!(
            props.props.get("ro.build.version.release").map(String::as_str),
            Some("4.0.4")
        );
    }

    #[test]
    fn system_log_uses_the_dumpstate_year() {
        let item = BugreportParser::parse(REPORT.lines());
        let log = item.system_log.expect("system log");
        assert!(!log.year_inferred);
        let anr = log.anrs().next().expect("anr");
        assert_eq!(
            anr.event_time,
            NaiveDate::from_ymd_opt(2012, 4, 25)
                .and_then(|d| d.and_hms_milli_opt(17, 17, 8, 445))
        );
    }

    #[test]
    fn traces_backfill_the_matching_anr() {
        let item = BugreportParser::parse(REPORT.lines());
        let log = item.system_log.expect("system log");
        let anr = log.anrs().next().expect("anr");
        assert_eq!(anr.app.as_deref(), Some("com.android.email"));
        let trace = anr.trace.as_deref().expect("trace");
        assert!(trace.starts_with("\"main\" prio=5"));
        assert!(trace.contains("nativePollOnce"));
    }

    #[test]
    fn traces_for_an_unrelated_app_leave_the_log_alone() {
        let report = REPORT.replace("Cmd line: com.android.email", "Cmd line: com.other.app");
        let item = BugreportParser::parse(report.lines());
        let log = item.system_log.expect("system log");
        let anr = log.anrs().next().expect("anr");
        assert!(anr.trace.is_none());
    }

    #[test]
    fn traces_pick_the_most_recent_matching_anr() {
        let report = REPORT.replace(
            "04-25 17:17:08.445   312   366 E ActivityManager: ANR in com.android.email\n",
            "04-25 16:00:00.000   312   366 E ActivityManager: ANR in com.android.email\n\
             04-25 16:00:00.000   312   366 E ActivityManager: Reason: earlier timeout\n\
             04-25 17:17:08.445   312   366 E ActivityManager: ANR in com.android.email\n",
        );
        let item = BugreportParser::parse(report.lines());
        let log = item.system_log.expect("system log");
        let anrs: Vec<_> = log.anrs().collect();
        assert_eq!(anrs.len(), 2);
        assert!(anrs[0].trace.is_none());
        assert!(anrs[1].trace.is_some());
    }

    #[test]
    fn missing_sections_stay_absent() {
        let item = BugreportParser::parse(
            [
                "== dumpstate: 2012-04-25 20:45:10",
                "------ ZYGOTE LOG ------",
                "noise",
            ]
            .into_iter(),
        );
        assert!(item.mem_info.is_none());
        assert!(item.procrank.is_none());
        assert!(item.system_props.is_none());
        assert!(item.system_log.is_none());
    }

    #[test]
    fn empty_input_yields_an_empty_item() {
        let item = BugreportParser::parse([]);
        assert_eq!(item, BugreportItem::default());
    }
}
