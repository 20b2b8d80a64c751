use regex::Regex;

use crate::items::AnrItem;
use crate::parsers::LineParser;

/// Extracts the fields of one pre-isolated ANR block: the failing
/// package/activity, the framework's reason string, load averages and the
/// CPU breakdown. Any subset may be present; absent fields stay unset.
///
/// The caller stamps event time, pid/tid and preambles afterwards since
/// those come from context outside the block.
pub struct AnrParser {
    re_start: Regex,
    re_reason: Regex,
    re_load: Regex,
    re_total_cpu: Regex,
    re_user: Regex,
    re_kernel: Regex,
    re_iowait: Regex,
    re_irq: Regex,
    re_softirq: Regex,
    lines: Vec<String>,
    item: AnrItem,
    matched: bool,
}

impl Default for AnrParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AnrParser {
    pub fn new() -> Self {
        Self {
            re_start: Regex::new(r"^ANR (?:in|at) (?P<app>[^\s(]+)(?:\s+\((?P<activity>[^)]+)\))?")
                .expect("anr start pattern"),
            re_reason: Regex::new(r"^Reason: (?P<reason>.*)$").expect("anr reason pattern"),
            re_load: Regex::new(
                r"^Load: (?P<l1>\d+(?:\.\d+)?) / (?P<l5>\d+(?:\.\d+)?) / (?P<l15>\d+(?:\.\d+)?)",
            )
            .expect("anr load pattern"),
            re_total_cpu: Regex::new(r"^(?P<total>\d+(?:\.\d+)?)% TOTAL:").expect("total cpu pattern"),
            re_user: Regex::new(r"(?P<pct>\d+(?:\.\d+)?)% user").expect("user cpu pattern"),
            re_kernel: Regex::new(r"(?P<pct>\d+(?:\.\d+)?)% kernel").expect("kernel cpu pattern"),
            re_iowait: Regex::new(r"(?P<pct>\d+(?:\.\d+)?)% iowait").expect("iowait cpu pattern"),
            re_irq: Regex::new(r"(?P<pct>\d+(?:\.\d+)?)% irq").expect("irq cpu pattern"),
            re_softirq: Regex::new(r"(?P<pct>\d+(?:\.\d+)?)% softirq").expect("softirq cpu pattern"),
            lines: Vec::new(),
            item: AnrItem::default(),
            matched: false,
        }
    }

    pub fn parse<'a, I>(lines: I) -> Option<AnrItem>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }

    fn percent(regex: &Regex, text: &str) -> Option<f64> {
        regex
            .captures(text)
            .and_then(|caps| caps.name("pct"))
            .and_then(|value| value.as_str().parse::<f64>().ok())
    }
}

impl LineParser for AnrParser {
    type Output = Option<AnrItem>;

    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        if let Some(caps) = self.re_start.captures(trimmed) {
            self.matched = true;
            if self.item.app.is_none() {
                self.item.app = Some(caps["app"].to_string());
            }
            if self.item.activity.is_none() {
                self.item.activity = caps.name("activity").map(|m| m.as_str().to_string());
            }
        }
        if let Some(caps) = self.re_reason.captures(trimmed) {
            self.matched = true;
            self.item.reason = Some(caps["reason"].to_string());
        }
        if let Some(caps) = self.re_load.captures(trimmed) {
            self.matched = true;
            self.item.load_1 = caps["l1"].parse().ok();
            self.item.load_5 = caps["l5"].parse().ok();
            self.item.load_15 = caps["l15"].parse().ok();
        }
        if let Some(caps) = self.re_total_cpu.captures(trimmed) {
            self.matched = true;
            self.item.total_cpu = caps["total"].parse().ok();
            self.item.user_cpu = Self::percent(&self.re_user, trimmed);
            self.item.kernel_cpu = Self::percent(&self.re_kernel, trimmed);
            self.item.iowait_cpu = Self::percent(&self.re_iowait, trimmed);
            self.item.irq_cpu = Self::percent(&self.re_irq, trimmed);
            self.item.softirq_cpu = Self::percent(&self.re_softirq, trimmed);
        }
    }

    fn commit(mut self) -> Option<AnrItem> {
        if !self.matched {
            return None;
        }
        self.item.stack = Some(self.lines.join("\n").trim_end().to_string());
        Some(self.item)
    }
}
