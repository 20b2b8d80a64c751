use regex::Regex;

use crate::items::NativeCrashItem;
use crate::parsers::LineParser;

/// Parses one debuggerd native crash dump. The 15-group asterisk
/// separator marks the start, so narration before it (say, the tail of a
/// previous crash) is excluded; everything from the separator to the end
/// of the block, trimmed, becomes the stack text.
pub struct NativeCrashParser {
    re_separator: Regex,
    re_fingerprint: Regex,
    re_pid: Regex,
    stack_lines: Vec<String>,
    item: NativeCrashItem,
    started: bool,
}

impl Default for NativeCrashParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeCrashParser {
    pub fn new() -> Self {
        Self {
            re_separator: Regex::new(r"^(?:\*{3} ){14}\*{3}").expect("separator pattern"),
            re_fingerprint: Regex::new(r"^Build fingerprint: '(?P<fingerprint>[^']*)'")
                .expect("fingerprint pattern"),
            re_pid: Regex::new(r"^pid: (?P<pid>\d+), tid: (?P<tid>\d+).*>>> (?P<app>\S+) <<<")
                .expect("pid pattern"),
            stack_lines: Vec::new(),
            item: NativeCrashItem::default(),
            started: false,
        }
    }

    pub fn parse<'a, I>(lines: I) -> Option<NativeCrashItem>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }
}

impl LineParser for NativeCrashParser {
    type Output = Option<NativeCrashItem>;

    fn feed(&mut self, line: &str) {
        let trimmed = line.trim_end();
        if !self.started {
            if self.re_separator.is_match(trimmed.trim_start()) {
                self.started = true;
                self.stack_lines.push(trimmed.to_string());
            }
            return;
        }

        self.stack_lines.push(trimmed.to_string());
        if let Some(caps) = self.re_fingerprint.captures(trimmed) {
            self.item.fingerprint = Some(caps["fingerprint"].to_string());
        }
        if let Some(caps) = self.re_pid.captures(trimmed) {
            self.item.pid = caps["pid"].parse().ok();
            self.item.tid = caps["tid"].parse().ok();
            self.item.app = Some(caps["app"].to_string());
        }
    }

    fn commit(mut self) -> Option<NativeCrashItem> {
        if !self.started {
            return None;
        }
        self.item.stack = Some(self.stack_lines.join("\n").trim().to_string());
        Some(self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEPARATOR: &str =
        "*** *** *** *** *** *** *** *** *** *** *** *** *** *** *** ***";

    #[test]
    fn parses_fingerprint_pid_and_app() {
        let lines = [
            SEPARATOR,
            "Build fingerprint: 'google/soju/crespo:4.0.4/IMM76D/299849:userdebug/test-keys'",
            "pid: 4188, tid: 4192  >>> com.android.browser <<<",
            "signal 11 (SIGSEGV), code 1 (SEGV_MAPERR), fault addr 00000000",
            " #00  pc 000080e2  /system/lib/libandroid_runtime.so",
        ];
        let item = NativeCrashParser::parse(lines).expect("crash");
        assert_eq!(
            item.fingerprint.as_deref(),
            Some("google/soju/crespo:4.0.4/IMM76D/299849:userdebug/test-keys")
        );
        assert_eq!(item.pid, Some(4188));
        assert_eq!(item.tid, Some(4192));
        assert_eq!(item.app.as_deref(), Some("com.android.browser"));
        let stack = item.stack.expect("stack");
        assert!(stack.starts_with("*** ***"));
        assert!(stack.ends_with("libandroid_runtime.so"));
    }

    #[test]
    fn excludes_narration_before_the_separator() {
        let lines = [
            "leftover line from a previous crash",
            SEPARATOR,
            "pid: 1, tid: 1  >>> /init <<<",
        ];
        let item = NativeCrashParser::parse(lines).expect("crash");
        assert!(!item.stack.expect("stack").contains("leftover"));
    }

    #[test]
    fn returns_none_without_a_separator() {
        assert!(NativeCrashParser::parse(["pid: 1, tid: 1  >>> app <<<"]).is_none());
    }
}
