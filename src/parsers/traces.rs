use regex::Regex;

use crate::items::TracesItem;
use crate::parsers::LineParser;

enum State {
    /// Looking for the first process's `Cmd line:`.
    Scanning,
    /// Inside the first process, waiting for its main thread header.
    InProcess,
    /// Accumulating the main thread stack until a blank line.
    InStack,
    /// First stack captured; the rest of the section is ignored.
    Done,
}

/// Parses a "VM TRACES AT LAST ANR" section. Only the first process in
/// the section matters: it is the one the framework dumped for the ANR.
/// Output is its command line and the stack of its main thread.
pub struct TracesParser {
    re_pid: Regex,
    re_cmd_line: Regex,
    re_main_thread: Regex,
    state: State,
    stack_lines: Vec<String>,
    item: TracesItem,
}

impl Default for TracesParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TracesParser {
    pub fn new() -> Self {
        Self {
            re_pid: Regex::new(r"^----- pid (?P<pid>\d+) at .* -----$").expect("pid header pattern"),
            re_cmd_line: Regex::new(r"^Cmd ?line: (?P<app>\S+)").expect("cmd line pattern"),
            re_main_thread: Regex::new(r#"^"main" "#).expect("main thread pattern"),
            state: State::Scanning,
            stack_lines: Vec::new(),
            item: TracesItem::default(),
        }
    }

    pub fn parse<'a, I>(lines: I) -> Option<TracesItem>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }
}

impl LineParser for TracesParser {
    type Output = Option<TracesItem>;

    fn feed(&mut self, line: &str) {
        let trimmed = line.trim_end();
        match self.state {
            State::Scanning => {
                if let Some(caps) = self.re_cmd_line.captures(trimmed) {
                    self.item.app = Some(caps["app"].to_string());
                    self.state = State::InProcess;
                }
            }
            State::InProcess => {
                if self.re_main_thread.is_match(trimmed) {
                    self.stack_lines.push(trimmed.to_string());
                    self.state = State::InStack;
                } else if self.re_pid.is_match(trimmed) {
                    // Next process began without a main thread dump.
                    self.state = State::Done;
                }
            }
            State::InStack => {
                if trimmed.trim().is_empty() {
                    self.state = State::Done;
                } else {
                    self.stack_lines.push(trimmed.to_string());
                }
            }
            State::Done => {}
        }
    }

    fn commit(mut self) -> Option<TracesItem> {
        if self.item.app.is_none() && self.stack_lines.is_empty() {
            return None;
        }
        if !self.stack_lines.is_empty() {
            self.item.stack = Some(self.stack_lines.join("\n"));
        }
        Some(self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_first_process_main_thread_only() {
        let lines = [
            "----- pid 2887 at 2012-04-25 17:17:08 -----",
            "Cmd line: com.android.email",
            "",
            "DALVIK THREADS:",
            "\"main\" prio=5 tid=1 SUSPENDED",
            "  | group=\"main\" sCount=1 dsCount=0 obj=0x00001234",
            "  at android.os.MessageQueue.nativePollOnce(Native Method)",
            "",
            "\"Binder Thread #2\" prio=5 tid=8 NATIVE",
            "  at dalvik.system.NativeStart.run(Native Method)",
            "",
            "----- pid 313 at 2012-04-25 17:17:09 -----",
            "Cmd line: system_server",
        ];
        let item = TracesParser::parse(lines).expect("traces");
        assert_eq!(item.app.as_deref(), Some("com.android.email"));
        let stack = item.stack.expect("stack");
        assert!(stack.starts_with("\"main\" prio=5"));
        assert!(stack.contains("nativePollOnce"));
        assert!(!stack.contains("Binder Thread"));
        assert!(!stack.contains("system_server"));
    }

    #[test]
    fn returns_none_for_empty_section() {
        assert!(TracesParser::parse(["", "  "]).is_none());
    }
}
