use regex::Regex;

use crate::items::JavaCrashItem;
use crate::parsers::LineParser;

enum State {
    /// Still looking for the `<exception>[: <message>]` header line.
    Scanning,
    /// Accumulating the primary stack (header plus its `at` lines).
    MainStack,
    /// Inside the cause group at this index.
    CauseStack(usize),
}

/// Parses one pre-isolated Java crash block. The primary stack is the
/// exception/message header line plus its `at` lines, verbatim; each
/// `Caused by:` group becomes one entry of the ordered cause list.
pub struct JavaCrashParser {
    re_exception: Regex,
    re_at: Regex,
    re_cause: Regex,
    re_process: Regex,
    state: State,
    stack_lines: Vec<String>,
    cause_stacks: Vec<Vec<String>>,
    item: JavaCrashItem,
}

impl Default for JavaCrashParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaCrashParser {
    pub fn new() -> Self {
        Self {
            re_exception: Regex::new(
                r"^(?P<exception>(?:[A-Za-z_$][A-Za-z0-9_$]*\.)+[A-Za-z_$][A-Za-z0-9_$]*)(?:: (?P<message>.*))?$",
            )
            .expect("exception header pattern"),
            re_at: Regex::new(r"^\s+(?:at .+|\.\.\. \d+ more)$").expect("stack frame pattern"),
            re_cause: Regex::new(r"^Caused by: ").expect("cause pattern"),
            re_process: Regex::new(r"^Process: (?P<app>\S+), PID: (?P<pid>\d+)$")
                .expect("process pattern"),
            state: State::Scanning,
            stack_lines: Vec::new(),
            cause_stacks: Vec::new(),
            item: JavaCrashItem::default(),
        }
    }

    pub fn parse<'a, I>(lines: I) -> Option<JavaCrashItem>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }
}

impl LineParser for JavaCrashParser {
    type Output = Option<JavaCrashItem>;

    fn feed(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        match self.state {
            State::Scanning => {
                if let Some(caps) = self.re_process.captures(line.trim()) {
                    self.item.app = Some(caps["app"].to_string());
                    self.item.pid = caps["pid"].parse().ok();
                    return;
                }
                if let Some(caps) = self.re_exception.captures(line.trim_end()) {
                    self.item.exception = Some(caps["exception"].to_string());
                    self.item.message = caps.name("message").map(|m| m.as_str().to_string());
                    self.stack_lines.push(line.trim_end().to_string());
                    self.state = State::MainStack;
                }
            }
            State::MainStack => {
                if self.re_cause.is_match(line.trim_start()) {
                    self.cause_stacks.push(vec![line.trim_end().to_string()]);
                    self.state = State::CauseStack(0);
                } else if self.re_at.is_match(line) {
                    self.stack_lines.push(line.trim_end().to_string());
                }
            }
            State::CauseStack(index) => {
                if self.re_cause.is_match(line.trim_start()) {
                    self.cause_stacks.push(vec![line.trim_end().to_string()]);
                    self.state = State::CauseStack(index + 1);
                } else if self.re_at.is_match(line) {
                    self.cause_stacks[index].push(line.trim_end().to_string());
                }
            }
        }
    }

    fn commit(mut self) -> Option<JavaCrashItem> {
        self.item.exception.as_ref()?;
        self.item.stack = Some(self.stack_lines.join("\n"));
        self.item.cause_stacks = self
            .cause_stacks
            .into_iter()
            .map(|lines| lines.join("\n"))
            .collect();
        Some(self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exception_stack_and_causes() {
        let lines = [
            "java.lang.Exception",
            "\tat a.b(C.java:1)",
            "Caused by: java.lang.RuntimeException",
            "\tat d.e(F.java:2)",
        ];
        let item = JavaCrashParser::parse(lines).expect("crash");
        assert_eq!(item.exception.as_deref(), Some("java.lang.Exception"));
        assert!(item.message.is_none());
        let stack = item.stack.expect("stack");
        assert!(stack.contains("java.lang.Exception"));
        assert!(stack.contains("\tat a.b(C.java:1)"));
        assert!(!stack.contains("Caused by"));
        assert_eq!(item.cause_stacks.len(), 1);
        assert!(item.cause_stacks[0].starts_with("Caused by:"));
        assert!(item.cause_stacks[0].contains("\tat d.e(F.java:2)"));
    }

    #[test]
    fn parses_message_after_colon() {
        let item = JavaCrashParser::parse([
            "java.lang.IllegalStateException: snapshot was closed",
            "\tat a.b(C.java:1)",
        ])
        .expect("crash");
        assert_eq!(
            item.exception.as_deref(),
            Some("java.lang.IllegalStateException")
        );
        assert_eq!(item.message.as_deref(), Some("snapshot was closed"));
    }

    #[test]
    fn extracts_process_line_before_the_exception() {
        let item = JavaCrashParser::parse([
            "FATAL EXCEPTION: main",
            "Process: com.example.app, PID: 4321",
            "java.lang.NullPointerException: oops",
            "\tat a.b(C.java:1)",
        ])
        .expect("crash");
        assert_eq!(item.app.as_deref(), Some("com.example.app"));
        assert_eq!(item.pid, Some(4321));
    }

    #[test]
    fn chains_multiple_causes_in_order() {
        let item = JavaCrashParser::parse([
            "java.lang.Exception: outer",
            "\tat a.b(C.java:1)",
            "Caused by: java.lang.RuntimeException: middle",
            "\tat d.e(F.java:2)",
            "\t... 3 more",
            "Caused by: java.io.IOException: inner",
            "\tat g.h(I.java:3)",
        ])
        .expect("crash");
        assert_eq!(item.cause_stacks.len(), 2);
        assert!(item.cause_stacks[0].contains("middle"));
        assert!(item.cause_stacks[0].contains("... 3 more"));
        assert!(item.cause_stacks[1].contains("inner"));
    }

    #[test]
    fn returns_none_without_an_exception_header() {
        assert!(JavaCrashParser::parse(["no crash here", "\tat a.b(C.java:1)"]).is_none());
    }
}
