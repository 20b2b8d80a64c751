pub mod anr;
pub mod bugreport;
pub mod dispatch;
pub mod java_crash;
pub mod logcat;
pub mod meminfo;
pub mod monkey;
pub mod native_crash;
pub mod procrank;
pub mod sysprops;
pub mod traces;

pub use anr::AnrParser;
pub use bugreport::BugreportParser;
pub use dispatch::SectionDispatcher;
pub use java_crash::JavaCrashParser;
pub use logcat::LogcatParser;
pub use meminfo::MemInfoParser;
pub use monkey::MonkeyLogParser;
pub use native_crash::NativeCrashParser;
pub use procrank::ProcrankParser;
pub use sysprops::SystemPropsParser;
pub use traces::TracesParser;

use std::io::BufRead;

use crate::error::ParseError;

/// A parser fed one line at a time. `commit` consumes the parser, so an
/// instance covers exactly one input; accumulated state (ring buffers,
/// open records, capture flags) never leaks into a second parse.
///
/// `feed` must tolerate blank and whitespace-only lines: skip them or
/// buffer them, never panic.
pub trait LineParser: Sized {
    type Output;

    fn feed(&mut self, line: &str);

    fn commit(self) -> Self::Output;

    fn feed_all<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for line in lines {
            self.feed(line);
        }
    }
}

/// Feed every line of a buffered reader into a parser. I/O failures are
/// surfaced; they indicate a collaborator problem, not format drift.
pub fn feed_reader<P: LineParser, R: BufRead>(
    parser: &mut P,
    reader: R,
) -> Result<(), ParseError> {
    for line in reader.lines() {
        parser.feed(&line?);
    }
    Ok(())
}
