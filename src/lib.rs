//! Parsers for the diagnostic output Android devices produce when they
//! misbehave: full `dumpstate` bugreports (plain or zipped), logcat
//! captures, and `monkey` stress-run logs. Each parser turns raw text
//! into typed records so tooling can inspect ANRs, crashes, and memory
//! tables without scraping strings.

pub mod error;
pub mod items;
pub mod logging;
pub mod parsers;
pub mod source;

pub use error::ParseError;
pub use items::{
    AnrItem, BugreportItem, Item, ItemList, JavaCrashItem, LogcatEvent, LogcatItem, MemInfoItem,
    MonkeyLogItem, NativeCrashItem, ProcrankItem, SystemPropsItem,
};
pub use parsers::{BugreportParser, LineParser, LogcatParser, MonkeyLogParser};
