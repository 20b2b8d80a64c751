pub mod bugreport;
pub mod list;
pub mod logcat;
pub mod monkey;

pub use bugreport::{BugreportItem, MemInfoItem, ProcrankItem, ProcrankLine, SystemPropsItem, TracesItem};
pub use list::{Item, ItemList};
pub use logcat::{AnrItem, JavaCrashItem, LogcatEvent, LogcatItem, NativeCrashItem};
pub use monkey::MonkeyLogItem;
