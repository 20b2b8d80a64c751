use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{merge_field, merge_list, ParseError};

/// One "Application Not Responding" event, either isolated from a logcat
/// stream or from a monkey log. Any field may be absent; the logs rarely
/// carry all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnrItem {
    pub app: Option<String>,
    pub activity: Option<String>,
    pub reason: Option<String>,
    pub total_cpu: Option<f64>,
    pub user_cpu: Option<f64>,
    pub kernel_cpu: Option<f64>,
    pub iowait_cpu: Option<f64>,
    pub irq_cpu: Option<f64>,
    pub softirq_cpu: Option<f64>,
    pub load_1: Option<f64>,
    pub load_5: Option<f64>,
    pub load_15: Option<f64>,
    /// Raw text of the ANR block as it appeared in the log.
    pub stack: Option<String>,
    /// Thread dump back-filled from a "VM TRACES AT LAST ANR" section.
    pub trace: Option<String>,
    pub event_time: Option<NaiveDateTime>,
    pub pid: Option<u32>,
    pub tid: Option<u32>,
    pub last_preamble: Option<String>,
    pub process_preamble: Option<String>,
}

impl AnrItem {
    pub const KIND: &'static str = "ANR";

    pub fn merge(&self, other: &AnrItem) -> Result<AnrItem, ParseError> {
        Ok(AnrItem {
            app: merge_field("app", &self.app, &other.app)?,
            activity: merge_field("activity", &self.activity, &other.activity)?,
            reason: merge_field("reason", &self.reason, &other.reason)?,
            total_cpu: merge_field("total_cpu", &self.total_cpu, &other.total_cpu)?,
            user_cpu: merge_field("user_cpu", &self.user_cpu, &other.user_cpu)?,
            kernel_cpu: merge_field("kernel_cpu", &self.kernel_cpu, &other.kernel_cpu)?,
            iowait_cpu: merge_field("iowait_cpu", &self.iowait_cpu, &other.iowait_cpu)?,
            irq_cpu: merge_field("irq_cpu", &self.irq_cpu, &other.irq_cpu)?,
            softirq_cpu: merge_field("softirq_cpu", &self.softirq_cpu, &other.softirq_cpu)?,
            load_1: merge_field("load_1", &self.load_1, &other.load_1)?,
            load_5: merge_field("load_5", &self.load_5, &other.load_5)?,
            load_15: merge_field("load_15", &self.load_15, &other.load_15)?,
            stack: merge_field("stack", &self.stack, &other.stack)?,
            trace: merge_field("trace", &self.trace, &other.trace)?,
            event_time: merge_field("event_time", &self.event_time, &other.event_time)?,
            pid: merge_field("pid", &self.pid, &other.pid)?,
            tid: merge_field("tid", &self.tid, &other.tid)?,
            last_preamble: merge_field("last_preamble", &self.last_preamble, &other.last_preamble)?,
            process_preamble: merge_field(
                "process_preamble",
                &self.process_preamble,
                &other.process_preamble,
            )?,
        })
    }

    pub fn is_consistent(&self, other: &AnrItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// An uncaught Java exception with its primary stack and the ordered
/// `Caused by:` chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JavaCrashItem {
    pub exception: Option<String>,
    pub message: Option<String>,
    /// Exception/message header line plus its `at` lines, verbatim.
    pub stack: Option<String>,
    /// One entry per `Caused by:` group, in order of appearance.
    pub cause_stacks: Vec<String>,
    pub event_time: Option<NaiveDateTime>,
    pub pid: Option<u32>,
    pub tid: Option<u32>,
    pub app: Option<String>,
    pub last_preamble: Option<String>,
    pub process_preamble: Option<String>,
}

impl JavaCrashItem {
    pub const KIND: &'static str = "JAVA_CRASH";

    pub fn merge(&self, other: &JavaCrashItem) -> Result<JavaCrashItem, ParseError> {
        let cause_stacks = merge_list("cause_stacks", &self.cause_stacks, &other.cause_stacks)?;
        Ok(JavaCrashItem {
            exception: merge_field("exception", &self.exception, &other.exception)?,
            message: merge_field("message", &self.message, &other.message)?,
            stack: merge_field("stack", &self.stack, &other.stack)?,
            cause_stacks,
            event_time: merge_field("event_time", &self.event_time, &other.event_time)?,
            pid: merge_field("pid", &self.pid, &other.pid)?,
            tid: merge_field("tid", &self.tid, &other.tid)?,
            app: merge_field("app", &self.app, &other.app)?,
            last_preamble: merge_field("last_preamble", &self.last_preamble, &other.last_preamble)?,
            process_preamble: merge_field(
                "process_preamble",
                &self.process_preamble,
                &other.process_preamble,
            )?,
        })
    }

    pub fn is_consistent(&self, other: &JavaCrashItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// A native (debuggerd) crash dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NativeCrashItem {
    pub fingerprint: Option<String>,
    /// Separator line through end of block, trimmed.
    pub stack: Option<String>,
    pub event_time: Option<NaiveDateTime>,
    pub pid: Option<u32>,
    pub tid: Option<u32>,
    pub app: Option<String>,
    pub last_preamble: Option<String>,
    pub process_preamble: Option<String>,
}

impl NativeCrashItem {
    pub const KIND: &'static str = "NATIVE_CRASH";

    pub fn merge(&self, other: &NativeCrashItem) -> Result<NativeCrashItem, ParseError> {
        Ok(NativeCrashItem {
            fingerprint: merge_field("fingerprint", &self.fingerprint, &other.fingerprint)?,
            stack: merge_field("stack", &self.stack, &other.stack)?,
            event_time: merge_field("event_time", &self.event_time, &other.event_time)?,
            pid: merge_field("pid", &self.pid, &other.pid)?,
            tid: merge_field("tid", &self.tid, &other.tid)?,
            app: merge_field("app", &self.app, &other.app)?,
            last_preamble: merge_field("last_preamble", &self.last_preamble, &other.last_preamble)?,
            process_preamble: merge_field(
                "process_preamble",
                &self.process_preamble,
                &other.process_preamble,
            )?,
        })
    }

    pub fn is_consistent(&self, other: &NativeCrashItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// An event isolated from a logcat stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogcatEvent {
    Anr(AnrItem),
    JavaCrash(JavaCrashItem),
    NativeCrash(NativeCrashItem),
}

impl LogcatEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LogcatEvent::Anr(_) => AnrItem::KIND,
            LogcatEvent::JavaCrash(_) => JavaCrashItem::KIND,
            LogcatEvent::NativeCrash(_) => NativeCrashItem::KIND,
        }
    }

    pub fn app(&self) -> Option<&str> {
        match self {
            LogcatEvent::Anr(item) => item.app.as_deref(),
            LogcatEvent::JavaCrash(item) => item.app.as_deref(),
            LogcatEvent::NativeCrash(item) => item.app.as_deref(),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            LogcatEvent::Anr(item) => item.pid,
            LogcatEvent::JavaCrash(item) => item.pid,
            LogcatEvent::NativeCrash(item) => item.pid,
        }
    }

    pub fn event_time(&self) -> Option<NaiveDateTime> {
        match self {
            LogcatEvent::Anr(item) => item.event_time,
            LogcatEvent::JavaCrash(item) => item.event_time,
            LogcatEvent::NativeCrash(item) => item.event_time,
        }
    }
}

/// A parsed logcat capture: the events found in it, in order, plus the
/// time span of the successfully parsed lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogcatItem {
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    /// Logcat timestamps carry no year; true when the year was guessed
    /// from the wall clock rather than supplied by the caller.
    pub year_inferred: bool,
    pub events: Vec<LogcatEvent>,
}

impl LogcatItem {
    pub const KIND: &'static str = "LOGCAT";

    pub fn merge(&self, other: &LogcatItem) -> Result<LogcatItem, ParseError> {
        Ok(LogcatItem {
            start_time: merge_field("start_time", &self.start_time, &other.start_time)?,
            stop_time: merge_field("stop_time", &self.stop_time, &other.stop_time)?,
            // Data with a guessed year stays guessed after merging.
            year_inferred: self.year_inferred || other.year_inferred,
            events: merge_list("events", &self.events, &other.events)?,
        })
    }

    pub fn is_consistent(&self, other: &LogcatItem) -> bool {
        self.merge(other).is_ok()
    }

    pub fn anrs(&self) -> impl Iterator<Item = &AnrItem> {
        self.events.iter().filter_map(|event| match event {
            LogcatEvent::Anr(item) => Some(item),
            _ => None,
        })
    }

    pub fn java_crashes(&self) -> impl Iterator<Item = &JavaCrashItem> {
        self.events.iter().filter_map(|event| match event {
            LogcatEvent::JavaCrash(item) => Some(item),
            _ => None,
        })
    }

    pub fn native_crashes(&self) -> impl Iterator<Item = &NativeCrashItem> {
        self.events.iter().filter_map(|event| match event {
            LogcatEvent::NativeCrash(item) => Some(item),
            _ => None,
        })
    }
}
