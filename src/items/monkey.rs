use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{merge_field, merge_list, ParseError};
use crate::items::logcat::LogcatEvent;

/// Summary of one monkey stress-test run. A flat record: every field is
/// optional because monkey logs are routinely truncated by the crash that
/// ended the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonkeyLogItem {
    pub seed: Option<i64>,
    pub target_count: Option<u64>,
    pub throttle: Option<u64>,
    pub ignore_security_exceptions: bool,
    pub packages: Vec<String>,
    pub categories: Vec<String>,
    /// Highest `Sending event #N` counter seen.
    pub intermediate_count: Option<u64>,
    /// `Events injected: N` from the end of a run.
    pub final_count: Option<u64>,
    pub is_finished: bool,
    pub no_activities: bool,
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    /// Device uptimes (seconds) captured in the start/stop banners.
    pub start_uptime_secs: Option<f64>,
    pub stop_uptime_secs: Option<f64>,
    /// mm:ss run duration from the stop banner, in seconds.
    pub total_duration_secs: Option<u64>,
    pub dropped_keys: Option<u64>,
    pub dropped_pointers: Option<u64>,
    pub dropped_trackballs: Option<u64>,
    pub dropped_flips: Option<u64>,
    pub dropped_rotations: Option<u64>,
    /// The single crash (ANR or Java crash) that ended the run, if any.
    pub crash: Option<LogcatEvent>,
}

impl MonkeyLogItem {
    pub const KIND: &'static str = "MONKEY_LOG";

    pub fn merge(&self, other: &MonkeyLogItem) -> Result<MonkeyLogItem, ParseError> {
        Ok(MonkeyLogItem {
            seed: merge_field("seed", &self.seed, &other.seed)?,
            target_count: merge_field("target_count", &self.target_count, &other.target_count)?,
            throttle: merge_field("throttle", &self.throttle, &other.throttle)?,
            ignore_security_exceptions: self.ignore_security_exceptions
                || other.ignore_security_exceptions,
            packages: merge_list("packages", &self.packages, &other.packages)?,
            categories: merge_list("categories", &self.categories, &other.categories)?,
            intermediate_count: merge_field(
                "intermediate_count",
                &self.intermediate_count,
                &other.intermediate_count,
            )?,
            final_count: merge_field("final_count", &self.final_count, &other.final_count)?,
            is_finished: self.is_finished || other.is_finished,
            no_activities: self.no_activities || other.no_activities,
            start_time: merge_field("start_time", &self.start_time, &other.start_time)?,
            stop_time: merge_field("stop_time", &self.stop_time, &other.stop_time)?,
            start_uptime_secs: merge_field(
                "start_uptime_secs",
                &self.start_uptime_secs,
                &other.start_uptime_secs,
            )?,
            stop_uptime_secs: merge_field(
                "stop_uptime_secs",
                &self.stop_uptime_secs,
                &other.stop_uptime_secs,
            )?,
            total_duration_secs: merge_field(
                "total_duration_secs",
                &self.total_duration_secs,
                &other.total_duration_secs,
            )?,
            dropped_keys: merge_field("dropped_keys", &self.dropped_keys, &other.dropped_keys)?,
            dropped_pointers: merge_field(
                "dropped_pointers",
                &self.dropped_pointers,
                &other.dropped_pointers,
            )?,
            dropped_trackballs: merge_field(
                "dropped_trackballs",
                &self.dropped_trackballs,
                &other.dropped_trackballs,
            )?,
            dropped_flips: merge_field("dropped_flips", &self.dropped_flips, &other.dropped_flips)?,
            dropped_rotations: merge_field(
                "dropped_rotations",
                &self.dropped_rotations,
                &other.dropped_rotations,
            )?,
            crash: merge_field("crash", &self.crash, &other.crash)?,
        })
    }

    pub fn is_consistent(&self, other: &MonkeyLogItem) -> bool {
        self.merge(other).is_ok()
    }
}
