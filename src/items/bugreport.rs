use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{merge_field, ParseError};
use crate::items::logcat::LogcatItem;

/// Merge one optional section by delegating to the section's own merge
/// when both sides carry it.
fn merge_section<T: Clone>(
    left: &Option<T>,
    right: &Option<T>,
    merge: impl Fn(&T, &T) -> Result<T, ParseError>,
) -> Result<Option<T>, ParseError> {
    match (left, right) {
        (Some(a), Some(b)) => Ok(Some(merge(a, b)?)),
        (Some(a), None) => Ok(Some(a.clone())),
        (None, Some(b)) => Ok(Some(b.clone())),
        (None, None) => Ok(None),
    }
}

/// `/proc/meminfo`-style key/value rows, values in kB.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemInfoItem {
    pub rows: BTreeMap<String, u64>,
}

impl MemInfoItem {
    pub const KIND: &'static str = "MEM_INFO";

    pub fn merge(&self, other: &MemInfoItem) -> Result<MemInfoItem, ParseError> {
        let mut rows = self.rows.clone();
        for (key, value) in &other.rows {
            match rows.get(key) {
                Some(existing) if existing != value => {
                    return Err(ParseError::conflict("rows", existing, value));
                }
                _ => {
                    rows.insert(key.clone(), *value);
                }
            }
        }
        Ok(MemInfoItem { rows })
    }

    pub fn is_consistent(&self, other: &MemInfoItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// One procrank row: per-process memory usage, all values normalized to kB.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcrankLine {
    pub process_name: String,
    pub vss_kb: Option<u64>,
    pub rss_kb: Option<u64>,
    pub pss_kb: Option<u64>,
    pub uss_kb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcrankItem {
    /// Keyed by process id.
    pub processes: BTreeMap<u32, ProcrankLine>,
}

impl ProcrankItem {
    pub const KIND: &'static str = "PROCRANK";

    pub fn merge(&self, other: &ProcrankItem) -> Result<ProcrankItem, ParseError> {
        let mut processes = self.processes.clone();
        for (pid, line) in &other.processes {
            match processes.get(pid) {
                Some(existing) if existing != line => {
                    return Err(ParseError::conflict(
                        "processes",
                        &existing.process_name,
                        &line.process_name,
                    ));
                }
                _ => {
                    processes.insert(*pid, line.clone());
                }
            }
        }
        Ok(ProcrankItem { processes })
    }

    pub fn is_consistent(&self, other: &ProcrankItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// `getprop`-style system properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemPropsItem {
    pub props: BTreeMap<String, String>,
}

impl SystemPropsItem {
    pub const KIND: &'static str = "SYSTEM_PROPS";

    pub fn merge(&self, other: &SystemPropsItem) -> Result<SystemPropsItem, ParseError> {
        let mut props = self.props.clone();
        for (key, value) in &other.props {
            match props.get(key) {
                Some(existing) if existing != value => {
                    return Err(ParseError::conflict("props", existing, value));
                }
                _ => {
                    props.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(SystemPropsItem { props })
    }

    pub fn is_consistent(&self, other: &SystemPropsItem) -> bool {
        self.merge(other).is_ok()
    }
}

/// One process entry from a "VM TRACES AT LAST ANR" section: the command
/// line and the stack of its main thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TracesItem {
    pub app: Option<String>,
    pub stack: Option<String>,
}

/// A parsed bugreport: whichever sections were present, plus the dumpstate
/// timestamp. Any section may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BugreportItem {
    pub timestamp: Option<NaiveDateTime>,
    pub mem_info: Option<MemInfoItem>,
    pub procrank: Option<ProcrankItem>,
    pub system_props: Option<SystemPropsItem>,
    pub system_log: Option<LogcatItem>,
}

impl BugreportItem {
    pub const KIND: &'static str = "BUGREPORT";

    pub fn merge(&self, other: &BugreportItem) -> Result<BugreportItem, ParseError> {
        Ok(BugreportItem {
            timestamp: merge_field("timestamp", &self.timestamp, &other.timestamp)?,
            mem_info: merge_section(&self.mem_info, &other.mem_info, MemInfoItem::merge)?,
            procrank: merge_section(&self.procrank, &other.procrank, ProcrankItem::merge)?,
            system_props: merge_section(
                &self.system_props,
                &other.system_props,
                SystemPropsItem::merge,
            )?,
            system_log: merge_section(&self.system_log, &other.system_log, LogcatItem::merge)?,
        })
    }

    pub fn is_consistent(&self, other: &BugreportItem) -> bool {
        self.merge(other).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo_merge_unions_rows() {
        let mut left = MemInfoItem::default();
        left.rows.insert("MemTotal".to_string(), 1000);
        let mut right = MemInfoItem::default();
        right.rows.insert("MemFree".to_string(), 200);

        let merged = left.merge(&right).expect("merge");
        assert_eq!(merged.rows.get("MemTotal"), Some(&1000));
        assert_eq!(merged.rows.get("MemFree"), Some(&200));
        assert_eq!(left.merge(&right).expect("merge"), right.merge(&left).expect("merge"));
    }

    #[test]
    fn meminfo_merge_rejects_conflicting_rows() {
        let mut left = MemInfoItem::default();
        left.rows.insert("MemTotal".to_string(), 1000);
        let mut right = MemInfoItem::default();
        right.rows.insert("MemTotal".to_string(), 2000);
        assert!(!left.is_consistent(&right));
    }

    #[test]
    fn bugreport_merge_unions_sections_commutatively() {
        let mut mem_info = MemInfoItem::default();
        mem_info.rows.insert("MemTotal".to_string(), 353332);
        let left = BugreportItem {
            mem_info: Some(mem_info),
            ..BugreportItem::default()
        };
        let mut props = SystemPropsItem::default();
        props
            .props
            .insert("ro.product.model".to_string(), "Galaxy Nexus".to_string());
        let right = BugreportItem {
            timestamp: chrono::NaiveDateTime::parse_from_str(
                "2012-04-25 20:45:10",
                "%Y-%m-%d %H:%M:%S",
            )
            .ok(),
            system_props: Some(props),
            ..BugreportItem::default()
        };

        let ab = left.merge(&right).expect("merge");
        let ba = right.merge(&left).expect("merge");
        assert_eq!(ab, ba);
        assert!(ab.timestamp.is_some());
        assert!(ab.mem_info.is_some());
        assert!(ab.system_props.is_some());
        assert_eq!(ab.merge(&ab).expect("merge"), ab);
    }

    #[test]
    fn bugreport_merge_surfaces_section_conflicts() {
        let mut left_mem = MemInfoItem::default();
        left_mem.rows.insert("MemTotal".to_string(), 1000);
        let mut right_mem = MemInfoItem::default();
        right_mem.rows.insert("MemTotal".to_string(), 2000);
        let left = BugreportItem {
            mem_info: Some(left_mem),
            ..BugreportItem::default()
        };
        let right = BugreportItem {
            mem_info: Some(right_mem),
            ..BugreportItem::default()
        };
        assert!(!left.is_consistent(&right));
    }

    #[test]
    fn procrank_merge_is_idempotent() {
        let mut item = ProcrankItem::default();
        item.processes.insert(
            1234,
            ProcrankLine {
                process_name: "com.foo".to_string(),
                pss_kb: Some(42),
                ..ProcrankLine::default()
            },
        );
        assert_eq!(item.merge(&item).expect("merge"), item);
    }
}
