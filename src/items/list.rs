use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::items::bugreport::{BugreportItem, MemInfoItem, ProcrankItem, SystemPropsItem};
use crate::items::logcat::{AnrItem, JavaCrashItem, LogcatItem, NativeCrashItem};
use crate::items::monkey::MonkeyLogItem;

/// Any record this crate can produce, discriminated by a stable kind tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Anr(AnrItem),
    JavaCrash(JavaCrashItem),
    NativeCrash(NativeCrashItem),
    Procrank(ProcrankItem),
    MemInfo(MemInfoItem),
    SystemProps(SystemPropsItem),
    Logcat(LogcatItem),
    Bugreport(BugreportItem),
    MonkeyLog(MonkeyLogItem),
}

impl Item {
    pub fn kind(&self) -> &'static str {
        match self {
            Item::Anr(_) => AnrItem::KIND,
            Item::JavaCrash(_) => JavaCrashItem::KIND,
            Item::NativeCrash(_) => NativeCrashItem::KIND,
            Item::Procrank(_) => ProcrankItem::KIND,
            Item::MemInfo(_) => MemInfoItem::KIND,
            Item::SystemProps(_) => SystemPropsItem::KIND,
            Item::Logcat(_) => LogcatItem::KIND,
            Item::Bugreport(_) => BugreportItem::KIND,
            Item::MonkeyLog(_) => MonkeyLogItem::KIND,
        }
    }

    /// Merge two items of the same kind by delegating to the inner type.
    /// Items of different kinds never merge.
    pub fn merge(&self, other: &Item) -> Result<Item, ParseError> {
        match (self, other) {
            (Item::Anr(a), Item::Anr(b)) => Ok(Item::Anr(a.merge(b)?)),
            (Item::JavaCrash(a), Item::JavaCrash(b)) => Ok(Item::JavaCrash(a.merge(b)?)),
            (Item::NativeCrash(a), Item::NativeCrash(b)) => Ok(Item::NativeCrash(a.merge(b)?)),
            (Item::Procrank(a), Item::Procrank(b)) => Ok(Item::Procrank(a.merge(b)?)),
            (Item::MemInfo(a), Item::MemInfo(b)) => Ok(Item::MemInfo(a.merge(b)?)),
            (Item::SystemProps(a), Item::SystemProps(b)) => Ok(Item::SystemProps(a.merge(b)?)),
            (Item::Logcat(a), Item::Logcat(b)) => Ok(Item::Logcat(a.merge(b)?)),
            (Item::Bugreport(a), Item::Bugreport(b)) => Ok(Item::Bugreport(a.merge(b)?)),
            (Item::MonkeyLog(a), Item::MonkeyLog(b)) => Ok(Item::MonkeyLog(a.merge(b)?)),
            _ => Err(ParseError::conflict("kind", self.kind(), other.kind())),
        }
    }

    pub fn is_consistent(&self, other: &Item) -> bool {
        self.merge(other).is_ok()
    }
}

/// Ordered, append-only collection of items with kind-tag lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// All items whose kind tag matches the pattern, in insertion order.
    pub fn find_all<'a>(&'a self, kind: &Regex) -> Vec<&'a Item> {
        self.items
            .iter()
            .filter(|item| kind.is_match(item.kind()))
            .collect()
    }

    /// First item whose kind tag matches the pattern.
    pub fn find_first<'a>(&'a self, kind: &Regex) -> Option<&'a Item> {
        self.items.iter().find(|item| kind.is_match(item.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_matches_kind_by_regex() {
        let mut list = ItemList::new();
        list.push(Item::Anr(AnrItem::default()));
        list.push(Item::JavaCrash(JavaCrashItem::default()));
        list.push(Item::NativeCrash(NativeCrashItem::default()));

        let crashes = list.find_all(&Regex::new(r"_CRASH$").expect("regex"));
        assert_eq!(crashes.len(), 2);
        assert_eq!(crashes[0].kind(), "JAVA_CRASH");
        assert_eq!(crashes[1].kind(), "NATIVE_CRASH");
    }

    #[test]
    fn find_first_returns_earliest_match() {
        let mut list = ItemList::new();
        list.push(Item::MemInfo(MemInfoItem::default()));
        list.push(Item::Anr(AnrItem::default()));
        let found = list.find_first(&Regex::new("^ANR$").expect("regex"));
        assert_eq!(found.map(Item::kind), Some("ANR"));
    }

    #[test]
    fn find_first_returns_none_when_absent() {
        let list = ItemList::new();
        assert!(list.find_first(&Regex::new("ANR").expect("regex")).is_none());
    }

    #[test]
    fn merge_delegates_for_matching_kinds() {
        let left = Item::Anr(AnrItem {
            app: Some("com.foo".to_string()),
            ..AnrItem::default()
        });
        let right = Item::Anr(AnrItem {
            reason: Some("keyDispatchingTimedOut".to_string()),
            ..AnrItem::default()
        });

        let merged = left.merge(&right).expect("merge");
        let Item::Anr(anr) = &merged else {
            panic!("merged item changed kind");
        };
        assert_eq!(anr.app.as_deref(), Some("com.foo"));
        assert_eq!(anr.reason.as_deref(), Some("keyDispatchingTimedOut"));
        assert_eq!(merged, right.merge(&left).expect("merge"));
    }

    #[test]
    fn merge_rejects_mismatched_kinds() {
        let left = Item::Anr(AnrItem::default());
        let right = Item::MemInfo(MemInfoItem::default());
        assert!(!left.is_consistent(&right));
        match left.merge(&right) {
            Err(ParseError::MergeConflict { field, left, right }) => {
                assert_eq!(field, "kind");
                assert_eq!(left, "ANR");
                assert_eq!(right, "MEM_INFO");
            }
            other => panic!("expected a kind conflict, got {other:?}"),
        }
    }
}
