use crate::items::MemInfoItem;
use crate::parsers::LineParser;

/// Parses a `/proc/meminfo`-style dump: `Key:  <value> kB` per line.
/// Lines that do not fit are skipped.
#[derive(Default)]
pub struct MemInfoParser {
    item: MemInfoItem,
}

impl MemInfoParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<'a, I>(lines: I) -> MemInfoItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }
}

impl LineParser for MemInfoParser {
    type Output = MemInfoItem;

    fn feed(&mut self, line: &str) {
        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default().trim_end_matches(':');
        if key.is_empty() || !line.contains(':') {
            return;
        }
        let value = match parts.next().unwrap_or_default().parse::<u64>() {
            Ok(value) => value,
            Err(_) => return,
        };
        self.item.rows.insert(key.to_string(), value);
    }

    fn commit(self) -> MemInfoItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_rows() {
        let item = MemInfoParser::parse([
            "MemTotal:         353332 kB",
            "MemFree:           65420 kB",
            "Buffers:           20800 kB",
        ]);
        assert_eq!(item.rows.get("MemTotal"), Some(&353332));
        assert_eq!(item.rows.get("MemFree"), Some(&65420));
        assert_eq!(item.rows.get("Buffers"), Some(&20800));
    }

    #[test]
    fn skips_lines_without_a_numeric_value() {
        let item = MemInfoParser::parse(["MemTotal: lots", "", "no colon here"]);
        assert!(item.rows.is_empty());
    }
}
