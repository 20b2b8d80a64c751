use crate::items::SystemPropsItem;
use crate::parsers::LineParser;

/// Parses `getprop`-style output: `[key]: [value]` per line. Anything
/// else is skipped.
#[derive(Default)]
pub struct SystemPropsParser {
    item: SystemPropsItem,
}

impl SystemPropsParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<'a, I>(lines: I) -> SystemPropsItem
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = Self::new();
        parser.feed_all(lines);
        parser.commit()
    }
}

impl LineParser for SystemPropsParser {
    type Output = SystemPropsItem;

    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        if !trimmed.starts_with('[') {
            return;
        }
        let Some((key_part, value_part)) = trimmed.split_once("]: [") else {
            return;
        };
        let key = key_part.trim_start_matches('[').trim();
        let value = value_part.trim_end_matches(']').trim();
        if !key.is_empty() {
            self.item.props.insert(key.to_string(), value.to_string());
        }
    }

    fn commit(self) -> SystemPropsItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_properties() {
        let item = SystemPropsParser::parse([
            "[ro.build.version.release]: [4.0.4]",
            "[ro.product.model]: [Galaxy Nexus]",
            "[dalvik.vm.heapsize]: [256m]",
        ]);
        assert_eq!(item.props.get("ro.build.version.release").map(String::as_str), Some("4.0.4"));
        assert_eq!(item.props.get("ro.product.model").map(String::as_str), Some("Galaxy Nexus"));
        assert_eq!(item.props.len(), 3);
    }

    #[test]
    fn skips_unbracketed_lines() {
        let item = SystemPropsParser::parse(["not a property", "", "[broken line"]);
        assert!(item.props.is_empty());
    }
}
