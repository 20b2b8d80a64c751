use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

use tracing::debug;
use zip::read::ZipArchive;

use crate::error::ParseError;
use crate::items::{BugreportItem, LogcatItem, MonkeyLogItem};
use crate::parsers::{BugreportParser, LineParser, LogcatParser, MonkeyLogParser};

/// Open a log source as a line reader. A `.zip` path is treated as a
/// zipped bugreport and the report entry inside it is extracted;
/// anything else is read as a plain text file.
pub fn open_lines(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    if is_zip(path) {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let index = find_bugreport_entry(&mut archive)?;
        let mut entry = archive.by_index(index)?;
        debug!(entry = entry.name(), "reading bugreport from archive");
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(Box::new(Cursor::new(bytes)))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

pub fn parse_bugreport_file(path: &Path) -> Result<BugreportItem, ParseError> {
    BugreportParser::parse_reader(open_lines(path)?)
}

pub fn parse_logcat_file(path: &Path) -> Result<LogcatItem, ParseError> {
    LogcatParser::parse_reader(open_lines(path)?)
}

pub fn parse_monkey_file(path: &Path) -> Result<MonkeyLogItem, ParseError> {
    let mut parser = MonkeyLogParser::new();
    crate::parsers::feed_reader(&mut parser, open_lines(path)?)?;
    Ok(parser.commit())
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Pick the report entry out of a zipped bugreport: the largest `.txt`
/// whose name looks like a bugreport. Captures from recent devices also
/// carry a `main_entry.txt` pointer, which qualifies as a fallback.
fn find_bugreport_entry(archive: &mut ZipArchive<File>) -> Result<usize, ParseError> {
    let mut chosen_index = None;
    let mut chosen_size = 0u64;
    for idx in 0..archive.len() {
        let file = archive.by_index(idx)?;
        let name = file.name().to_ascii_lowercase();
        if name.ends_with(".txt") && (name.contains("bugreport") || name.contains("main_entry")) {
            let size = file.size();
            if size >= chosen_size {
                chosen_index = Some(idx);
                chosen_size = size;
            }
        }
    }
    chosen_index.ok_or_else(|| {
        ParseError::UnsupportedInput("no bugreport entry found in archive".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const REPORT: &str = "\
== dumpstate: 2012-04-25 20:45:10
------ MEMORY INFO (/proc/meminfo) ------
MemTotal:         353332 kB
";

    #[test]
    fn reads_a_plain_bugreport_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bugreport.txt");
        std::fs::write(&path, REPORT).expect("write report");

        let item = parse_bugreport_file(&path).expect("parse");
        assert_eq!(
            item.mem_info.expect("mem info").rows.get("MemTotal"),
            Some(&353332)
        );
    }

    #[test]
    fn extracts_the_report_entry_from_a_zip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bugreport.zip");
        let file = File::create(&path).expect("create zip");
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer.start_file("version.txt", options).expect("entry");
        writer.write_all(b"10.0").expect("write");
        writer
            .start_file("bugreport-2012-04-25.txt", options)
            .expect("entry");
        writer.write_all(REPORT.as_bytes()).expect("write");
        writer.finish().expect("finish");

        let item = parse_bugreport_file(&path).expect("parse");
        assert!(item.timestamp.is_some());
        assert!(item.mem_info.is_some());
    }

    #[test]
    fn zip_without_a_report_entry_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.zip");
        let file = File::create(&path).expect("create zip");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("notes.md", SimpleFileOptions::default())
            .expect("entry");
        writer.write_all(b"nothing here").expect("write");
        writer.finish().expect("finish");

        let err = parse_bugreport_file(&path).expect_err("should reject");
        assert!(matches!(err, ParseError::UnsupportedInput(_)));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = parse_logcat_file(Path::new("/nonexistent/logcat.txt")).expect_err("io");
        assert!(matches!(err, ParseError::Io(_)));
    }
}
