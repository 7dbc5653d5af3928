//! LIST / NLST output parsing.
//!
//! Recognized LIST dialects:
//! 1. **Unix-style** (`ls -l`): `-rw-r--r--   1 owner group  1234 Jan  1 12:00 file.txt`
//! 2. **DOS/IIS-style**: `01-01-26  12:00AM       <DIR>          folder`
//!
//! Lines in any other shape are skipped one by one. Only when no entry line
//! matches a known dialect does the structured parse fail with
//! [`ListingError::UnsupportedDialect`]; the session then retries with NLST
//! and [`ListingParser::parse_simple`].

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::entry::{join_path, DirectoryEntry};
use crate::error::ListingError;

lazy_static! {
    static ref UNIX_LINE: Regex = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})[+@.]?\s+   # permissions, optional ACL marker
        (\d+)\s+                              # link count
        (\S+)\s+                              # owner
        (\S+)\s+                              # group
        (\d+,\s*\d+|\d+)\s+                   # size, or `major, minor` for devices
        (\w{3}\s+\d{1,2}\s+[\d:]+|\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2})\s+  # date
        (.+)$                                 # name, possibly `link -> target`
        "
    )
    .expect("unix listing regex");
    static ref DOS_LINE: Regex = Regex::new(
        r"(?x)
        ^(\d{2}-\d{2}-\d{2,4})\s+             # date
        (\d{1,2}:\d{2}[AaPp][Mm])\s+          # time
        (<DIR>|\d+)\s+                        # directory marker or size
        (.+)$                                 # name
        "
    )
    .expect("dos listing regex");
}

pub struct ListingParser;

impl ListingParser {
    /// Structured parse of raw LIST lines below `parent_path`.
    ///
    /// `.` and `..` are dropped. Blank lines and `total N` headers are
    /// ignored, and so is any single line no dialect recognizes. No ordering
    /// is imposed.
    pub fn parse(parent_path: &str, raw_lines: &[String]) -> Result<Vec<DirectoryEntry>, ListingError> {
        let mut entries = Vec::with_capacity(raw_lines.len());
        let mut recognized = 0;
        let mut first_unknown = None;

        for line in raw_lines {
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || is_total_header(line) {
                continue;
            }

            let Some(parsed) = parse_unix(line).or_else(|| parse_dos(line)) else {
                debug!("Skipping unrecognized listing line: {:?}", line);
                first_unknown.get_or_insert(line);
                continue;
            };
            recognized += 1;

            if is_dot_entry(&parsed.name) {
                continue;
            }

            entries.push(parsed.into_entry(parent_path));
        }

        match first_unknown {
            Some(line) if recognized == 0 => Err(ListingError::UnsupportedDialect(line.to_string())),
            _ => Ok(entries),
        }
    }

    /// Name-only fallback over raw NLST output.
    ///
    /// A name is a directory when it ends with `/` or has neither a `.` nor a
    /// space in it. Extension-less files such as `README` are therefore
    /// reported as directories.
    pub fn parse_simple(parent_path: &str, raw_names: &[String]) -> Vec<DirectoryEntry> {
        raw_names
            .iter()
            .map(|name| name.trim_end_matches(['\r', '\n']))
            .filter(|name| !name.is_empty() && !is_dot_entry(name))
            .map(|name| {
                let is_directory =
                    name.ends_with('/') || (!name.contains('.') && !name.contains(' '));
                let clean_name = name.strip_suffix('/').unwrap_or(name);
                DirectoryEntry::bare(clean_name, join_path(parent_path, clean_name), is_directory)
            })
            .collect()
    }
}

struct ParsedLine {
    name: String,
    is_directory: bool,
    size: u64,
    modified: Option<DateTime<Local>>,
    permissions: Option<String>,
    owner: String,
    group: String,
}

impl ParsedLine {
    fn into_entry(self, parent_path: &str) -> DirectoryEntry {
        let path = join_path(parent_path, &self.name);
        let mut entry = DirectoryEntry::bare(self.name, path, self.is_directory);

        entry.size = self.size;
        if let Some(modified) = self.modified {
            entry.last_modified = modified;
        }
        if let Some(permissions) = self.permissions {
            entry.permissions = permissions;
        }
        entry.owner = self.owner;
        entry.group = self.group;
        entry
    }
}

fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

fn is_total_header(line: &str) -> bool {
    line.strip_prefix("total ")
        .map(|rest| rest.trim().chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn parse_unix(line: &str) -> Option<ParsedLine> {
    let caps = UNIX_LINE.captures(line)?;

    let perms = caps.get(1)?.as_str();
    let owner = caps.get(3)?.as_str().to_string();
    let group = caps.get(4)?.as_str().to_string();
    // Device files report `major, minor` instead of a byte count.
    let size = caps.get(5)?.as_str().parse::<u64>().unwrap_or(0);
    let date_str = caps.get(6)?.as_str();
    let name_raw = caps.get(7)?.as_str();

    let is_symlink = perms.starts_with('l');
    let name = if is_symlink {
        name_raw.split(" -> ").next().unwrap_or(name_raw)
    } else {
        name_raw
    };

    Some(ParsedLine {
        name: name.to_string(),
        is_directory: perms.starts_with('d'),
        size,
        modified: parse_unix_date(date_str),
        permissions: Some(perms.to_string()),
        owner,
        group,
    })
}

/// `Jan  1 12:00` (within the last year), `Jan  1  2025` (midnight) or
/// `2025-01-01 12:00`.
fn parse_unix_date(s: &str) -> Option<DateTime<Local>> {
    let normalised = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalised.starts_with(|c: char| c.is_ascii_digit()) {
        let naive = NaiveDateTime::parse_from_str(&normalised, "%Y-%m-%d %H:%M").ok()?;
        return Local.from_local_datetime(&naive).single();
    }

    if normalised.contains(':') {
        return parse_recent_date(&normalised);
    }

    let date = NaiveDate::parse_from_str(&normalised, "%b %d %Y").ok()?;
    Local.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Year-less timestamps belong to the most recent year that does not put
/// them more than a day in the future. `Feb 29` walks back to a leap year.
fn parse_recent_date(normalised: &str) -> Option<DateTime<Local>> {
    let now = Local::now();
    let latest = now + Duration::days(1);

    (0..8).map(|back| now.year() - back).find_map(|year| {
        let naive = NaiveDateTime::parse_from_str(
            &format!("{} {}", year, normalised),
            "%Y %b %d %H:%M",
        )
        .ok()?;
        let stamp = Local.from_local_datetime(&naive).single()?;
        (stamp <= latest).then_some(stamp)
    })
}

fn parse_dos(line: &str) -> Option<ParsedLine> {
    let caps = DOS_LINE.captures(line)?;

    let date_str = caps.get(1)?.as_str();
    let time_str = caps.get(2)?.as_str();
    let size_or_dir = caps.get(3)?.as_str();
    let name = caps.get(4)?.as_str().trim_end();

    let is_directory = size_or_dir == "<DIR>";
    let size = if is_directory {
        0
    } else {
        size_or_dir.parse::<u64>().unwrap_or(0)
    };

    Some(ParsedLine {
        name: name.to_string(),
        is_directory,
        size,
        modified: parse_dos_date(date_str, time_str),
        permissions: None,
        owner: String::new(),
        group: String::new(),
    })
}

fn parse_dos_date(date: &str, time: &str) -> Option<DateTime<Local>> {
    let combined = format!("{} {}", date, time.to_uppercase());
    let format = if date.len() > 8 {
        "%m-%d-%Y %I:%M%p"
    } else {
        "%m-%d-%y %I:%M%p"
    };
    let naive = NaiveDateTime::parse_from_str(&combined, format).ok()?;
    Local.from_local_datetime(&naive).single()
}
