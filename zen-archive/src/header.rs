//! The common textual preamble shared by all three back-ends, and back-end
//! selection.

use std::io::{Read, Write};

use chrono::{DateTime, NaiveDateTime, Utc};
use zen_stream::ReadExt;

use crate::error::{Error, Result};

const MARKER: &str = "ZenGin Archive";
const VERSION_LINE: &str = "ver 1";
const DATE_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Which of the three interchangeable serialization back-ends an archive
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ascii,
    Binary,
    Binsafe,
}

impl Format {
    fn as_header_keyword(self) -> &'static str {
        match self {
            Self::Ascii => "ASCII",
            Self::Binary => "BINARY",
            Self::Binsafe => "BIN_SAFE",
        }
    }

    fn from_header_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ASCII" => Some(Self::Ascii),
            "BINARY" => Some(Self::Binary),
            "BIN_SAFE" => Some(Self::Binsafe),
            _ => None,
        }
    }
}

/// Fields of the archive's common textual preamble.
#[derive(Debug, Clone)]
pub struct ArchiveHeader {
    pub version: u32,
    pub archiver: String,
    pub format: Format,
    pub save: bool,
    pub user: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl ArchiveHeader {
    /// Parses the common preamble, leaving the stream positioned right
    /// after the terminating `END` line (the back-end-specific preamble or
    /// body follows).
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let marker = reader.read_line(true)?;
        if marker != MARKER {
            return Err(Error::parser(
                "ReadArchive.Header",
                format!("expected marker {MARKER:?}, found {marker:?}"),
            ));
        }

        let version_line = reader.read_line(true)?;
        if version_line != VERSION_LINE {
            return Err(Error::parser(
                "ReadArchive.Header",
                format!("expected {VERSION_LINE:?}, found {version_line:?}"),
            ));
        }

        let archiver = reader.read_line(true)?;

        let format_line = reader.read_line(true)?;
        let format = Format::from_header_keyword(&format_line).ok_or_else(|| {
            Error::parser(
                "ReadArchive.Header",
                format!("unknown archive format {format_line:?}"),
            )
        })?;

        let mut save = false;
        let mut user = None;
        let mut date = None;

        loop {
            let line = reader.read_line(true)?;
            if line == "END" {
                break;
            }
            if let Some(value) = line.strip_prefix("saveGame ") {
                save = value.trim() != "0";
            } else if let Some(value) = line.strip_prefix("date ") {
                date = NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT)
                    .ok()
                    .map(|naive| naive.and_utc());
            } else if let Some(value) = line.strip_prefix("user ") {
                user = Some(value.trim().to_string());
            } else {
                return Err(Error::parser(
                    "ReadArchive.Header",
                    format!("unexpected header line {line:?}"),
                ));
            }
        }

        Ok(Self {
            version: 1,
            archiver,
            format,
            save,
            user,
            date,
        })
    }

    /// Writes the common preamble, including the terminating `END` line.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.version != 1 {
            return Err(Error::UnsupportedVersion {
                found: self.version,
            });
        }
        writeln!(writer, "{MARKER}")?;
        writeln!(writer, "{VERSION_LINE}")?;
        writeln!(writer, "{}", self.archiver)?;
        writeln!(writer, "{}", self.format.as_header_keyword())?;
        writeln!(writer, "saveGame {}", u8::from(self.save))?;
        if let Some(date) = self.date {
            writeln!(writer, "date {}", format_date(date))?;
        }
        if let Some(user) = &self.user {
            writeln!(writer, "user {user}")?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

/// Formats a date per `"%Y.%m.%d %H:%M:%S"` with leading zeros stripped from
/// the year/month/day components.
fn format_date(date: DateTime<Utc>) -> String {
    use chrono::Datelike;
    format!(
        "{}.{}.{} {}",
        date.year(),
        date.month(),
        date.day(),
        date.format("%H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_formatting_strips_leading_zero_components() {
        let date = Utc.with_ymd_and_hms(2002, 3, 5, 16, 30, 0).unwrap();
        assert_eq!(format_date(date), "2002.3.5 16:30:00");
    }

    #[test]
    fn header_round_trip_preserves_fields() {
        let header = ArchiveHeader {
            version: 1,
            archiver: "zCArchiverGeneric".to_string(),
            format: Format::Binary,
            save: true,
            user: Some("gothic".to_string()),
            date: Some(Utc.with_ymd_and_hms(2002, 3, 5, 16, 30, 0).unwrap()),
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();

        let parsed = ArchiveHeader::parse(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed.archiver, header.archiver);
        assert_eq!(parsed.format, header.format);
        assert_eq!(parsed.save, header.save);
        assert_eq!(parsed.user, header.user);
        assert_eq!(parsed.date, header.date);
    }

    #[test]
    fn unsupported_version_is_rejected_on_write() {
        let header = ArchiveHeader {
            version: 2,
            archiver: String::new(),
            format: Format::Ascii,
            save: false,
            user: None,
            date: None,
        };
        let mut buf = Vec::new();
        assert!(header.write(&mut buf).is_err());
    }

    #[test]
    fn wrong_marker_is_a_parser_error() {
        let mut bytes = b"not a zengin archive\n".as_slice();
        assert!(ArchiveHeader::parse(&mut bytes).is_err());
    }
}
