//! MS-DOS packed date/time used by the disk container header and catalog.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Decodes a 32-bit MS-DOS date/time (date in the high 16 bits, time in the
/// low 16 bits) into a UTC timestamp.
pub fn dos_to_datetime(dos: u32) -> DateTime<Utc> {
    let date = (dos >> 16) as u16;
    let time = (dos & 0xFFFF) as u16;

    let year = 1980 + i32::from(date >> 9);
    let month = ((date >> 5) & 0x0F).max(1).min(12);
    let day = (date & 0x1F).max(1).min(31);

    let hour = (time >> 11) & 0x1F;
    let minute = (time >> 5) & 0x3F;
    let second = (time & 0x1F) * 2;

    Utc.with_ymd_and_hms(
        year,
        u32::from(month),
        u32::from(day),
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
    )
    .single()
    .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
}

/// Encodes a UTC timestamp into the 32-bit MS-DOS packed date/time format.
pub fn datetime_to_dos(ts: DateTime<Utc>) -> u32 {
    let year = (ts.year() - 1980).clamp(0, 127) as u32;
    let date = (year << 9) | (ts.month() << 5) | ts.day();
    let time = (ts.hour() << 11) | (ts.minute() << 5) | (ts.second() / 2);
    (date << 16) | time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_stable_to_two_second_resolution() {
        let ts = Utc.with_ymd_and_hms(2002, 3, 14, 12, 30, 40).unwrap();
        let dos = datetime_to_dos(ts);
        let back = dos_to_datetime(dos);
        assert_eq!(back.year(), 2002);
        assert_eq!(back.month(), 3);
        assert_eq!(back.day(), 14);
        assert_eq!(back.hour(), 12);
        assert_eq!(back.minute(), 30);
        assert_eq!(back.second(), 40);
    }
}
