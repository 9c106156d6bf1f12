//! Timezone-normalized date strings for stored filenames and notifications.
//! The report belongs to a business day in the customer's zone, not UTC.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Today rendered in the given zone with a strftime format.
pub fn today_in(tz: Tz, format: &str) -> String {
    format_in(Utc::now(), tz, format)
}

pub fn format_in(instant: DateTime<Utc>, tz: Tz, format: &str) -> String {
    instant.with_timezone(&tz).format(format).to_string()
}

/// Derive the stored artifact name by stamping today's date between the
/// basename and extension: `AR_AgingDetail.pdf` → `AR_AgingDetail-20260101.pdf`.
pub fn stamped_filename(filename: &str, tz: Tz) -> String {
    let stamp = today_in(tz, "%Y%m%d");
    match filename.rsplit_once('.') {
        Some((base, ext)) => format!("{}-{}.{}", base, stamp, ext),
        None => format!("{}-{}", filename, stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_in_the_target_zone() {
        // 02:30 UTC is still the previous evening in New York.
        let instant = Utc.with_ymd_and_hms(2026, 1, 2, 2, 30, 0).unwrap();
        let rendered = format_in(instant, chrono_tz::America::New_York, "%Y/%m/%d");
        assert_eq!(rendered, "2026/01/01");
    }

    #[test]
    fn stamps_between_basename_and_extension() {
        let name = stamped_filename("AR_AgingDetail.pdf", chrono_tz::America::New_York);
        assert!(name.starts_with("AR_AgingDetail-"));
        assert!(name.ends_with(".pdf"));

        let stamp = &name["AR_AgingDetail-".len()..name.len() - ".pdf".len()];
        assert_eq!(stamp.len(), 8);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn filename_without_extension_gets_a_suffix() {
        let name = stamped_filename("report", chrono_tz::UTC);
        assert!(name.starts_with("report-"));
        assert!(!name.contains('.'));
    }
}
