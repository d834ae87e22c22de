use jiff::{tz, Zoned};
use lazy_static::lazy_static;

/// One pickable timezone: its id, the label shown in the settings dialog,
/// and its UTC offset at catalog build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
    pub offset_minutes: i32,
}

lazy_static! {
    /// All known timezones, built once per process at first use.
    pub static ref CATALOG: Vec<CatalogEntry> = build_catalog(&Zoned::now());
}

/// Build the timezone picker catalog at the given instant.
///
/// Labels are `"<id> (UTC±HH:MM)"` and entries are sorted ascending by
/// numeric offset.  Offsets are a snapshot of the supplied instant; they are
/// not refreshed across DST transitions.
pub fn build_catalog(now: &Zoned) -> Vec<CatalogEntry> {
    let ts = now.timestamp();
    let mut entries: Vec<CatalogEntry> = tz::db()
        .available()
        .filter_map(|name| {
            let id = name.to_string();
            let tz = tz::db().get(&id).ok()?;
            let offset_minutes = tz.to_offset(ts).seconds() / 60;
            Some(CatalogEntry {
                label: offset_label(&id, offset_minutes),
                id,
                offset_minutes,
            })
        })
        .collect();
    // sort_by_key is stable, so ties keep database iteration order
    entries.sort_by_key(|e| e.offset_minutes);
    entries
}

fn offset_label(id: &str, offset_minutes: i32) -> String {
    let sign = if offset_minutes >= 0 { '+' } else { '-' };
    format!(
        "{} (UTC{}{:02}:{:02})",
        id,
        sign,
        offset_minutes.abs() / 60,
        offset_minutes.abs() % 60
    )
}

#[cfg(test)]
mod tests {
    use jiff::Zoned;

    use crate::catalog::{build_catalog, offset_label};

    #[test]
    fn test_offset_label() {
        assert_eq!(offset_label("UTC", 0), "UTC (UTC+00:00)");
        assert_eq!(
            offset_label("Europe/Berlin", 60),
            "Europe/Berlin (UTC+01:00)"
        );
        assert_eq!(
            offset_label("Asia/Kolkata", 330),
            "Asia/Kolkata (UTC+05:30)"
        );
        assert_eq!(
            offset_label("America/New_York", -300),
            "America/New_York (UTC-05:00)"
        );
        assert_eq!(
            offset_label("America/St_Johns", -210),
            "America/St_Johns (UTC-03:30)"
        );
    }

    #[test]
    fn test_catalog_sorted_by_offset() {
        let now = "2024-01-15T00:00:00[UTC]".parse::<Zoned>().unwrap();
        let catalog = build_catalog(&now);
        assert!(!catalog.is_empty());
        for pair in catalog.windows(2) {
            assert!(pair[0].offset_minutes <= pair[1].offset_minutes);
        }
    }

    #[test]
    fn test_catalog_labels_match_offsets() {
        let now = "2024-01-15T00:00:00[UTC]".parse::<Zoned>().unwrap();
        for entry in build_catalog(&now) {
            let expected = offset_label(&entry.id, entry.offset_minutes);
            assert_eq!(entry.label, expected);
            let sign = if entry.offset_minutes >= 0 { '+' } else { '-' };
            assert!(entry.label.contains(&format!("(UTC{}", sign)));
        }
    }

    #[test]
    fn test_known_winter_offsets() {
        // mid-January, so neither zone observes DST
        let now = "2024-01-15T00:00:00[UTC]".parse::<Zoned>().unwrap();
        let catalog = build_catalog(&now);
        let berlin = catalog.iter().find(|e| e.id == "Europe/Berlin").unwrap();
        assert_eq!(berlin.offset_minutes, 60);
        assert_eq!(berlin.label, "Europe/Berlin (UTC+01:00)");
        let ny = catalog.iter().find(|e| e.id == "America/New_York").unwrap();
        assert_eq!(ny.offset_minutes, -300);
    }
}
