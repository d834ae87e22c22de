use jiff::civil::DateTime;
use jiff::{Timestamp, ToSpan, Zoned};
use log::warn;
use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::store::{Load, PreferenceStore, StoreError};

/// Assumed tooltip box used for viewport clamping.  The real rendered box may
/// differ; the original widget makes the same assumption.
pub const TOOLTIP_WIDTH: f64 = 260.0;
pub const TOOLTIP_HEIGHT: f64 = 200.0;
pub const TOOLTIP_SPACING: f64 = 10.0;

/// The tooltip hides only after both hover flags stay false this long.
pub const HIDE_DELAY_MS: i64 = 100;

const INPUT_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_FMT: &str = "%b %e, %Y, %I:%M %p";

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("cannot parse '{input}' as yyyy-MM-dd HH:mm:ss: {source}")]
    BadDateTime { input: String, source: jiff::Error },
    #[error("unknown timezone '{zone}': {source}")]
    BadZone { zone: String, source: jiff::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub left: f64,
    pub top: f64,
}

/// Viewport dimensions and scroll offsets at the moment of placement.  The
/// tooltip is not repositioned on later resize or scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

/// Style overrides keyed by UI region.  Values are opaque to this crate and
/// passed through to whatever renders the widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styles {
    pub container: Option<String>,
    pub tooltip: Option<String>,
    pub tooltip_header: Option<String>,
    pub dialog_overlay: Option<String>,
    pub dialog_box: Option<String>,
    pub checkbox_label: Option<String>,
    pub button: Option<String>,
}

/// Tooltip origin in document coordinates for a pointer position, clamped so
/// the assumed tooltip box stays inside the viewport.
pub fn tooltip_position(pointer: Point, viewport: &Viewport) -> Point {
    let mut left = pointer.left;
    let mut top = pointer.top;
    if left + TOOLTIP_WIDTH > viewport.width {
        left = viewport.width - TOOLTIP_WIDTH - TOOLTIP_SPACING;
    }
    if top + TOOLTIP_HEIGHT > viewport.height {
        top = viewport.height - TOOLTIP_HEIGHT - TOOLTIP_SPACING;
    }
    Point {
        left: left + viewport.scroll_x + TOOLTIP_SPACING,
        top: top + viewport.scroll_y + TOOLTIP_SPACING,
    }
}

/// One settings dialog row: catalog entry plus its checked state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry<'a> {
    pub entry: &'a CatalogEntry,
    pub checked: bool,
}

/// Headless multi-timezone viewer.  Holds the parsed base time and all
/// display state; the host feeds it pointer/dialog events and renders from
/// its accessors.
pub struct Viewer<S: PreferenceStore> {
    base_time: Zoned,
    store: S,
    styles: Styles,
    zones: Vec<String>,
    show_tooltip: bool,
    tooltip_pos: Point,
    show_dialog: bool,
    hovering_text: bool,
    hovering_tooltip: bool,
    hide_deadline: Option<Timestamp>,
}

impl<S: PreferenceStore> Viewer<S> {
    /// Parse the base timestamp in its source zone.  The backend (local or
    /// relay) is chosen here, once; nothing downstream branches on it.
    pub fn new(
        datetime: &str,
        zone: &str,
        store: S,
        styles: Styles,
    ) -> Result<Viewer<S>, ViewerError> {
        let dt = DateTime::strptime(INPUT_FMT, datetime).map_err(|source| {
            ViewerError::BadDateTime {
                input: datetime.to_string(),
                source,
            }
        })?;
        let base_time = dt.in_tz(zone).map_err(|source| ViewerError::BadZone {
            zone: zone.to_string(),
            source,
        })?;
        Ok(Viewer {
            base_time,
            store,
            styles,
            zones: Vec::new(),
            show_tooltip: false,
            tooltip_pos: Point::default(),
            show_dialog: false,
            hovering_text: false,
            hovering_tooltip: false,
            hide_deadline: None,
        })
    }

    /// Ask the store for the active list.  A relay backend answers `Pending`
    /// and the list stays empty until the host forwards the reply through
    /// [`Viewer::set_zones`].
    pub fn mount(&mut self) -> Result<(), ViewerError> {
        match self.store.load()? {
            Load::Ready(zones) => self.zones = zones,
            Load::Pending => {}
        }
        Ok(())
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    /// Replace the active list without saving, e.g. when a relay reply lands.
    pub fn set_zones(&mut self, zones: Vec<String>) {
        self.zones = zones;
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }

    pub fn show_tooltip(&self) -> bool {
        self.show_tooltip
    }

    pub fn tooltip_pos(&self) -> Point {
        self.tooltip_pos
    }

    pub fn show_dialog(&self) -> bool {
        self.show_dialog
    }

    /// Formatted base time shown on the trigger element.
    pub fn trigger_text(&self) -> String {
        self.base_time.strftime(DISPLAY_FMT).to_string()
    }

    /// `(zone id, converted time)` rows in preference order.  Ids the tz
    /// database does not know are skipped.
    pub fn tooltip_rows(&self) -> Vec<(String, String)> {
        self.zones
            .iter()
            .filter_map(|zone| match self.base_time.in_tz(zone) {
                Ok(converted) => {
                    Some((zone.clone(), converted.strftime(DISPLAY_FMT).to_string()))
                }
                Err(e) => {
                    warn!("skipping unknown timezone '{}' in preference list: {}", zone, e);
                    None
                }
            })
            .collect()
    }

    /// Catalog rows for the settings dialog with their checked state.
    pub fn dialog_entries<'a>(&self, catalog: &'a [CatalogEntry]) -> Vec<DialogEntry<'a>> {
        catalog
            .iter()
            .map(|entry| DialogEntry {
                checked: self.zones.iter().any(|z| *z == entry.id),
                entry,
            })
            .collect()
    }

    pub fn pointer_enter_text(&mut self, pointer: Point, viewport: &Viewport) {
        self.hovering_text = true;
        self.hide_deadline = None;
        self.tooltip_pos = tooltip_position(pointer, viewport);
        self.show_tooltip = true;
    }

    pub fn pointer_leave_text(&mut self, now: Timestamp) {
        self.hovering_text = false;
        self.arm_hide(now);
    }

    pub fn pointer_enter_tooltip(&mut self) {
        self.hovering_tooltip = true;
        self.hide_deadline = None;
    }

    pub fn pointer_leave_tooltip(&mut self, now: Timestamp) {
        self.hovering_tooltip = false;
        self.arm_hide(now);
    }

    // slight delay helps avoid flicker when crossing the gap between the
    // trigger and the tooltip
    fn arm_hide(&mut self, now: Timestamp) {
        if !self.hovering_text && !self.hovering_tooltip {
            // infallible: saturating_add only errors for span units above hours
            self.hide_deadline = Some(now.saturating_add(HIDE_DELAY_MS.milliseconds()).unwrap());
        }
    }

    /// Drive the debounced hide.  The tooltip disappears only if both hover
    /// flags stayed false through the whole delay.
    pub fn tick(&mut self, now: Timestamp) {
        if let Some(deadline) = self.hide_deadline {
            if now >= deadline && !self.hovering_text && !self.hovering_tooltip {
                self.show_tooltip = false;
                self.hide_deadline = None;
            }
        }
    }

    /// Gear affordance in the tooltip header.
    pub fn open_dialog(&mut self) {
        self.show_dialog = true;
        self.show_tooltip = false;
    }

    pub fn close_dialog(&mut self) {
        self.show_dialog = false;
    }

    /// Clicking the full-screen overlay closes the dialog.
    pub fn overlay_click(&mut self) {
        self.close_dialog();
    }

    /// Clicks inside the dialog box stop propagation and do nothing.
    pub fn dialog_click(&mut self) {}

    /// Checkbox toggle: append an absent id at the end, or remove exactly
    /// that id keeping the rest in order.  Saves immediately, there is no
    /// apply step.
    pub fn toggle_zone(&mut self, id: &str) -> Result<(), ViewerError> {
        let zones: Vec<String> = if self.zones.iter().any(|z| z == id) {
            self.zones.iter().filter(|z| *z != id).cloned().collect()
        } else {
            let mut zones = self.zones.clone();
            zones.push(id.to_string());
            zones
        };
        self.store.save(&zones)?;
        self.zones = zones;
        Ok(())
    }
}
