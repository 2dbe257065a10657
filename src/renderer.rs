//! ASCII month calendar for terminal output.

use crate::calendar::MonthRecord;
use crate::phase::PhaseCategory;
use chrono::{DateTime, Datelike, Utc};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Width of one day cell, including its trailing space.
const CELL_WIDTH: usize = 5;

fn day_list(dates: &[DateTime<Utc>]) -> String {
    if dates.is_empty() {
        return "-".to_string();
    }
    dates
        .iter()
        .map(|d| d.day().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a month as a Monday-first grid: each cell holds the day number and
/// the phase glyph, followed by a legend of the cardinal phases.
pub fn render_month(month: &MonthRecord) -> String {
    let name = MONTH_NAMES.get(month.month as usize).copied().unwrap_or("?");
    let width = CELL_WIDTH * 7;
    let mut out = String::new();

    out.push_str(&format!("{:^width$}\n", format!("{name} {}", month.year)));
    for weekday in ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"] {
        out.push_str(&format!("{weekday:^4} "));
    }
    out.push('\n');

    // Blank cells until the first weekday
    let lead = month
        .days
        .first()
        .map(|d| d.date.weekday().num_days_from_monday() as usize)
        .unwrap_or(0);
    let mut column = lead;
    out.push_str(&" ".repeat(lead * CELL_WIDTH));

    for day in &month.days {
        out.push_str(&format!("{:>2}{}  ", day.date.day(), day.phase_category.glyph()));
        column += 1;
        if column == 7 {
            out.push('\n');
            column = 0;
        }
    }
    if column != 0 {
        out.push('\n');
    }

    out.push('\n');
    let legend = [
        (PhaseCategory::NewMoon, "New moon", &month.new_moons),
        (PhaseCategory::FirstQuarter, "First quarter", &month.first_quarters),
        (PhaseCategory::FullMoon, "Full moon", &month.full_moons),
        (PhaseCategory::LastQuarter, "Last quarter", &month.last_quarters),
    ];
    for (category, label, dates) in legend {
        out.push_str(&format!("{} {label:<14}{}\n", category.glyph(), day_list(dates)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{month_info, DaySettings};
    use crate::ephemeris::MeeusProvider;
    use crate::riseset::Observer;

    fn january_2025() -> MonthRecord {
        let observer = Observer::new(52.52, 13.405, 0.0).unwrap();
        month_info(&MeeusProvider, 2025, 0, &observer, &DaySettings::default()).unwrap()
    }

    #[test]
    fn test_ascii_rendering() {
        let text = render_month(&january_2025());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("January 2025"));
        assert!(lines[1].starts_with(" Mo "));

        // 1 Jan 2025 was a Wednesday: two blank cells before it
        assert!(lines[2].starts_with(&" ".repeat(2 * CELL_WIDTH)));
        assert!(lines[2].contains(" 1●"));
        assert!(text.contains("31"));
    }

    #[test]
    fn test_legend_lists_cardinal_days() {
        let month = january_2025();
        let text = render_month(&month);
        let full_line = text.lines().find(|l| l.contains("Full moon")).unwrap();
        assert!(full_line.contains("13"));
        let new_line = text.lines().find(|l| l.contains("New moon")).unwrap();
        assert!(new_line.contains("29"));
    }

    #[test]
    fn test_empty_list_renders_dash() {
        assert_eq!(day_list(&[]), "-");
    }
}
