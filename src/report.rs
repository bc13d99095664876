use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::Widget;

pub fn build_report(generated_on: NaiveDate, widgets: &[Widget]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Library Dashboard Report");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Widgets");

    let (valid, invalid): (Vec<&Widget>, Vec<&Widget>) =
        widgets.iter().partition(|widget| !widget.has_invalid_data());

    if valid.is_empty() {
        let _ = writeln!(output, "No widgets with valid data.");
    } else {
        let _ = writeln!(
            output,
            "| Widget | Baseline | Best | Current | Trend | Goal |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for widget in valid {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} ({}) | {} |",
                widget.title,
                display(widget.baseline_value),
                display(widget.best_value),
                display(widget.current_value),
                widget.trend_direction.map_or("-", |d| d.label()),
                widget.trend_color.map_or("-", |c| c.label()),
                widget.best_goal.label(),
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if invalid.is_empty() {
        let _ = writeln!(output, "All widgets have valid data.");
    } else {
        for widget in invalid {
            let _ = writeln!(
                output,
                "- {} ({}): invalid data points, contact {} <{}>",
                widget.title,
                widget.slug,
                widget.data_contact_name,
                widget.data_contact_email_address
            );
        }
    }

    output
}

fn display(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
