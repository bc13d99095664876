use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{BestGoal, DataPoint, DataSeries, TrendSummary, Widget};
use crate::trend::{self, ValidationError};

pub const INVALID_DATA_PREFIX: &str = "INVALID_DATA: -->";
pub const INVALID_DATA_SUFFIX: &str = "<--";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WidgetError {
    #[error("title {0:?} does not produce a usable slug")]
    EmptySlug(String),
}

pub struct NewWidget {
    pub title: String,
    pub title_info: String,
    pub best_goal: BestGoal,
    pub data_points: String,
    pub max_data_points_count: Option<i32>,
    pub key_label: String,
    pub value_label: String,
    pub data_contact_name: String,
    pub data_contact_email_address: String,
    pub more_info_url: String,
}

impl Widget {
    /// Builds a widget and computes its summary. Invalid data points still
    /// produce a widget, tagged for a degraded save.
    pub fn new(input: NewWidget) -> Result<Self, WidgetError> {
        let slug = slugify(&input.title);
        if slug.is_empty() {
            return Err(WidgetError::EmptySlug(input.title));
        }

        let mut widget = Widget {
            id: Uuid::new_v4(),
            slug,
            title: input.title,
            title_info: input.title_info,
            baseline_value: None,
            baseline_info: String::new(),
            best_goal: input.best_goal,
            best_value: None,
            best_value_info: String::new(),
            current_value: None,
            current_value_info: String::new(),
            trend_direction: None,
            trend_color: None,
            trend_info: String::new(),
            data_points: String::new(),
            max_data_points_count: input.max_data_points_count,
            key_label: input.key_label,
            value_label: input.value_label,
            data_contact_name: input.data_contact_name,
            data_contact_email_address: input.data_contact_email_address,
            more_info_url: input.more_info_url,
            active: true,
        };
        let _ = widget.set_data_points(input.data_points);
        Ok(widget)
    }

    /// Replaces the raw series and recomputes every derived field.
    pub fn set_data_points(&mut self, raw: impl Into<String>) -> Result<TrendSummary, ValidationError> {
        self.data_points = raw.into();
        self.refresh_summary()
    }

    /// On failure the widget keeps its raw data behind the invalid-data marker
    /// and all derived fields are cleared; it is still meant to be saved.
    pub fn refresh_summary(&mut self) -> Result<TrendSummary, ValidationError> {
        let raw = strip_invalid_marker(&self.data_points).to_string();
        match trend::summarize(&raw, self.best_goal) {
            Ok(summary) => {
                debug!(slug = %self.slug, ?summary, "recomputed widget summary");
                self.data_points = raw;
                self.apply_summary(Some(summary));
                Ok(summary)
            }
            Err(err) => {
                warn!(slug = %self.slug, error = %err, "widget data points are invalid");
                self.data_points = format!("{INVALID_DATA_PREFIX}{raw}{INVALID_DATA_SUFFIX}");
                self.apply_summary(None);
                Err(err)
            }
        }
    }

    /// Appends points and recomputes. A series tagged only because it was too
    /// short is extended; an empty one is replaced by the new points. Stored
    /// text that cannot be parsed stays tagged and the points are dropped.
    pub fn append_points(&mut self, points: Vec<DataPoint>) -> Result<TrendSummary, ValidationError> {
        let series = match trend::parse_series(strip_invalid_marker(&self.data_points)) {
            Ok(mut series) => {
                for point in points {
                    series.push(point);
                }
                Some(series)
            }
            Err(ValidationError::EmptySeries) => DataSeries::from_points(points),
            Err(_) => None,
        };

        if let Some(series) = series {
            self.data_points = series.to_json();
        }
        self.refresh_summary()
    }

    pub fn has_invalid_data(&self) -> bool {
        self.data_points.starts_with(INVALID_DATA_PREFIX)
    }

    fn apply_summary(&mut self, summary: Option<TrendSummary>) {
        self.baseline_value = summary.map(|s| s.baseline_value);
        self.best_value = summary.map(|s| s.best_value);
        self.current_value = summary.map(|s| s.current_value);
        self.trend_direction = summary.map(|s| s.trend_direction);
        self.trend_color = summary.map(|s| s.trend_color);
    }

    /// Pretty-printed export with sorted keys.
    pub fn to_json(&self, request_url: &str, now: DateTime<Utc>) -> serde_json::Result<String> {
        let document = json!({
            "data_main": {
                "title": self.title,
                "slug": self.slug,
                "data_points": self.data_points,
                "key_label": self.key_label,
                "value_label": self.value_label,
                "data_contact_name": self.data_contact_name,
                "data_contact_email_address": self.data_contact_email_address,
                "more_info_url": self.more_info_url,
            },
            "data_other": {
                "title_info": self.title_info,
                "baseline_value": self.baseline_value,
                "baseline_info": self.baseline_info,
                "best_goal": self.best_goal.code(),
                "best_value": self.best_value,
                "best_value_info": self.best_value_info,
                "current_value": self.current_value,
                "current_value_info": self.current_value_info,
                "trend_direction": self.trend_direction.map(|d| d.code()),
                "trend_color": self.trend_color.map(|c| c.code()),
                "max_data_points_count": self.max_data_points_count,
            },
            "request_datetime": now.to_rfc3339_opts(SecondsFormat::Micros, true),
            "request_url": request_url,
        });
        serde_json::to_string_pretty(&document)
    }
}

fn strip_invalid_marker(raw: &str) -> &str {
    raw.strip_prefix(INVALID_DATA_PREFIX)
        .and_then(|inner| inner.strip_suffix(INVALID_DATA_SUFFIX))
        .unwrap_or(raw)
}

/// Lowercase ascii slug: common accented letters are folded to ascii, other
/// characters are dropped and whitespace runs collapse into one hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
        } else if let Some(folded) = fold_to_ascii(ch) {
            slug.push_str(folded);
        } else if (ch.is_whitespace() || ch == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn fold_to_ascii(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ß' => "ss",
        'ś' | 'š' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TrendColor, TrendDirection};
    use chrono::TimeZone;

    fn sample_widget(data_points: &str) -> Widget {
        Widget::new(NewWidget {
            title: "Missing Books".to_string(),
            title_info: "Items reported missing per month".to_string(),
            best_goal: BestGoal::Lower,
            data_points: data_points.to_string(),
            max_data_points_count: Some(12),
            key_label: "Month".to_string(),
            value_label: "Items".to_string(),
            data_contact_name: "Avery Lee".to_string(),
            data_contact_email_address: "avery_lee@brown.edu".to_string(),
            more_info_url: String::new(),
        })
        .expect("sample title has a slug")
    }

    fn point(label: &str, value: i64) -> DataPoint {
        DataPoint {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn new_widget_computes_summary() {
        let widget = sample_widget(r#"[{"Jan":40},{"Feb":32},{"Mar":35}]"#);
        assert_eq!(widget.slug, "missing-books");
        assert_eq!(widget.baseline_value, Some(40));
        assert_eq!(widget.best_value, Some(32));
        assert_eq!(widget.current_value, Some(35));
        assert_eq!(widget.trend_direction, Some(TrendDirection::Up));
        assert_eq!(widget.trend_color, Some(TrendColor::Bad));
        assert!(!widget.has_invalid_data());
    }

    #[test]
    fn invalid_data_is_tagged_and_summary_cleared() {
        let mut widget = sample_widget(r#"[{"Jan":40},{"Feb":32}]"#);
        let err = widget.set_data_points(r#"[{"Jan":40}]"#);
        assert_eq!(err, Err(ValidationError::TooShortForTrend { len: 1 }));
        assert_eq!(widget.data_points, r#"INVALID_DATA: -->[{"Jan":40}]<--"#);
        assert!(widget.has_invalid_data());
        assert_eq!(widget.baseline_value, None);
        assert_eq!(widget.best_value, None);
        assert_eq!(widget.current_value, None);
        assert_eq!(widget.trend_direction, None);
        assert_eq!(widget.trend_color, None);
    }

    #[test]
    fn retagging_does_not_nest_marker() {
        let mut widget = sample_widget("garbage");
        assert!(widget.refresh_summary().is_err());
        assert_eq!(widget.data_points, "INVALID_DATA: -->garbage<--");
    }

    #[test]
    fn fixing_data_clears_marker() {
        let mut widget = sample_widget("garbage");
        assert!(widget.set_data_points(r#"[{"Jan":1},{"Feb":1}]"#).is_ok());
        assert_eq!(widget.data_points, r#"[{"Jan":1},{"Feb":1}]"#);
        assert_eq!(widget.trend_color, Some(TrendColor::NotApplicable));
    }

    #[test]
    fn append_points_recomputes() {
        let mut widget = sample_widget(r#"[{"Jan":40},{"Feb":32}]"#);
        let summary = widget.append_points(vec![point("Mar", 12)]).unwrap();
        assert_eq!(summary.best_value, 12);
        assert_eq!(widget.data_points, r#"[{"Jan":40},{"Feb":32},{"Mar":12}]"#);
        assert_eq!(widget.trend_color, Some(TrendColor::Good));
    }

    #[test]
    fn append_extends_single_month_widget() {
        let mut widget = sample_widget(r#"[{"Jan":10}]"#);
        assert!(widget.has_invalid_data());

        let summary = widget.append_points(vec![point("Feb", 20)]).unwrap();
        assert_eq!(summary.baseline_value, 10);
        assert_eq!(summary.current_value, 20);
        assert_eq!(summary.trend_direction, TrendDirection::Up);
        assert_eq!(widget.data_points, r#"[{"Jan":10},{"Feb":20}]"#);
        assert!(!widget.has_invalid_data());
        assert_eq!(widget.current_value, Some(20));
    }

    #[test]
    fn append_single_point_to_empty_series_stays_tagged() {
        let mut widget = sample_widget("[]");
        let err = widget.append_points(vec![point("Jan", 5)]).unwrap_err();
        assert_eq!(err, ValidationError::TooShortForTrend { len: 1 });
        assert_eq!(widget.data_points, r#"INVALID_DATA: -->[{"Jan":5}]<--"#);

        assert!(widget.append_points(vec![point("Feb", 4)]).is_ok());
        assert_eq!(widget.data_points, r#"[{"Jan":5},{"Feb":4}]"#);
    }

    #[test]
    fn append_to_unparseable_series_keeps_it_tagged() {
        let mut widget = sample_widget("garbage");
        let err = widget.append_points(vec![point("Jan", 5), point("Feb", 6)]);
        assert!(matches!(err, Err(ValidationError::Malformed(_))));
        assert_eq!(widget.data_points, "INVALID_DATA: -->garbage<--");
        assert_eq!(widget.current_value, None);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Gate Count -- Rockefeller "), "gate-count-rockefeller");
        assert_eq!(slugify("ILL Requests (2024)"), "ill-requests-2024");
    }

    #[test]
    fn slugify_folds_accented_letters() {
        assert_eq!(slugify("Über Stats"), "uber-stats");
        assert_eq!(slugify("Café Señora Straße"), "cafe-senora-strasse");
    }

    #[test]
    fn rejects_title_without_slug() {
        assert_eq!(slugify("!!!"), "");
        let result = Widget::new(NewWidget {
            title: "!!!".to_string(),
            title_info: String::new(),
            best_goal: BestGoal::Higher,
            data_points: r#"[{"Jan":1},{"Feb":2}]"#.to_string(),
            max_data_points_count: None,
            key_label: "Month".to_string(),
            value_label: "Count".to_string(),
            data_contact_name: "Avery Lee".to_string(),
            data_contact_email_address: "avery_lee@brown.edu".to_string(),
            more_info_url: String::new(),
        });
        assert_eq!(result, Err(WidgetError::EmptySlug("!!!".to_string())));
    }

    #[test]
    fn json_export_has_both_sections() {
        let widget = sample_widget(r#"[{"Jan":40},{"Feb":32}]"#);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let output = widget.to_json("http://localhost/dashboard/missing-books.json", now).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["data_main"]["slug"], "missing-books");
        assert_eq!(parsed["data_other"]["best_goal"], -1);
        assert_eq!(parsed["data_other"]["trend_direction"], -1);
        assert_eq!(parsed["data_other"]["trend_color"], 1);
        assert_eq!(parsed["data_other"]["max_data_points_count"], 12);
        assert_eq!(parsed["request_url"], "http://localhost/dashboard/missing-books.json");
        assert!(parsed["request_datetime"].as_str().unwrap().starts_with("2026-03-01T12:00:00"));
    }

    #[test]
    fn json_export_nulls_unset_fields() {
        let widget = sample_widget("[]");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&widget.to_json("", now).unwrap()).unwrap();
        assert!(parsed["data_other"]["baseline_value"].is_null());
        assert!(parsed["data_other"]["trend_color"].is_null());
    }
}
