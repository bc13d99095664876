use serde::Serialize;
use uuid::Uuid;

/// Which end of the scale counts as "best" for a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BestGoal {
    Higher,
    Lower,
}

impl BestGoal {
    pub fn code(self) -> i32 {
        match self {
            BestGoal::Higher => 1,
            BestGoal::Lower => -1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(BestGoal::Higher),
            -1 => Some(BestGoal::Lower),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BestGoal::Higher => "Higher",
            BestGoal::Lower => "Lower",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn code(self) -> i32 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
            TrendDirection::Flat => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(TrendDirection::Up),
            -1 => Some(TrendDirection::Down),
            0 => Some(TrendDirection::Flat),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendColor {
    Good,
    Bad,
    NotApplicable,
}

impl TrendColor {
    pub fn code(self) -> i32 {
        match self {
            TrendColor::Good => 1,
            TrendColor::Bad => -1,
            TrendColor::NotApplicable => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(TrendColor::Good),
            -1 => Some(TrendColor::Bad),
            0 => Some(TrendColor::NotApplicable),
            _ => None,
        }
    }

    /// Display color used on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            TrendColor::Good => "blue",
            TrendColor::Bad => "red",
            TrendColor::NotApplicable => "blank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    pub label: String,
    pub value: i64,
}

/// Chronologically ordered data points. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSeries {
    points: Vec<DataPoint>,
}

impl DataSeries {
    pub(crate) fn from_points(points: Vec<DataPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> &DataPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &DataPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    /// Serializes back to the stored form, `[{"label": value}, ...]`.
    pub fn to_json(&self) -> String {
        let entries: Vec<serde_json::Value> = self
            .points
            .iter()
            .map(|point| {
                let mut entry = serde_json::Map::new();
                entry.insert(point.label.clone(), serde_json::Value::from(point.value));
                serde_json::Value::Object(entry)
            })
            .collect();
        serde_json::Value::Array(entries).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendSummary {
    pub baseline_value: i64,
    pub best_value: i64,
    pub current_value: i64,
    pub trend_direction: TrendDirection,
    pub trend_color: TrendColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub title_info: String,
    pub baseline_value: Option<i64>,
    pub baseline_info: String,
    pub best_goal: BestGoal,
    pub best_value: Option<i64>,
    pub best_value_info: String,
    pub current_value: Option<i64>,
    pub current_value_info: String,
    pub trend_direction: Option<TrendDirection>,
    pub trend_color: Option<TrendColor>,
    pub trend_info: String,
    pub data_points: String,
    pub max_data_points_count: Option<i32>,
    pub key_label: String,
    pub value_label: String,
    pub data_contact_name: String,
    pub data_contact_email_address: String,
    pub more_info_url: String,
    pub active: bool,
}

/// Normalized user details kept in the session after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
    pub patron_barcode: String,
}
