use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::models::{BestGoal, DataPoint, TrendColor, TrendDirection, Widget};
use crate::widget::NewWidget;

const WIDGET_COLUMNS: &str = "id, title, slug, title_info, baseline_value, baseline_info, \
     best_goal, best_value, best_value_info, current_value, current_value_info, \
     trend_direction, trend_color, trend_info, data_points, max_data_points_count, \
     key_label, value_label, data_contact_name, data_contact_email_address, \
     more_info_url, active";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let widgets = vec![
        (
            "Gate Count",
            "Visitors entering the Rockefeller Library",
            BestGoal::Higher,
            r#"[{"Jan_2026": 31200}, {"Feb_2026": 35480}, {"Mar_2026": 33910}]"#,
            "Month",
            "Visitors",
        ),
        (
            "Missing Books",
            "Items reported missing from the stacks",
            BestGoal::Lower,
            r#"[{"Jan_2026": 42}, {"Feb_2026": 37}, {"Mar_2026": 29}]"#,
            "Month",
            "Items",
        ),
        (
            "ILL Requests",
            "Interlibrary loan requests filled",
            BestGoal::Higher,
            r#"[{"Jan_2026": 812}, {"Feb_2026": 812}]"#,
            "Month",
            "Requests",
        ),
    ];

    let mut saved = 0usize;
    for (title, title_info, best_goal, data_points, key_label, value_label) in widgets {
        let widget = Widget::new(NewWidget {
            title: title.to_string(),
            title_info: title_info.to_string(),
            best_goal,
            data_points: data_points.to_string(),
            max_data_points_count: Some(12),
            key_label: key_label.to_string(),
            value_label: value_label.to_string(),
            data_contact_name: "Library Assessment".to_string(),
            data_contact_email_address: "assessment@brown.edu".to_string(),
            more_info_url: String::new(),
        })?;
        save_widget(pool, &widget).await?;
        saved += 1;
    }

    Ok(saved)
}

/// Inserts or fully overwrites a widget keyed by slug.
pub async fn save_widget(pool: &PgPool, widget: &Widget) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dashboard.widgets
        (id, title, slug, title_info, baseline_value, baseline_info,
         best_goal, best_value, best_value_info, current_value, current_value_info,
         trend_direction, trend_color, trend_info, data_points, max_data_points_count,
         key_label, value_label, data_contact_name, data_contact_email_address,
         more_info_url, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        ON CONFLICT (slug) DO UPDATE
        SET title = EXCLUDED.title,
            title_info = EXCLUDED.title_info,
            baseline_value = EXCLUDED.baseline_value,
            baseline_info = EXCLUDED.baseline_info,
            best_goal = EXCLUDED.best_goal,
            best_value = EXCLUDED.best_value,
            best_value_info = EXCLUDED.best_value_info,
            current_value = EXCLUDED.current_value,
            current_value_info = EXCLUDED.current_value_info,
            trend_direction = EXCLUDED.trend_direction,
            trend_color = EXCLUDED.trend_color,
            trend_info = EXCLUDED.trend_info,
            data_points = EXCLUDED.data_points,
            max_data_points_count = EXCLUDED.max_data_points_count,
            key_label = EXCLUDED.key_label,
            value_label = EXCLUDED.value_label,
            data_contact_name = EXCLUDED.data_contact_name,
            data_contact_email_address = EXCLUDED.data_contact_email_address,
            more_info_url = EXCLUDED.more_info_url,
            active = EXCLUDED.active,
            updated_at = now()
        "#,
    )
    .bind(widget.id)
    .bind(&widget.title)
    .bind(&widget.slug)
    .bind(&widget.title_info)
    .bind(widget.baseline_value)
    .bind(&widget.baseline_info)
    .bind(widget.best_goal.code())
    .bind(widget.best_value)
    .bind(&widget.best_value_info)
    .bind(widget.current_value)
    .bind(&widget.current_value_info)
    .bind(widget.trend_direction.map(TrendDirection::code))
    .bind(widget.trend_color.map(TrendColor::code))
    .bind(&widget.trend_info)
    .bind(&widget.data_points)
    .bind(widget.max_data_points_count)
    .bind(&widget.key_label)
    .bind(&widget.value_label)
    .bind(&widget.data_contact_name)
    .bind(&widget.data_contact_email_address)
    .bind(&widget.more_info_url)
    .bind(widget.active)
    .execute(pool)
    .await
    .with_context(|| format!("failed to save widget {}", widget.slug))?;

    Ok(())
}

pub async fn fetch_widget(pool: &PgPool, slug: &str) -> anyhow::Result<Option<Widget>> {
    let query = format!("SELECT {WIDGET_COLUMNS} FROM dashboard.widgets WHERE slug = $1");
    let row = sqlx::query(&query).bind(slug).fetch_optional(pool).await?;
    row.as_ref().map(widget_from_row).transpose()
}

pub async fn fetch_widgets(pool: &PgPool, include_inactive: bool) -> anyhow::Result<Vec<Widget>> {
    let mut query = format!("SELECT {WIDGET_COLUMNS} FROM dashboard.widgets");
    if !include_inactive {
        query.push_str(" WHERE active");
    }
    query.push_str(" ORDER BY title");

    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(widget_from_row).collect()
}

fn widget_from_row(row: &PgRow) -> anyhow::Result<Widget> {
    let slug: String = row.get("slug");
    let best_goal_code: i32 = row.get("best_goal");
    let best_goal = BestGoal::from_code(best_goal_code)
        .with_context(|| format!("widget {slug} has unknown best_goal {best_goal_code}"))?;
    let trend_direction: Option<i32> = row.get("trend_direction");
    let trend_color: Option<i32> = row.get("trend_color");

    Ok(Widget {
        id: row.get("id"),
        title: row.get("title"),
        title_info: row.get("title_info"),
        baseline_value: row.get("baseline_value"),
        baseline_info: row.get("baseline_info"),
        best_goal,
        best_value: row.get("best_value"),
        best_value_info: row.get("best_value_info"),
        current_value: row.get("current_value"),
        current_value_info: row.get("current_value_info"),
        trend_direction: trend_direction.and_then(TrendDirection::from_code),
        trend_color: trend_color.and_then(TrendColor::from_code),
        trend_info: row.get("trend_info"),
        data_points: row.get("data_points"),
        max_data_points_count: row.get("max_data_points_count"),
        key_label: row.get("key_label"),
        value_label: row.get("value_label"),
        data_contact_name: row.get("data_contact_name"),
        data_contact_email_address: row.get("data_contact_email_address"),
        more_info_url: row.get("more_info_url"),
        active: row.get("active"),
        slug,
    })
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    slug: String,
    label: String,
    value: i64,
}

/// Groups rows by widget slug, keeping first-seen slug order and row order.
fn group_rows(rows: Vec<CsvRow>) -> Vec<(String, Vec<DataPoint>)> {
    let mut groups: Vec<(String, Vec<DataPoint>)> = Vec::new();
    for row in rows {
        let point = DataPoint {
            label: row.label,
            value: row.value,
        };
        match groups.iter_mut().find(|(slug, _)| *slug == row.slug) {
            Some((_, points)) => points.push(point),
            None => groups.push((row.slug, vec![point])),
        }
    }
    groups
}

/// Appends data points from a `slug,label,value` CSV. Returns the number appended.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = reader
        .deserialize::<CsvRow>()
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse data point rows")?;

    let mut appended = 0usize;
    for (slug, points) in group_rows(rows) {
        let Some(mut widget) = fetch_widget(pool, &slug).await? else {
            warn!(%slug, "skipping rows for unknown widget");
            continue;
        };
        let count = points.len();
        let result = widget.append_points(points);
        save_widget(pool, &widget).await?;
        if let Err(err) = result {
            warn!(%slug, error = %err, "saved widget with invalid data points");
            continue;
        }
        info!(%slug, count, "appended data points");
        appended += count;
    }

    Ok(appended)
}
