//! Style descriptors handed to the renderer.
//!
//! Values are CSS-shaped (`em` offsets, `grid-row`/`grid-column` spans) but
//! the engine never renders them itself.

use serde::Serialize;

use super::day::Day;
use super::label::Label;
use super::month::Month;
use crate::config::LayoutOrientation;

/// Gap kept between the day edge and the first bar.
pub const LABEL_INSET_EM: f32 = 0.5;

/// Side a label offset or day margin applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Right,
    Bottom,
}

impl Side {
    fn for_orientation(orientation: LayoutOrientation) -> Self {
        match orientation {
            LayoutOrientation::Column => Side::Right,
            LayoutOrientation::List => Side::Bottom,
        }
    }
}

/// Grid line spans for a bar: one month wide along the main axis, the
/// covered days along the cross axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSpan {
    /// `grid-column` in column layout, `grid-row` in list layout.
    pub main_axis: &'static str,
    pub main: String,
    pub cross_axis: &'static str,
    pub cross: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub border_first: bool,
    pub border_last: bool,
    /// Offset of a bar from the day edge, in em.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<(Side, f32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<GridSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayStyle {
    pub weekend: bool,
    pub today: bool,
    /// `offsetN` on the first day of an aligned month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_class: Option<String>,
    /// Room reserved for the bars crossing this day, in em.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<(Side, f32)>,
}

/// Style for a multi-day bar (`bar = true`) or a day-local label.
pub fn label_style(
    month: &Month,
    label: &Label,
    bar: bool,
    orientation: LayoutOrientation,
    slot_height_em: f32,
) -> LabelStyle {
    let colour = &label.event().colour;
    let mut style = LabelStyle {
        color: colour.text.clone(),
        background_color: colour.background.clone(),
        border_first: label.is_first_segment(),
        border_last: label.is_last_segment(),
        offset: None,
        span: None,
    };
    if !bar {
        return style;
    }

    let slot = label.slot().unwrap_or(0);
    style.offset = Some((
        Side::for_orientation(orientation),
        LABEL_INSET_EM + slot_height_em * slot as f32,
    ));

    let (main_axis, cross_axis) = match orientation {
        LayoutOrientation::Column => ("grid-column", "grid-row"),
        LayoutOrientation::List => ("grid-row", "grid-column"),
    };
    style.span = Some(GridSpan {
        main_axis,
        main: format!("{} / span 1", month.id()),
        cross_axis,
        cross: format!(
            "{} / span {}",
            month.offset() + label.start_day() + 2,
            label.span()
        ),
    });
    style
}

pub fn day_style(
    month: &Month,
    day: &Day,
    orientation: LayoutOrientation,
    slot_height_em: f32,
) -> DayStyle {
    DayStyle {
        weekend: day.is_weekend(),
        today: day.is_today(),
        offset_class: (day.index() == 0).then(|| format!("offset{}", month.offset())),
        margin: day.deepest_slot().map(|slot| {
            (
                Side::for_orientation(orientation),
                (slot + 1) as f32 * slot_height_em + LABEL_INSET_EM,
            )
        }),
    }
}

/// `grid-template-areas` naming every month of the page.
pub fn grid_areas(months: &[Month], orientation: LayoutOrientation) -> String {
    match orientation {
        LayoutOrientation::Column => {
            let ids: Vec<String> = months.iter().map(Month::id).collect();
            format!("\"{}\"", ids.join(" "))
        }
        LayoutOrientation::List => months
            .iter()
            .map(|m| format!("\"{}\"", m.id()))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
