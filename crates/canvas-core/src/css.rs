//! CSS values the canvas understands: lengths, pins and layout keywords.
//!
//! Length parsing is built on `winnow` 0.7, the same way the document
//! parsers in this workspace are.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use winnow::combinator::{alt, opt};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

// ─── Lengths ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CssUnit {
    Px,
    Percent,
    Em,
    Rem,
    Vw,
    Vh,
}

impl CssUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CssUnit::Px => "px",
            CssUnit::Percent => "%",
            CssUnit::Em => "em",
            CssUnit::Rem => "rem",
            CssUnit::Vw => "vw",
            CssUnit::Vh => "vh",
        }
    }
}

/// A numeric CSS value with an optional unit. A bare number means pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CssNumber {
    pub value: f64,
    pub unit: Option<CssUnit>,
}

impl CssNumber {
    pub const fn px(value: f64) -> Self {
        Self { value, unit: None }
    }

    pub const fn percent(value: f64) -> Self {
        Self {
            value,
            unit: Some(CssUnit::Percent),
        }
    }

    /// Read a prop value: JSON numbers are pixels, strings are parsed.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(CssNumber::px),
            Value::String(s) => parse_css_number(s),
            _ => None,
        }
    }

    /// Unitless numbers become JSON numbers (integers when whole), anything
    /// with a unit becomes a string such as `"25%"`.
    pub fn to_json(&self) -> Value {
        match self.unit {
            None => number_to_json(self.value),
            Some(unit) => Value::String(format!("{}{}", format_number(self.value), unit.as_str())),
        }
    }

    /// Resolve to pixels. Percentages need the parent dimension; font- and
    /// viewport-relative units are not resolvable here.
    pub fn to_px(&self, parent_dimension: Option<f64>) -> Option<f64> {
        match self.unit {
            None | Some(CssUnit::Px) => Some(self.value),
            Some(CssUnit::Percent) => parent_dimension.map(|d| self.value / 100.0 * d),
            _ => None,
        }
    }

    /// Convert a pixel amount into this value's unit.
    pub fn px_in_same_unit(&self, px: f64, parent_dimension: Option<f64>) -> Option<CssNumber> {
        match self.unit {
            None | Some(CssUnit::Px) => Some(CssNumber {
                value: px,
                unit: self.unit,
            }),
            Some(CssUnit::Percent) => match parent_dimension {
                Some(d) if d != 0.0 => Some(CssNumber::percent(px / d * 100.0)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Whole numbers are written as integers so the emitted source stays tidy.
pub fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Parse `"12"`, `"12px"`, `"-4.5%"`, `"2rem"`. Keywords like `auto` are `None`.
pub fn parse_css_number(input: &str) -> Option<CssNumber> {
    let mut rest = input.trim();
    let parsed = css_number.parse_next(&mut rest).ok()?;
    if rest.trim().is_empty() {
        Some(parsed)
    } else {
        None
    }
}

fn css_number(input: &mut &str) -> ModalResult<CssNumber> {
    let value = parse_number.parse_next(input)?;
    let unit = opt(alt((
        "px".value(CssUnit::Px),
        "%".value(CssUnit::Percent),
        "rem".value(CssUnit::Rem),
        "em".value(CssUnit::Em),
        "vw".value(CssUnit::Vw),
        "vh".value(CssUnit::Vh),
    )))
    .parse_next(input)?;
    Ok(CssNumber { value, unit })
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let _ = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))
}

// ─── Pins ───────────────────────────────────────────────────────────────

/// One of the six directional offset/size properties of a positioned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinProp {
    Left,
    Top,
    Width,
    Height,
    Right,
    Bottom,
}

impl PinProp {
    pub const ALL: [PinProp; 6] = [
        PinProp::Left,
        PinProp::Top,
        PinProp::Width,
        PinProp::Height,
        PinProp::Right,
        PinProp::Bottom,
    ];

    pub const HORIZONTAL: [PinProp; 3] = [PinProp::Left, PinProp::Width, PinProp::Right];
    pub const VERTICAL: [PinProp; 3] = [PinProp::Top, PinProp::Height, PinProp::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            PinProp::Left => "left",
            PinProp::Top => "top",
            PinProp::Width => "width",
            PinProp::Height => "height",
            PinProp::Right => "right",
            PinProp::Bottom => "bottom",
        }
    }

    /// Pins resolved against the parent's width.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, PinProp::Left | PinProp::Width | PinProp::Right)
    }

    /// `right` and `bottom` grow towards the origin.
    pub fn direction(&self) -> f64 {
        match self {
            PinProp::Right | PinProp::Bottom => -1.0,
            _ => 1.0,
        }
    }

    /// The pin's value for a parent-local frame inside a parent of
    /// `parent_size` (`right`/`bottom` measure from the far edge).
    pub fn value_for_frame(&self, frame: &crate::geom::Rect, parent_size: (f64, f64)) -> f64 {
        match self {
            PinProp::Left => frame.x,
            PinProp::Top => frame.y,
            PinProp::Width => frame.width,
            PinProp::Height => frame.height,
            PinProp::Right => parent_size.0 - frame.right(),
            PinProp::Bottom => parent_size.1 - frame.bottom(),
        }
    }
}

// ─── Layout keywords ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    #[default]
    Row,
    RowReverse,
    Column,
    ColumnReverse,
}

impl FlexDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "row" => Some(Self::Row),
            "row-reverse" => Some(Self::RowReverse),
            "column" => Some(Self::Column),
            "column-reverse" => Some(Self::ColumnReverse),
            _ => None,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::RowReverse | Self::ColumnReverse)
    }

    /// The size pin along the main axis.
    pub fn main_size_pin(&self) -> PinProp {
        if self.is_horizontal() {
            PinProp::Width
        } else {
            PinProp::Height
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssPosition {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl CssPosition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "relative" => Some(Self::Relative),
            "absolute" => Some(Self::Absolute),
            "fixed" => Some(Self::Fixed),
            "sticky" => Some(Self::Sticky),
            _ => None,
        }
    }

    /// Removed from the parent's flow.
    pub fn is_out_of_flow(&self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

/// How an element lays out its in-flow children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSystem {
    #[default]
    Flow,
    Flex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_units() {
        assert_eq!(parse_css_number("12"), Some(CssNumber::px(12.0)));
        assert_eq!(
            parse_css_number("12px"),
            Some(CssNumber {
                value: 12.0,
                unit: Some(CssUnit::Px)
            })
        );
        assert_eq!(parse_css_number("-4.5%"), Some(CssNumber::percent(-4.5)));
        assert_eq!(
            parse_css_number("2rem").map(|n| n.unit),
            Some(Some(CssUnit::Rem))
        );
        assert_eq!(parse_css_number("auto"), None);
        assert_eq!(parse_css_number("10 px"), None);
    }

    #[test]
    fn json_roundtrip_keeps_integers() {
        assert_eq!(CssNumber::px(250.0).to_json(), json!(250));
        assert_eq!(CssNumber::px(0.5).to_json(), json!(0.5));
        assert_eq!(CssNumber::percent(25.0).to_json(), json!("25%"));
        assert_eq!(CssNumber::from_json(&json!("25%")), Some(CssNumber::percent(25.0)));
        assert_eq!(CssNumber::from_json(&json!(null)), None);
    }

    #[test]
    fn percent_conversions() {
        let pct = CssNumber::percent(50.0);
        assert_eq!(pct.to_px(Some(200.0)), Some(100.0));
        assert_eq!(pct.to_px(None), None);
        assert_eq!(
            pct.px_in_same_unit(50.0, Some(200.0)),
            Some(CssNumber::percent(25.0))
        );
    }

    #[test]
    fn pin_values_for_frame() {
        let frame = crate::geom::Rect::new(175.0, 0.0, 25.0, 25.0);
        assert_eq!(PinProp::Right.value_for_frame(&frame, (300.0, 300.0)), 100.0);
        assert_eq!(PinProp::Top.value_for_frame(&frame, (300.0, 300.0)), 0.0);
    }
}
