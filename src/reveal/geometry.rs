//! Rectangles and CSS-style root margins.

use std::str::FromStr;
use thiserror::Error;

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Rect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn right(&self) -> f64 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.y + self.height
  }

  pub fn area(&self) -> f64 {
    self.width.max(0.0) * self.height.max(0.0)
  }

  /// Overlap of two rectangles. Rectangles that only touch still intersect,
  /// with zero area.
  pub fn intersection(&self, other: &Rect) -> Option<Rect> {
    let left = self.x.max(other.x);
    let top = self.y.max(other.y);
    let right = self.right().min(other.right());
    let bottom = self.bottom().min(other.bottom());

    if right < left || bottom < top {
      return None;
    }
    Some(Rect::new(left, top, right - left, bottom - top))
  }

  /// Grow (or shrink, for negative values) by a root margin.
  pub fn expand(&self, margin: &RootMargin) -> Rect {
    let top = margin.top.resolve(self.height);
    let right = margin.right.resolve(self.width);
    let bottom = margin.bottom.resolve(self.height);
    let left = margin.left.resolve(self.width);

    Rect::new(
      self.x - left,
      self.y - top,
      self.width + left + right,
      self.height + top + bottom,
    )
  }
}

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
  Px(f64),
  /// Percentage of the root's width (left/right) or height (top/bottom)
  Percent(f64),
}

impl MarginValue {
  fn resolve(&self, extent: f64) -> f64 {
    match self {
      MarginValue::Px(px) => *px,
      MarginValue::Percent(pct) => extent * pct / 100.0,
    }
  }
}

impl Default for MarginValue {
  fn default() -> Self {
    MarginValue::Px(0.0)
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid root margin '{0}': expected 1 to 4 values in px or %")]
pub struct RootMarginError(String);

/// Margin around the root, in CSS shorthand order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
  pub top: MarginValue,
  pub right: MarginValue,
  pub bottom: MarginValue,
  pub left: MarginValue,
}

impl FromStr for RootMargin {
  type Err = RootMarginError;

  /// Parse `"10px"`, `"10px 20px"`, `"10px 20px 30px"` or
  /// `"10px 20px 30px 40px"`. Bare `0` is accepted.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || RootMarginError(s.to_string());

    let values = s
      .split_whitespace()
      .map(|part| parse_margin_value(part).ok_or_else(invalid))
      .collect::<Result<Vec<_>, _>>()?;

    let (top, right, bottom, left) = match values.as_slice() {
      [all] => (*all, *all, *all, *all),
      [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
      [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
      [top, right, bottom, left] => (*top, *right, *bottom, *left),
      _ => return Err(invalid()),
    };

    Ok(RootMargin {
      top,
      right,
      bottom,
      left,
    })
  }
}

fn parse_margin_value(part: &str) -> Option<MarginValue> {
  if let Some(px) = part.strip_suffix("px") {
    return px.parse().ok().map(MarginValue::Px);
  }
  if let Some(pct) = part.strip_suffix('%') {
    return pct.parse().ok().map(MarginValue::Percent);
  }
  match part.parse::<f64>() {
    Ok(v) if v == 0.0 => Some(MarginValue::Px(0.0)),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_intersection() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(50.0, 80.0, 100.0, 100.0);
    assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 80.0, 50.0, 20.0)));

    let far = Rect::new(200.0, 200.0, 10.0, 10.0);
    assert_eq!(a.intersection(&far), None);
  }

  #[test]
  fn test_touching_edges_intersect_with_zero_area() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let below = Rect::new(0.0, 100.0, 100.0, 50.0);
    let overlap = a.intersection(&below).unwrap();
    assert_eq!(overlap.area(), 0.0);
  }

  #[test]
  fn test_parse_shorthand() {
    let m: RootMargin = "0px".parse().unwrap();
    assert_eq!(m, RootMargin::default());

    let m: RootMargin = "-50px 10%".parse().unwrap();
    assert_eq!(m.top, MarginValue::Px(-50.0));
    assert_eq!(m.bottom, MarginValue::Px(-50.0));
    assert_eq!(m.left, MarginValue::Percent(10.0));

    let m: RootMargin = "1px 2px 3px".parse().unwrap();
    assert_eq!(m.right, MarginValue::Px(2.0));
    assert_eq!(m.bottom, MarginValue::Px(3.0));
    assert_eq!(m.left, MarginValue::Px(2.0));

    let m: RootMargin = "1px 2px 3px 4px".parse().unwrap();
    assert_eq!(m.left, MarginValue::Px(4.0));

    let m: RootMargin = "0".parse().unwrap();
    assert_eq!(m, RootMargin::default());
  }

  #[test]
  fn test_parse_rejects_garbage() {
    assert!("".parse::<RootMargin>().is_err());
    assert!("10em".parse::<RootMargin>().is_err());
    assert!("5".parse::<RootMargin>().is_err());
    assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
  }

  #[test]
  fn test_expand_with_percent_and_negative() {
    let root = Rect::new(0.0, 0.0, 1000.0, 800.0);
    let margin: RootMargin = "-100px 10%".parse().unwrap();
    assert_eq!(root.expand(&margin), Rect::new(-100.0, 100.0, 1200.0, 600.0));
  }
}
