//! Typed coordinate and distance grammar.
//!
//! - absolute: `x,y`
//! - relative: `@dx,dy`
//! - polar: `d<angle` (from the origin) or `@d<angle` (from the base point)
//! - bare number: a distance, or a point along the cursor direction

use draftcad_core::geometry::{Point2, Vector2};

use crate::errors::InputError;

/// A parsed token before it is interpreted against a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputValue {
    Point(Point2),
    Number(f64),
}

/// Parses one token. `base` anchors `@` forms; relative input without one is an error.
pub fn parse(token: &str, base: Option<Point2>) -> Result<InputValue, InputError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(InputError::Empty);
    }

    let (relative, body) = match token.strip_prefix('@') {
        Some(rest) => (true, rest.trim()),
        None => (false, token),
    };
    let anchor = if relative {
        base.ok_or(InputError::MissingBase)?
    } else {
        Point2::origin()
    };

    if let Some((length, angle)) = body.split_once('<') {
        let length = number(length, "distance", token)?;
        let angle = number(angle, "angle", token)?;
        return Ok(InputValue::Point(anchor.polar(length, angle)));
    }

    if let Some((x, y)) = body.split_once(',') {
        let x = number(x, "coordinate", token)?;
        let y = number(y, "coordinate", token)?;
        return Ok(InputValue::Point(anchor.translate(Vector2::new(x, y))));
    }

    if relative {
        // `@` alone repeats the base point
        if body.is_empty() {
            return Ok(InputValue::Point(anchor));
        }
        return Err(InputError::Invalid {
            what: "point",
            token: token.to_string(),
        });
    }

    number(body, "number", token).map(InputValue::Number)
}

/// Resolves a token to a point. A bare number is a direct distance from `base`
/// toward `cursor` (or along +X without one).
pub fn parse_point(token: &str, base: Option<Point2>, cursor: Option<Point2>) -> Result<Point2, InputError> {
    match parse(token, base)? {
        InputValue::Point(point) => Ok(point),
        InputValue::Number(distance) => {
            let base = base.ok_or(InputError::MissingBase)?;
            let direction = cursor
                .and_then(|cursor| base.vector_to(cursor).normalize())
                .unwrap_or(Vector2::new(1.0, 0.0));
            Ok(base.translate(direction * distance))
        }
    }
}

/// Resolves a token to a distance. A point is measured from `base`.
pub fn parse_distance(token: &str, base: Option<Point2>) -> Result<f64, InputError> {
    match parse(token, base)? {
        InputValue::Number(value) => Ok(value),
        InputValue::Point(point) => {
            let base = base.ok_or(InputError::MissingBase)?;
            Ok(base.distance_to(point))
        }
    }
}

fn number(raw: &str, what: &'static str, token: &str) -> Result<f64, InputError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| InputError::Invalid {
            what,
            token: token.to_string(),
        })
}
