use super::Resolve;
use super::args::{POINT_FIELDS, RECT_FIELDS, SIZE_FIELDS, numeric_fields, positional, struct_fields};
use crate::domain::{
    CanonicalValue, DynamicValue, ParseError, Point, Rect, Shape, Size, to_int32,
};

const FIRST_CORNER: &str = "\"x\" and \"y\"";
const SECOND_CORNER: &str = "\"x\" and \"y\" or \"width\" and \"height\"";

impl Resolve for Rect {
    const SHAPE: Shape = Shape::Rect;

    fn resolve(args: &[DynamicValue]) -> Result<Self, ParseError> {
        match args {
            [] => Ok(Rect::default()),
            [DynamicValue::Handle(CanonicalValue::Rect(r))] => Ok(*r),
            [value] if value.is_object() => {
                let [x, y, width, height] = struct_fields(value, &RECT_FIELDS)?;
                Ok(Rect::new(
                    to_int32(x),
                    to_int32(y),
                    to_int32(width),
                    to_int32(height),
                ))
            }
            [origin, extent] if origin.is_object() && extent.is_object() => {
                from_pair(origin, extent)
            }
            [_, _, _, _] => {
                let [x, y, width, height] = positional(args)?;
                Ok(Rect::new(
                    to_int32(x),
                    to_int32(y),
                    to_int32(width),
                    to_int32(height),
                ))
            }
            _ => Err(ParseError::NoMatchingSignature),
        }
    }
}

/// What the second argument of the two-object form turned out to be.
enum Extent {
    Corner,
    Size,
}

/// Two-object form: a corner plus either the opposite corner or a size.
///
/// The second argument is classified first. When it carries both `x`/`y`
/// and `width`/`height`, it is read as a corner.
fn from_pair(origin: &DynamicValue, extent: &DynamicValue) -> Result<Rect, ParseError> {
    let kind = if extent.has_fields(&POINT_FIELDS) {
        Extent::Corner
    } else if extent.has_fields(&SIZE_FIELDS) {
        Extent::Size
    } else {
        return Err(ParseError::NotAnObject {
            position: 2,
            expected: SECOND_CORNER,
        });
    };

    if !origin.has_fields(&POINT_FIELDS) {
        return Err(ParseError::NotAnObject {
            position: 1,
            expected: FIRST_CORNER,
        });
    }
    let [x, y] = numeric_fields(origin, &POINT_FIELDS)?;
    let origin = Point::new(to_int32(x), to_int32(y));

    match kind {
        Extent::Corner => {
            let [x2, y2] = numeric_fields(extent, &POINT_FIELDS)?;
            Ok(Rect::from_points(origin, Point::new(to_int32(x2), to_int32(y2))))
        }
        Extent::Size => {
            let [width, height] = numeric_fields(extent, &SIZE_FIELDS)?;
            Ok(Rect::from_point_size(
                origin,
                Size::new(to_int32(width), to_int32(height)),
            ))
        }
    }
}
