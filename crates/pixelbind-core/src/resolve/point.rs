use super::Resolve;
use super::args::{POINT_FIELDS, positional, struct_fields};
use crate::domain::{CanonicalValue, DynamicValue, ParseError, Point, Shape, to_int32};

impl Resolve for Point {
    const SHAPE: Shape = Shape::Point;

    fn resolve(args: &[DynamicValue]) -> Result<Self, ParseError> {
        match args {
            [] => Ok(Point::default()),
            [DynamicValue::Handle(CanonicalValue::Point(p))] => Ok(*p),
            [value] if value.is_object() => {
                let [x, y] = struct_fields(value, &POINT_FIELDS)?;
                Ok(Point::new(to_int32(x), to_int32(y)))
            }
            [_, _] => {
                let [x, y] = positional(args)?;
                Ok(Point::new(to_int32(x), to_int32(y)))
            }
            _ => Err(ParseError::NoMatchingSignature),
        }
    }
}
