use super::Resolve;
use super::args::{SIZE_FIELDS, positional, struct_fields};
use crate::domain::{CanonicalValue, DynamicValue, ParseError, Shape, Size, to_int32};

impl Resolve for Size {
    const SHAPE: Shape = Shape::Size;

    fn resolve(args: &[DynamicValue]) -> Result<Self, ParseError> {
        match args {
            [] => Ok(Size::default()),
            [DynamicValue::Handle(CanonicalValue::Size(s))] => Ok(*s),
            [value] if value.is_object() => {
                let [width, height] = struct_fields(value, &SIZE_FIELDS)?;
                Ok(Size::new(to_int32(width), to_int32(height)))
            }
            [_, _] => {
                let [width, height] = positional(args)?;
                Ok(Size::new(to_int32(width), to_int32(height)))
            }
            _ => Err(ParseError::NoMatchingSignature),
        }
    }
}
