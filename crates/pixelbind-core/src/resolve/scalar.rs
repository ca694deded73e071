use super::Resolve;
use crate::domain::{CanonicalValue, DynamicValue, ParseError, Scalar, Shape};

const SCALAR_ARITY: usize = 4;

impl Resolve for Scalar {
    const SHAPE: Shape = Shape::Scalar;

    fn resolve(args: &[DynamicValue]) -> Result<Self, ParseError> {
        match args {
            [] => Ok(Scalar::default()),
            [DynamicValue::Handle(CanonicalValue::Scalar(s))] => Ok(*s),
            [DynamicValue::Array(items)] => from_array(items),
            [value] if !value.is_number() => Err(ParseError::NotScalarLike),
            _ if args.len() <= SCALAR_ARITY => from_positional(args),
            _ => Err(ParseError::NoMatchingSignature),
        }
    }
}

fn from_array(items: &[DynamicValue]) -> Result<Scalar, ParseError> {
    if items.len() != SCALAR_ARITY {
        return Err(ParseError::ArrayArity {
            expected: SCALAR_ARITY,
            found: items.len(),
        });
    }
    let mut values = [0.0; SCALAR_ARITY];
    for (slot, item) in values.iter_mut().zip(items) {
        *slot = item.as_number().ok_or(ParseError::NonNumericArrayValue)?;
    }
    Ok(Scalar::from(values))
}

/// Up to four numbers; missing trailing components are zero.
fn from_positional(args: &[DynamicValue]) -> Result<Scalar, ParseError> {
    let mut values = [0.0; SCALAR_ARITY];
    for (i, (slot, arg)) in values.iter_mut().zip(args).enumerate() {
        *slot = arg
            .as_number()
            .ok_or(ParseError::NonNumericArgument { position: i + 1 })?;
    }
    Ok(Scalar::from(values))
}
