//! Shared argument readers for the resolvers.

use crate::domain::dynamic::{DynamicValue, FieldProbe};
use crate::domain::errors::ParseError;

pub(crate) const POINT_FIELDS: [&str; 2] = ["x", "y"];
pub(crate) const SIZE_FIELDS: [&str; 2] = ["width", "height"];
pub(crate) const RECT_FIELDS: [&str; 4] = ["x", "y", "width", "height"];

/// Read the named numeric fields of a struct-like argument.
///
/// Presence of every field is checked before any value is looked at, so a
/// missing field wins over a non-numeric one.
pub(crate) fn struct_fields<const N: usize>(
    value: &DynamicValue,
    fields: &'static [&'static str; N],
) -> Result<[f64; N], ParseError> {
    if !value.has_fields(fields) {
        return Err(ParseError::MissingFields { fields });
    }
    numeric_fields(value, fields)
}

/// Like `struct_fields`, but the caller has already checked presence.
pub(crate) fn numeric_fields<const N: usize>(
    value: &DynamicValue,
    fields: &'static [&'static str; N],
) -> Result<[f64; N], ParseError> {
    let mut out = [0.0; N];
    for (slot, name) in out.iter_mut().zip(fields.iter()) {
        match value.probe(name) {
            FieldProbe::Number(n) => *slot = n,
            FieldProbe::Missing | FieldProbe::NotNumber => {
                return Err(ParseError::NonNumericFields { fields });
            }
        }
    }
    Ok(out)
}

/// Read exactly `N` positional numbers. The first non-number is reported by
/// its 1-based position.
pub(crate) fn positional<const N: usize>(args: &[DynamicValue]) -> Result<[f64; N], ParseError> {
    if args.len() != N {
        return Err(ParseError::NoMatchingSignature);
    }
    let mut out = [0.0; N];
    for (i, (slot, arg)) in out.iter_mut().zip(args).enumerate() {
        *slot = arg
            .as_number()
            .ok_or(ParseError::NonNumericArgument { position: i + 1 })?;
    }
    Ok(out)
}
