//! Canonical value resolution.
//!
//! Each canonical shape has one resolver that turns an argument list into a
//! value. Rules are tried top to bottom and the first matching rule wins, even
//! if a later one would also match:
//!
//! 1. no arguments -> zero value
//! 2. one handle of the same shape -> copy
//! 3. one struct-like argument -> named fields
//! 4. positional numbers of the shape's arity
//! 5. shape-specific extras (Rect corner pairs, Scalar arrays / short lists)
//! 6. anything else -> `ParseError::NoMatchingSignature`
//!
//! Resolution is pure: same input, same output, no side effects.

mod args;
mod point;
mod rect;
mod scalar;
mod size;

use crate::domain::{CanonicalValue, DynamicValue, ParseError, Point, Rect, Scalar, Shape, Size};

/// A canonical shape that can be built from host arguments.
pub trait Resolve: Sized + Into<CanonicalValue> {
    const SHAPE: Shape;

    fn resolve(args: &[DynamicValue]) -> Result<Self, ParseError>;
}

pub fn make_point(args: &[DynamicValue]) -> Result<Point, ParseError> {
    Point::resolve(args)
}

pub fn make_size(args: &[DynamicValue]) -> Result<Size, ParseError> {
    Size::resolve(args)
}

pub fn make_rect(args: &[DynamicValue]) -> Result<Rect, ParseError> {
    Rect::resolve(args)
}

pub fn make_scalar(args: &[DynamicValue]) -> Result<Scalar, ParseError> {
    Scalar::resolve(args)
}

/// Resolve into whichever shape is named at runtime.
pub fn resolve_as(shape: Shape, args: &[DynamicValue]) -> Result<CanonicalValue, ParseError> {
    let value = match shape {
        Shape::Point => make_point(args)?.into(),
        Shape::Size => make_size(args)?.into(),
        Shape::Rect => make_rect(args)?.into(),
        Shape::Scalar => make_scalar(args)?.into(),
    };
    log::trace!("resolved {} argument(s) into {shape}: {value}", args.len());
    Ok(value)
}
