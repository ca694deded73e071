//! pixelbind-core
//!
//! Host-value coercion into geometry types, and asynchronous image loading
//! with exactly-once completion delivery.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（geometry, dynamic value, image, ids, state, errors）
//! - **resolve**: 引数リスト -> Point / Size / Rect / Scalar
//! - **ports**: 抽象化レイヤー（Decoder, Clock, IdGenerator, FatalSink）
//! - **impls**: 実装（`image` クレートのデコーダ、fatal sink）
//! - **app**: ローダー本体（builder, loader, worker loop, completion loop, status）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod resolve;

pub use crate::app::{
    CompletionChannel, CompletionLoop, ImageLoader, LoadFuture, LoadResult, LoaderBuilder,
    LoaderConfig, MultiLoad,
};
pub use crate::domain::{
    CanonicalValue, DecodeError, DecodeMode, DynamicValue, Image, ImageSource, MultiLoadError,
    ParseError, Point, Rect, Scalar, Shape, Size, TaskId,
};
pub use crate::resolve::{Resolve, make_point, make_rect, make_scalar, make_size, resolve_as};
