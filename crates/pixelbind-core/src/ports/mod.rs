//! Ports - 抽象化レイヤー
//!
//! 外部の協力者（デコーダ、時計、ID 生成、致命的エラーの送り先）への
//! インターフェース。実装は `impls` に置く。

pub mod clock;
pub mod decoder;
pub mod fatal_sink;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::decoder::{Decoder, NativeError};
pub use self::fatal_sink::FatalSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
