//! Impls - ports の実装
//!
//! - **ImageCrateDecoder**: `image` クレートによるデコーダ
//! - **AbortingFatalSink**: デフォルトの致命的エラー処理（ログ + abort）
//! - **CollectingFatalSink**: エラーを溜めておく（組み込み・テスト用）

pub mod fatal;
pub mod image_decoder;

pub use self::fatal::{AbortingFatalSink, CollectingFatalSink};
pub use self::image_decoder::ImageCrateDecoder;
