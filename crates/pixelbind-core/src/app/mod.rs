//! App - アプリケーション層
//!
//! ports を組み合わせて非同期の画像ロードを実装します。
//!
//! # 主要コンポーネント
//! - **LoaderBuilder**: 構築とワイヤリング（設定・デコーダ・fatal sink・時計）
//! - **ImageLoader**: ロード要求の受付（handler / future / multi）
//! - **WorkerLoop**: permit 付きのデコード実行
//! - **CompletionLoop**: 所有コンテキストでの結果配送
//! - **Status**: タスク数の集計

pub mod builder;
pub mod completion;
pub mod completion_loop;
pub mod loader;
pub mod status;
pub mod task;
mod worker_loop;

pub use self::builder::{BuildError, ConfigError, LoaderBuilder, LoaderConfig};
pub use self::completion::{CompletionChannel, HandlerError, LoadFuture, LoadHandler, LoadResult};
pub use self::completion_loop::{CompletionLoop, DispatchSummary};
pub use self::loader::{ImageLoader, MultiLoad};
pub use self::status::LoadCounts;
pub use self::task::{LoadTask, TaskReport};
