//! FatalSink port - 握りつぶしてはいけないエラーの送り先
//!
//! Errors raised by caller code inside a completion handler are not
//! recoverable by the loader. They are handed here instead.

use crate::domain::FatalError;

/// Process-wide destination for handler failures.
pub trait FatalSink: Send + Sync {
    fn report(&self, error: FatalError);
}
