mod context;
pub use context::*;

mod adb;
pub use adb::*;

mod source;
pub use source::*;
