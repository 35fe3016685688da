pub mod arn;
pub mod subscription;
pub mod topic;

pub use arn::*;
pub use subscription::*;
pub use topic::*;
