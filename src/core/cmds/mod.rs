mod init;
mod instrument;
mod merge;
pub mod print;
mod report;

pub use init::execute_init;
pub use instrument::execute_instrument;
pub use merge::execute_merge;
pub use report::execute_report;
