pub mod aggregate;
pub mod audit;
pub mod batch;
pub mod instrument;
pub mod report;
pub mod tracker;
pub mod traits;
