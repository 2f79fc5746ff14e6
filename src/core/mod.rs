pub mod cli;
pub mod cmds;
pub mod engine;
pub mod logging;
pub mod main_shared;
pub mod registry;
pub mod types;
