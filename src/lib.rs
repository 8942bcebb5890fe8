pub mod agent;
pub mod browser;
pub mod cli;
pub mod report;
pub mod screen;
pub mod state;
pub mod trace;
