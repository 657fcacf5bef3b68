pub mod completion;
pub mod config;
pub mod extract;
pub mod gui;
pub mod profile;
pub mod run;
