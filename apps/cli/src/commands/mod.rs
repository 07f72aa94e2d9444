//! 命令定义和实现

pub mod config;
pub mod decode;
pub mod parse;
pub mod simulate;

pub use config::ConfigCommand;
pub use decode::{DecodeCommand, EncodeCommand};
pub use parse::ParseCommand;
pub use simulate::SimulateCommand;
