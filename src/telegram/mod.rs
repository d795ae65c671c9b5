pub mod bot;
pub mod commands;
pub mod flow;
pub mod formatters;

pub use bot::{run_bot, BotState, Command, FlowState};
