//! Prefix commands: `talk`, `train`, `save` and `help`.

mod help;
mod router;
mod save;
mod talk;
mod train;

pub use help::{HelpCommand, help_card};
pub use router::{CommandContext, CommandHandler, CommandRouter, Dispatch};
pub use save::SaveCommand;
pub use talk::TalkCommand;
pub use train::{TrainCommand, TrainInputError, parse_training_pair, submit_example};

/// Router with every built-in command registered.
#[must_use]
pub fn builtin_commands() -> CommandRouter {
    let mut router = CommandRouter::default();
    router.register("talk", TalkCommand);
    router.register("train", TrainCommand);
    router.register("save", SaveCommand);
    router.register("help", HelpCommand);
    router
}
