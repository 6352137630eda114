/// What a slash command does; the variant also fixes how its argument is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    Help,
    Quit,
    Styles,
    Detach,
    /// Takes the rest of the line verbatim.
    SetKey,
    /// Takes one path, quoted or bare.
    Attach,
    /// Takes a path, a style and an optional instruction.
    Transform,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

pub(crate) const CHAT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "styles",
        action: CommandAction::Styles,
    },
    CommandSpec {
        command: "detach",
        action: CommandAction::Detach,
    },
    CommandSpec {
        command: "key",
        action: CommandAction::SetKey,
    },
    CommandSpec {
        command: "attach",
        action: CommandAction::Attach,
    },
    CommandSpec {
        command: "transform",
        action: CommandAction::Transform,
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/help",
    "/styles",
    "/key <api-key>",
    "/attach <image>",
    "/detach",
    "/transform <image> <style> [instruction]",
    "/quit",
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    CHAT_COMMANDS.iter().find(|spec| spec.command == command)
}
