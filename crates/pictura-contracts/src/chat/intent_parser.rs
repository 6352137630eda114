use super::command_registry::{find_command, CommandAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    Noop,
    Help,
    Quit,
    Styles,
    Detach,
    SetKey {
        key: String,
    },
    Attach {
        path: String,
    },
    Transform {
        path: String,
        style: String,
        instruction: Option<String>,
    },
    Invalid {
        command: String,
        reason: String,
    },
    Unknown {
        command: String,
        arg: String,
    },
    Message {
        text: String,
    },
}

fn parse_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn parse_transform_args(command: &str, arg: &str) -> ChatIntent {
    let mut parts = parse_args(arg).into_iter();
    let (Some(path), Some(style)) = (parts.next(), parts.next()) else {
        return ChatIntent::Invalid {
            command: command.to_string(),
            reason: "usage: /transform <image> <style> [instruction]".to_string(),
        };
    };
    let instruction = parts.collect::<Vec<String>>().join(" ");
    ChatIntent::Transform {
        path,
        style,
        instruction: if instruction.is_empty() {
            None
        } else {
            Some(instruction)
        },
    }
}

pub fn parse_intent(text: &str) -> ChatIntent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ChatIntent::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            let Some(spec) = find_command(&command) else {
                return ChatIntent::Unknown {
                    command,
                    arg: arg.to_string(),
                };
            };

            return match spec.action {
                CommandAction::Help => ChatIntent::Help,
                CommandAction::Quit => ChatIntent::Quit,
                CommandAction::Styles => ChatIntent::Styles,
                CommandAction::Detach => ChatIntent::Detach,
                CommandAction::SetKey if arg.is_empty() => ChatIntent::Invalid {
                    command,
                    reason: "an argument is required".to_string(),
                },
                CommandAction::SetKey => ChatIntent::SetKey {
                    key: arg.to_string(),
                },
                CommandAction::Attach => {
                    let path = parse_single_path_arg(arg);
                    if path.is_empty() {
                        ChatIntent::Invalid {
                            command,
                            reason: "a path is required".to_string(),
                        }
                    } else {
                        ChatIntent::Attach { path }
                    }
                }
                CommandAction::Transform => parse_transform_args(&command, arg),
            };
        }
    }

    ChatIntent::Message {
        text: raw_trimmed.to_string(),
    }
}
