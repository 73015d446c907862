//! Line commands read from stdin while the renderer runs.

use lf_core::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Retry,
    Select(ProjectId),
    ReloadProjects,
    Quit,
}

/// `r`, `p <id>`, `l` or `q`. Anything else is ignored.
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let command = match (parts.next()?, parts.next()) {
        ("r" | "retry", None) => ConsoleCommand::Retry,
        ("p" | "project", Some(id)) => ConsoleCommand::Select(ProjectId::from(id)),
        ("l" | "reload", None) => ConsoleCommand::ReloadProjects,
        ("q" | "quit", None) => ConsoleCommand::Quit,
        _ => return None,
    };
    parts.next().is_none().then_some(command)
}

pub const HELP: &str = "commands: r = retry, p <id> = select project, l = reload projects, q = quit";
