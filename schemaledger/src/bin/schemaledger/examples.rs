use crate::commands::{history, init, show, status, sync};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "init",
            groups: init::EXAMPLES,
        },
        CommandExample {
            name: "sync",
            groups: sync::EXAMPLES,
        },
        CommandExample {
            name: "status",
            groups: status::EXAMPLES,
        },
        CommandExample {
            name: "show",
            groups: show::EXAMPLES,
        },
        CommandExample {
            name: "history",
            groups: history::EXAMPLES,
        },
    ]
}
