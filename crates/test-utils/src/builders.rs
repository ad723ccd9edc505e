#![allow(dead_code)]

use spawnpipe::config::{CommandList, CommandSpec};
use toml::{Table, Value};

/// Builder for `CommandList` to simplify test setup.
pub struct CommandListBuilder {
    commands: Vec<CommandSpec>,
}

impl CommandListBuilder {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn cmd(mut self, executable: &str, args: &[&str]) -> Self {
        self.commands
            .push(CommandSpec::new(executable, args.iter().copied()));
        self
    }

    pub fn build(self) -> CommandList {
        CommandList::new(self.commands).expect("Failed to build valid command list from builder")
    }

    /// The same commands in their raw config shape (`[{cmd, args}, ...]`).
    pub fn build_raw(self) -> Value {
        Value::Array(
            self.commands
                .into_iter()
                .map(|c| {
                    let mut table = Table::new();
                    table.insert("cmd".to_string(), Value::String(c.executable));
                    table.insert(
                        "args".to_string(),
                        Value::Array(c.arguments.into_iter().map(Value::String).collect()),
                    );
                    Value::Table(table)
                })
                .collect(),
        )
    }
}

impl Default for CommandListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an inline TOML snippet like `commands = [...]` and return the value
/// stored under `key`.
pub fn toml_value(snippet: &str, key: &str) -> Value {
    let table: Table = toml::from_str(snippet).expect("test TOML must parse");
    table
        .get(key)
        .cloned()
        .unwrap_or_else(|| panic!("test TOML has no key `{key}`"))
}
