// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::config::options::ExecutionOptions;
use crate::config::validate::CommandShapeError;

/// A single command in a pipeline: a literal executable plus its already
/// tokenized arguments. Nothing here is interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub executable: String,
    pub arguments: Vec<String>,
}

impl CommandSpec {
    pub fn new<S, I, A>(executable: S, arguments: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            executable: executable.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.arguments {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Non-empty, validated list of commands making up one pipeline.
///
/// Construct it through [`CommandList::new`] or `TryFrom<&toml::Value>`;
/// both guarantee at least one command with a non-empty executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList {
    commands: Vec<CommandSpec>,
}

impl CommandList {
    pub fn new(commands: Vec<CommandSpec>) -> Result<Self, CommandShapeError> {
        if commands.is_empty() {
            return Err(CommandShapeError::EmptySequence);
        }
        if let Some(index) = commands.iter().position(|c| c.executable.is_empty()) {
            return Err(CommandShapeError::InvalidExecutable { index });
        }
        Ok(Self { commands })
    }

    pub(crate) fn new_unchecked(commands: Vec<CommandSpec>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Never true for a list built through the validator.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandSpec> {
        self.commands.iter()
    }

    pub fn first(&self) -> &CommandSpec {
        &self.commands[0]
    }

    pub fn last(&self) -> &CommandSpec {
        &self.commands[self.commands.len() - 1]
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a CommandSpec;
    type IntoIter = std::slice::Iter<'a, CommandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for CommandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

/// Top-level build-config file as read from TOML.
///
/// ```toml
/// [options]
/// cwd = "."
///
/// [target.lines]
/// commands = [
///   { cmd = "printf", args = ["a\nb\nc\n"] },
///   { cmd = "grep", args = ["b"] },
/// ]
///
/// [target.lines.options]
/// env = { LC_ALL = "C" }
/// ```
///
/// Command lists and options are kept as raw `toml::Value`s here so the
/// validator sees exactly what the user wrote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// File-wide option defaults from `[options]`.
    #[serde(default)]
    pub options: Option<toml::Value>,

    /// All targets from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<String, RawTarget>,
}

/// `[target.<name>]` section, unvalidated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTarget {
    #[serde(default)]
    pub commands: Option<toml::Value>,

    #[serde(default)]
    pub options: Option<toml::Value>,
}

/// A validated target: commands plus fully resolved options.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub commands: CommandList,
    pub options: ExecutionOptions,
}

/// Validated config file. Targets are keyed (and therefore run) by name.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub target: BTreeMap<String, Target>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(target: BTreeMap<String, Target>) -> Self {
        Self { target }
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.target.keys().map(|s| s.as_str())
    }
}
