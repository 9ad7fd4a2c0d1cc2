//! The `tilestacktool` command script interpreter.
//!
//! A script is a flat list of words: each `--flag` consumes its own arguments, and most
//! commands push or pop tilestacks on an explicit operand stack.

use std::{collections::HashMap, path::PathBuf};

use crate::{
    format::pixel::CompressionFormat,
    foundation::error::{TilestackError, TilestackResult},
    pyramid::projection::ProjectionWindow,
    stack::SharedTilestack,
};

pub mod args;
pub mod commands;

pub use args::Arglist;

/// Tile edge used by `--image2tiles` unless `--tilesize` changes it.
pub const DEFAULT_TILESIZE: u32 = 512;

/// Knobs that earlier commands set for later ones.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSettings {
    pub tilesize: u32,
    pub create_parent_directories: bool,
    pub delete_source_tiles: bool,
    /// Tiles read by `--loadtiles`, removed after a successful run when asked.
    pub source_tiles: Vec<PathBuf>,
    pub compression: CompressionFormat,
    pub projection_window: ProjectionWindow,
    pub downsize: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tilesize: DEFAULT_TILESIZE,
            create_parent_directories: false,
            delete_source_tiles: false,
            source_tiles: Vec::new(),
            compression: CompressionFormat::Zlib,
            projection_window: ProjectionWindow::default(),
            downsize: false,
        }
    }
}

/// Tilestacks produced by earlier commands, newest on top.
#[derive(Default)]
pub struct OperandStack {
    items: Vec<SharedTilestack>,
}

impl OperandStack {
    pub fn push(&mut self, ts: SharedTilestack) {
        self.items.push(ts);
    }

    /// Take the top stack; `cmd` names the command in the error when there is none.
    pub fn pop(&mut self, cmd: &str) -> TilestackResult<SharedTilestack> {
        self.items
            .pop()
            .ok_or_else(|| TilestackError::usage(format!("{cmd}: no tilestack on the operand stack")))
    }

    pub fn top(&self, cmd: &str) -> TilestackResult<&SharedTilestack> {
        self.items
            .last()
            .ok_or_else(|| TilestackError::usage(format!("{cmd}: no tilestack on the operand stack")))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A command handler: reads its arguments from the list and acts on the tool.
pub type CommandFn = fn(&mut Tool, &mut Arglist) -> TilestackResult<()>;

/// Interpreter state for one script run.
pub struct Tool {
    pub stack: OperandStack,
    pub settings: ToolSettings,
    commands: HashMap<&'static str, CommandFn>,
    /// Set by commands that end the run early (`--version`, `--selftest`).
    pub finished: bool,
}

impl Default for Tool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool {
    pub fn new() -> Self {
        Self {
            stack: OperandStack::default(),
            settings: ToolSettings::default(),
            commands: commands::registry(),
            finished: false,
        }
    }

    /// Flags this tool understands, sorted.
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run every command in `args`, then perform end-of-run cleanup.
    pub fn run(&mut self, mut args: Arglist) -> TilestackResult<()> {
        while !args.is_empty() && !self.finished {
            let flag = args.shift("command")?;
            let Some(cmd) = self.commands.get(flag.as_str()).copied() else {
                return Err(TilestackError::usage(format!("unknown argument {flag}")));
            };
            tracing::debug!(%flag, "command");
            cmd(self, &mut args)?;
        }
        self.delete_source_tiles()
    }

    fn delete_source_tiles(&mut self) -> TilestackResult<()> {
        if !self.settings.delete_source_tiles || self.settings.source_tiles.is_empty() {
            return Ok(());
        }
        tracing::info!(count = self.settings.source_tiles.len(), "deleting source tiles");
        for tile in self.settings.source_tiles.drain(..) {
            std::fs::remove_file(&tile).map_err(|e| {
                TilestackError::resource(format!("can't delete {}: {e}", tile.display()))
            })?;
        }
        Ok(())
    }
}

/// Run a whole script with a fresh [`Tool`].
pub fn run<I, S>(args: I) -> TilestackResult<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Tool::new().run(Arglist::new(args))
}

#[cfg(test)]
#[path = "../../tests/unit/tool/mod.rs"]
mod tests;
