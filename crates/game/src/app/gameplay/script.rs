use std::fs;
use std::path::{Path, PathBuf};

use engine::{InputAction, InputSnapshot, InputSource};
use serde::Deserialize;
use thiserror::Error;

use super::types::GameCommand;

pub const DEMO_SCRIPT_LABEL: &str = "<builtin-demo>";
const DEMO_SCRIPT_JSON: &str = include_str!("../../../../../assets/scripts/demo.json");

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("read replay script '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse replay script '{label}' at {path}: {source}")]
    Parse {
        label: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed in replay script '{label}' at {path}: {message}")]
    Validation {
        label: String,
        path: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    #[serde(default)]
    pub seed: Option<u64>,
    pub frames: Vec<ScriptFrame>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptFrame {
    #[serde(default = "default_frame_ticks")]
    pub ticks: u32,
    #[serde(default)]
    pub held: Vec<String>,
    #[serde(default)]
    pub commands: Vec<GameCommand>,
}

fn default_frame_ticks() -> u32 {
    1
}

impl ReplayScript {
    pub fn demo() -> Result<Self, ScriptError> {
        Self::parse(DEMO_SCRIPT_JSON, DEMO_SCRIPT_LABEL)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    pub fn parse(raw: &str, label: &str) -> Result<Self, ScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let script: ReplayScript = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                ScriptError::Parse {
                    label: label.to_string(),
                    path,
                    source: error.into_inner(),
                }
            })?;
        script.validate(label)?;
        Ok(script)
    }

    fn validate(&self, label: &str) -> Result<(), ScriptError> {
        let invalid = |path: String, message: String| ScriptError::Validation {
            label: label.to_string(),
            path,
            message,
        };
        for (frame_index, frame) in self.frames.iter().enumerate() {
            if frame.ticks == 0 {
                return Err(invalid(
                    format!("frames[{frame_index}].ticks"),
                    "expected at least 1 tick".to_string(),
                ));
            }
            for (held_index, token) in frame.held.iter().enumerate() {
                if InputAction::from_token(token).is_none() {
                    return Err(invalid(
                        format!("frames[{frame_index}].held[{held_index}]"),
                        format!("unknown action '{token}'"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn total_ticks(&self) -> u64 {
        self.frames.iter().map(|frame| u64::from(frame.ticks)).sum()
    }
}

#[derive(Debug, Clone)]
struct ResolvedFrame {
    ticks: u32,
    held: Vec<InputAction>,
    commands: Vec<GameCommand>,
}

/// Plays a validated script back one snapshot per tick.
#[derive(Debug, Clone)]
pub struct ReplayInput {
    frames: Vec<ResolvedFrame>,
    frame_index: usize,
    tick_in_frame: u32,
}

impl ReplayInput {
    pub fn new(script: &ReplayScript) -> Self {
        let frames = script
            .frames
            .iter()
            .map(|frame| ResolvedFrame {
                ticks: frame.ticks,
                held: frame
                    .held
                    .iter()
                    .filter_map(|token| InputAction::from_token(token))
                    .collect(),
                commands: frame.commands.clone(),
            })
            .collect();
        Self {
            frames,
            frame_index: 0,
            tick_in_frame: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.frame_index >= self.frames.len()
    }
}

impl InputSource<GameCommand> for ReplayInput {
    fn snapshot_for_tick(&mut self, _tick: u64) -> Option<InputSnapshot<GameCommand>> {
        let frame = self.frames.get(self.frame_index)?;
        let mut snapshot = InputSnapshot::empty();
        for action in &frame.held {
            snapshot = snapshot.with_action_down(*action, true);
        }
        if self.tick_in_frame == 0 {
            for command in &frame.commands {
                snapshot = snapshot.with_command(*command);
            }
        }

        self.tick_in_frame += 1;
        if self.tick_in_frame >= frame.ticks {
            self.frame_index += 1;
            self.tick_in_frame = 0;
        }
        Some(snapshot)
    }
}
