//! Short sound cues played around a scan.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundEffect {
    Loading,
    Success,
    Error,
}

impl SoundEffect {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Loading => "loading.mp3",
            Self::Success => "success.mp3",
            Self::Error => "error.mp3",
        }
    }
}

#[async_trait]
pub trait SoundPlayer: Send + Sync {
    /// Start playing `effect`; does not wait for it to finish.
    async fn play(&self, effect: SoundEffect) -> Result<()>;
}

/// Plays `<dir>/<effect>.mp3` through an external player.
pub struct CommandSoundPlayer {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
}

impl CommandSoundPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            dir: dir.into(),
        }
    }

    pub fn path_for(&self, effect: SoundEffect) -> PathBuf {
        self.dir.join(effect.file_name())
    }
}

#[async_trait]
impl SoundPlayer for CommandSoundPlayer {
    async fn play(&self, effect: SoundEffect) -> Result<()> {
        let path = self.path_for(effect);
        if !path.exists() {
            bail!("Sound file not found: {}", path.display());
        }
        debug!(effect = ?effect, path = %path.display(), "Playing sound");
        Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch sound player: {}", self.program))?;
        Ok(())
    }
}

/// Sounds disabled.
#[derive(Debug, Default)]
pub struct SilentSoundPlayer;

#[async_trait]
impl SoundPlayer for SilentSoundPlayer {
    async fn play(&self, _effect: SoundEffect) -> Result<()> {
        Ok(())
    }
}
