//! What the player sees, hears and feels, as a stream of cues.
//!
//! The scene never plays anything itself. It hands cues to a `Presentation`,
//! which may play them through the audio system, record them for tests, or
//! drop them.

use std::path::{Path, PathBuf};

use crate::audio::AudioSystem;
use crate::crocodile::MouthState;
use crate::math::Vec2;
use crate::world::EntityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Slice,
    Splash,
    NomNom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Impact {
    Light,
    Heavy,
}

/// How the next level comes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// After a loss.
    Fade,
    /// After a win.
    Doorway,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cue {
    Sound(SoundCue),
    Haptic(Impact),
    /// Move the swipe particle trail to a point.
    SwipeTrail { at: Vec2 },
    SwipeTrailEnded,
    FadeOut { entities: Vec<EntityId>, duration: f32 },
    ShrinkOut { entity: EntityId, duration: f32 },
    Mouth(MouthState),
    Transition(Transition),
}

pub trait Presentation {
    fn present(&mut self, cue: Cue);
}

/// Records every cue.
impl Presentation for Vec<Cue> {
    fn present(&mut self, cue: Cue) {
        self.push(cue);
    }
}

/// Sound files of the game.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundBank {
    pub music: PathBuf,
    pub slice: PathBuf,
    pub splash: PathBuf,
    pub nom_nom: PathBuf,
}

impl SoundBank {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            music: dir.join("CheeZeeJungle.caf"),
            slice: dir.join("Slice.caf"),
            splash: dir.join("Splash.caf"),
            nom_nom: dir.join("NomNom.caf"),
        }
    }

    pub fn path(&self, sound: SoundCue) -> &Path {
        match sound {
            SoundCue::Slice => &self.slice,
            SoundCue::Splash => &self.splash,
            SoundCue::NomNom => &self.nom_nom,
        }
    }
}

/// Plays sounds through the audio system and logs everything else.
pub struct AudioPresenter<'a> {
    audio: &'a mut AudioSystem,
    sounds: &'a SoundBank,
}

impl<'a> AudioPresenter<'a> {
    pub fn new(audio: &'a mut AudioSystem, sounds: &'a SoundBank) -> Self {
        Self { audio, sounds }
    }
}

impl Presentation for AudioPresenter<'_> {
    fn present(&mut self, cue: Cue) {
        match cue {
            Cue::Sound(sound) => {
                if let Err(err) = self.audio.play_sound(self.sounds.path(sound)) {
                    log::debug!("{sound:?} not played: {err}");
                }
            }
            Cue::Haptic(impact) => log::debug!("haptic {impact:?}"),
            Cue::SwipeTrail { at } => log::trace!("swipe trail at ({:.1}, {:.1})", at.x, at.y),
            Cue::SwipeTrailEnded => log::trace!("swipe trail ended"),
            Cue::FadeOut { entities, duration } => {
                log::trace!("fading {} nodes over {duration}s", entities.len())
            }
            Cue::ShrinkOut { entity, duration } => {
                log::trace!("shrinking {entity} over {duration}s")
            }
            Cue::Mouth(state) => log::trace!("crocodile mouth {state}"),
            Cue::Transition(transition) => log::debug!("transition {transition:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_bank_resolves_files_under_the_asset_dir() {
        let bank = SoundBank::in_dir(Path::new("assets"));
        assert_eq!(bank.path(SoundCue::NomNom), Path::new("assets/NomNom.caf"));
        assert_eq!(bank.music, Path::new("assets/CheeZeeJungle.caf"));
    }

    #[test]
    fn presenter_survives_missing_audio() {
        let mut audio = AudioSystem::unavailable();
        let bank = SoundBank::in_dir(Path::new("assets"));
        let mut presenter = AudioPresenter::new(&mut audio, &bank);
        presenter.present(Cue::Sound(SoundCue::Slice));
        presenter.present(Cue::Haptic(Impact::Heavy));
        presenter.present(Cue::Transition(Transition::Doorway));
    }
}
