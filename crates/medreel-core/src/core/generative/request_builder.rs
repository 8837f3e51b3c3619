//! Render Request Builder
//!
//! Composes the avatar, voice, background and overlay payload from a cleaned
//! script and its visual elements. No I/O.

use super::video::{
    AvatarCharacter, NarrationVoice, OverlayScene, ScenePosition, VideoBackground,
    VideoDimension, VideoInput, VideoRenderRequest,
};
use crate::core::script::MAX_SCRIPT_CHARS;
use crate::core::settings::VideoRenderSettings;
use crate::core::truncate_chars;
use crate::core::visuals::VisualElement;

/// Horizontal offset of every overlay
pub const SCENE_X: u32 = 50;
/// Vertical offset of the first overlay
pub const SCENE_Y_BASE: u32 = 100;
/// Vertical spacing between consecutive overlays
pub const SCENE_Y_STEP: u32 = 100;

/// Builds render payloads for one avatar/voice configuration
#[derive(Debug, Clone)]
pub struct VideoRequestBuilder {
    avatar_id: String,
    avatar_style: String,
    voice_id: String,
    background_color: String,
    dimension: VideoDimension,
}

impl VideoRequestBuilder {
    pub fn new(settings: &VideoRenderSettings) -> Self {
        Self {
            avatar_id: settings.avatar_id.clone(),
            avatar_style: settings.avatar_style.clone(),
            voice_id: settings.voice_id.clone(),
            background_color: settings.background_color.clone(),
            dimension: VideoDimension {
                width: settings.width,
                height: settings.height,
            },
        }
    }

    /// Builds the payload. The narration is capped at the script budget again
    /// here, so callers cannot push an over-long script through. Scene `i`
    /// sits at `y = 100 + i * 100` and starts at `i * 3` seconds.
    pub fn build(&self, script: &str, visuals: &[VisualElement]) -> VideoRenderRequest {
        let scenes = visuals
            .iter()
            .enumerate()
            .map(|(i, element)| {
                let index = i as u32;
                OverlayScene {
                    kind: "text".to_string(),
                    text: element.text.clone(),
                    position: ScenePosition {
                        x: SCENE_X,
                        y: SCENE_Y_BASE + index * SCENE_Y_STEP,
                    },
                    start_time: element.start_time,
                    duration: element.duration,
                }
            })
            .collect();

        VideoRenderRequest {
            video_inputs: vec![VideoInput {
                character: AvatarCharacter {
                    kind: "avatar".to_string(),
                    avatar_id: self.avatar_id.clone(),
                    avatar_style: self.avatar_style.clone(),
                },
                voice: NarrationVoice {
                    kind: "text".to_string(),
                    input_text: truncate_chars(script, MAX_SCRIPT_CHARS),
                    voice_id: self.voice_id.clone(),
                },
                background: VideoBackground {
                    kind: "color".to_string(),
                    value: self.background_color.clone(),
                },
                scenes,
            }],
            dimension: self.dimension,
        }
    }
}
