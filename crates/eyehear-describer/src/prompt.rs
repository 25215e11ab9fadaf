//! System instruction sent with every description request.

/// Maximum words the model is asked to produce per description.
pub const DESCRIPTION_WORD_LIMIT: usize = 1000;

/// Build the system instruction for video description.
///
/// The instruction pins the output to a strict JSON schema so the
/// response can be parsed without heuristics, and keeps the narration
/// suitable for reading aloud.
pub fn system_instruction() -> String {
    format!(
        r#"Describe the contents of the attached video using this JSON schema:

{{'description': str,
'humans_detected': bool,
'animals_detected': bool}}

Your description should contain information that would be useful for
documenting in a police report.  Pay particular attention to people,
gestures, animals, and vehicles.  You are only to discuss the contents
and actions that exist in the video.  Transcribe any detectable audio.
Keep your descriptions under {DESCRIPTION_WORD_LIMIT} words per video.  Do not state the video is
a recording from a doorbell camera, or that it is from a Ring doorbell,
or anything regarding the positioning of the camera.
"#
    )
}
