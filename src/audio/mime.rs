//! Transport content-type resolution for audio payloads.

/// Declared type that carries no information about the audio format.
pub const GENERIC_BINARY_TYPE: &str = "application/octet-stream";

/// Fallback when neither the declared type nor the extension resolves.
pub const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

/// Extension → content-type table accepted by the generation service.
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mp3"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("mp4", "video/mp4"),
    ("webm", "audio/webm"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
];

/// Pick the content type sent alongside the audio bytes.
///
/// The payload's own declared type wins unless it is absent, empty or
/// [`GENERIC_BINARY_TYPE`]; then the file extension of `file_name` is looked
/// up (case-insensitively), and finally [`DEFAULT_AUDIO_TYPE`] is used.
///
/// ```
/// use press_alert::audio::resolve_mime_type;
///
/// assert_eq!(resolve_mime_type(Some("audio/ogg"), "x.wav"), "audio/ogg");
/// assert_eq!(resolve_mime_type(None, "clip1.WAV"), "audio/wav");
/// assert_eq!(resolve_mime_type(Some("application/octet-stream"), "a.m4a"), "audio/mp4");
/// assert_eq!(resolve_mime_type(None, "notes.txt"), "audio/mpeg");
/// ```
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    if let Some(declared) = declared.map(str::trim) {
        if !declared.is_empty() && !declared.eq_ignore_ascii_case(GENERIC_BINARY_TYPE) {
            return declared.to_string();
        }
    }

    extension_type(file_name)
        .unwrap_or(DEFAULT_AUDIO_TYPE)
        .to_string()
}

fn extension_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
