//! Reply formatting: fixed texts, emotion banner, bullet recommendations.

use crate::types::Turn;

/// Acknowledgement returned for gratitude messages.
pub const GRATITUDE_REPLY: &str = "¡De nada! 😊 Aquí estaré cuando me necesites.";

/// Returned whenever the reply could not be generated.
pub const FALLBACK_REPLY: &str = "¡Vaya! Algo no ha ido bien. ¿Podrías intentarlo de nuevo?";

/// Prefix of the emotion banner.
pub const BANNER_PREFIX: &str = "Emotion detected:";

/// Marker prefixed to each recommendation line.
pub const BULLET: &str = "🔹";

/// Banner prefixes (lowercased) that mark a reply as already labeled.
const BANNER_MARKERS: &[&str] = &["emotion detected", "emoción detectada"];

const DEFAULT_EMOJI: &str = "😊";

const EMOTION_EMOJI: &[(&str, &str)] = &[
    ("tristeza", "😢"),
    ("sadness", "😢"),
    ("alegría", "😊"),
    ("alegria", "😊"),
    ("felicidad", "😄"),
    ("joy", "😊"),
    ("happiness", "😄"),
    ("enojo", "😠"),
    ("ira", "😠"),
    ("rabia", "😠"),
    ("anger", "😠"),
    ("miedo", "😨"),
    ("fear", "😨"),
    ("ansiedad", "😟"),
    ("anxiety", "😟"),
    ("preocupación", "😟"),
    ("preocupacion", "😟"),
    ("estrés", "😣"),
    ("estres", "😣"),
    ("stress", "😣"),
    ("frustración", "😤"),
    ("frustracion", "😤"),
    ("frustration", "😤"),
    ("soledad", "🥺"),
    ("loneliness", "🥺"),
    ("sorpresa", "😮"),
    ("surprise", "😮"),
    ("calma", "😌"),
    ("tranquilidad", "😌"),
    ("calm", "😌"),
    ("amor", "🥰"),
    ("love", "🥰"),
];

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Human name derived from an email: `ana.gomez@x` becomes `Ana Gomez`.
pub fn display_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .replace('.', " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Greeting that opens a session.
pub fn welcome_message(assistant_name: &str, email: &str) -> String {
    format!(
        "¡Hola {}! 👋 Soy {}, tu asistente emocional. ¿Cómo te sientes hoy?",
        display_name(email),
        assistant_name
    )
}

/// Emoji shown next to a detected emotion.
pub fn emoji_for(label: &str) -> &'static str {
    let key = label.trim().to_lowercase();
    EMOTION_EMOJI
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, emoji)| *emoji)
        .unwrap_or(DEFAULT_EMOJI)
}

/// Banner line announcing a detected emotion, newline included.
pub fn banner(label: &str) -> String {
    format!("{} {} {}\n", BANNER_PREFIX, label, emoji_for(label))
}

/// Whether a reply already starts with an emotion banner.
pub fn starts_with_banner(reply: &str) -> bool {
    let lower = reply.trim_start().to_lowercase();
    BANNER_MARKERS.iter().any(|m| lower.starts_with(m))
}

/// Keep the first `max_lines` non-empty lines, each as a bullet.
pub fn bulletize(reply: &str, max_lines: usize) -> String {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .map(|line| format!("{} {}", BULLET, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the last `window` turns as `role: text` lines.
pub fn render_context(turns: &[Turn], window: usize) -> String {
    let start = turns.len().saturating_sub(window);
    turns[start..]
        .iter()
        .map(|t| format!("{}: {}", t.role, t.text))
        .collect::<Vec<_>>()
        .join("\n")
}
