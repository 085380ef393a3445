//! Languages, voice styles and personas the frontend can pick from.
//!
//! All three are closed sets. Anything the frontend sends that we don't
//! recognise falls back to a fixed default instead of failing the request.

/// Output language for generated text and speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Hindi,
    Hinglish,
    Bengali,
    Tamil,
    Telugu,
    Marathi,
    Gujarati,
    Kannada,
    Malayalam,
    Punjabi,
    Urdu,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::English,
        Language::Hindi,
        Language::Hinglish,
        Language::Bengali,
        Language::Tamil,
        Language::Telugu,
        Language::Marathi,
        Language::Gujarati,
        Language::Kannada,
        Language::Malayalam,
        Language::Punjabi,
        Language::Urdu,
    ];

    /// Language used when a request names a code we don't support.
    pub const FALLBACK: Language = Language::English;

    /// Parse a frontend language code; unknown codes map to [`Language::FALLBACK`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Language::English,
            "hi" => Language::Hindi,
            "hinglish" => Language::Hinglish,
            "bn" => Language::Bengali,
            "ta" => Language::Tamil,
            "te" => Language::Telugu,
            "mr" => Language::Marathi,
            "gu" => Language::Gujarati,
            "kn" => Language::Kannada,
            "ml" => Language::Malayalam,
            "pa" => Language::Punjabi,
            "ur" => Language::Urdu,
            _ => Self::FALLBACK,
        }
    }

    /// Resolve an optional request field, using `default` when it is absent.
    pub fn resolve(code: Option<&str>, default: Language) -> Self {
        match code {
            Some(code) if !code.trim().is_empty() => Self::from_code(code),
            _ => default,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Hinglish => "hinglish",
            Language::Bengali => "bn",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Marathi => "mr",
            Language::Gujarati => "gu",
            Language::Kannada => "kn",
            Language::Malayalam => "ml",
            Language::Punjabi => "pa",
            Language::Urdu => "ur",
        }
    }

    /// Human-readable name, as it appears in prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Hinglish => "Hinglish",
            Language::Bengali => "Bengali",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
            Language::Gujarati => "Gujarati",
            Language::Kannada => "Kannada",
            Language::Malayalam => "Malayalam",
            Language::Punjabi => "Punjabi",
            Language::Urdu => "Urdu",
        }
    }
}

/// Voice flavour requested for speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceStyle {
    Default,
    Sarcastic,
    HotMale,
    HotFemale,
}

impl VoiceStyle {
    pub const ALL: [VoiceStyle; 4] = [
        VoiceStyle::Default,
        VoiceStyle::Sarcastic,
        VoiceStyle::HotMale,
        VoiceStyle::HotFemale,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sarcastic" => VoiceStyle::Sarcastic,
            "hot_male" => VoiceStyle::HotMale,
            "hot_female" => VoiceStyle::HotFemale,
            _ => VoiceStyle::Default,
        }
    }

    pub fn resolve(tag: Option<&str>) -> Self {
        tag.map(Self::from_tag).unwrap_or(VoiceStyle::Default)
    }
}

/// Tone preset for `/chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    Brocode,
    TrustIssuesTaau,
    PadosWaliAunty,
    DelhiDude,
    ToxicTopperGhost,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Brocode,
        Persona::TrustIssuesTaau,
        Persona::PadosWaliAunty,
        Persona::DelhiDude,
        Persona::ToxicTopperGhost,
    ];

    /// Parse the display name the frontend sends in `persona_mode`.
    pub fn from_mode(mode: &str) -> Self {
        match mode.trim() {
            "Taau with Trust Issues" => Persona::TrustIssuesTaau,
            "Pados wali Aunty" => Persona::PadosWaliAunty,
            "Delhi Dude (Ranveer)" => Persona::DelhiDude,
            "School ke Topper ka Toxic Ghost" => Persona::ToxicTopperGhost,
            _ => Persona::Brocode,
        }
    }

    pub fn resolve(mode: Option<&str>) -> Self {
        mode.map(Self::from_mode).unwrap_or(Persona::Brocode)
    }

    pub fn mode_name(self) -> &'static str {
        match self {
            Persona::Brocode => "Default brocodeAI",
            Persona::TrustIssuesTaau => "Taau with Trust Issues",
            Persona::PadosWaliAunty => "Pados wali Aunty",
            Persona::DelhiDude => "Delhi Dude (Ranveer)",
            Persona::ToxicTopperGhost => "School ke Topper ka Toxic Ghost",
        }
    }
}

/// Sarvam target language used when nothing else matches.
pub const FALLBACK_VOICE_CODE: &str = "en-IN";

/// Voice table: (language, style) → Sarvam `target_language_code`.
///
/// Languages only list the styles that differ from their `Default` entry;
/// see [`voice_code`] for the lookup order.
const VOICES: &[(Language, VoiceStyle, &str)] = &[
    (Language::Hinglish, VoiceStyle::Default, "hi-IN"),
    (Language::Hinglish, VoiceStyle::Sarcastic, "hi-IN"),
    (Language::Hinglish, VoiceStyle::HotMale, "hi-IN"),
    (Language::Hinglish, VoiceStyle::HotFemale, "hi-IN"),
    (Language::English, VoiceStyle::Default, "en-IN"),
    (Language::English, VoiceStyle::Sarcastic, "en-IN"),
    (Language::English, VoiceStyle::HotMale, "en-IN"),
    (Language::English, VoiceStyle::HotFemale, "en-IN"),
    (Language::Hindi, VoiceStyle::Default, "hi-IN"),
    (Language::Hindi, VoiceStyle::Sarcastic, "hi-IN"),
    (Language::Hindi, VoiceStyle::HotMale, "hi-IN"),
    (Language::Hindi, VoiceStyle::HotFemale, "hi-IN"),
    (Language::Bengali, VoiceStyle::Default, "bn-IN"),
    (Language::Tamil, VoiceStyle::Default, "ta-IN"),
    (Language::Telugu, VoiceStyle::Default, "te-IN"),
    (Language::Marathi, VoiceStyle::Default, "mr-IN"),
    (Language::Gujarati, VoiceStyle::Default, "gu-IN"),
    (Language::Kannada, VoiceStyle::Default, "kn-IN"),
    (Language::Malayalam, VoiceStyle::Default, "ml-IN"),
    (Language::Punjabi, VoiceStyle::Default, "pa-IN"),
    (Language::Urdu, VoiceStyle::Default, "ur-IN"),
];

/// Resolve the speech target for a language and style.
///
/// Exact (language, style) entry first, then the language's `Default`
/// entry, then [`FALLBACK_VOICE_CODE`].
pub fn voice_code(language: Language, style: VoiceStyle) -> &'static str {
    let lookup = |style: VoiceStyle| {
        VOICES
            .iter()
            .find(|(l, s, _)| *l == language && *s == style)
            .map(|(_, _, code)| *code)
    };
    lookup(style)
        .or_else(|| lookup(VoiceStyle::Default))
        .unwrap_or(FALLBACK_VOICE_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes_round_trip() {
        for language in Language::ALL {
            assert_eq!(Language::from_code(language.code()), language);
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(Language::from_code("klingon"), Language::English);
        assert_eq!(Language::from_code("  HI "), Language::Hindi);
        assert_eq!(Language::resolve(None, Language::Hinglish), Language::Hinglish);
        assert_eq!(Language::resolve(Some(""), Language::Hinglish), Language::Hinglish);
        assert_eq!(Language::resolve(Some("fr"), Language::Hinglish), Language::English);
    }

    #[test]
    fn test_unknown_style_and_persona_fall_back() {
        assert_eq!(VoiceStyle::from_tag("whisper"), VoiceStyle::Default);
        assert_eq!(VoiceStyle::from_tag("hot_female"), VoiceStyle::HotFemale);
        assert_eq!(Persona::from_mode("Chacha Chaudhary"), Persona::Brocode);
        for persona in Persona::ALL {
            assert_eq!(Persona::from_mode(persona.mode_name()), persona);
        }
    }

    #[test]
    fn test_every_language_and_style_has_a_voice() {
        for language in Language::ALL {
            for style in VoiceStyle::ALL {
                let code = voice_code(language, style);
                assert!(code.ends_with("-IN"), "{language:?}/{style:?} -> {code}");
            }
        }
    }

    #[test]
    fn test_style_falls_back_to_language_default() {
        assert_eq!(voice_code(Language::Tamil, VoiceStyle::Sarcastic), "ta-IN");
        assert_eq!(voice_code(Language::Hinglish, VoiceStyle::HotMale), "hi-IN");
        assert_eq!(voice_code(Language::English, VoiceStyle::Default), "en-IN");
    }
}
