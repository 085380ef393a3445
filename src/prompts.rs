//! Prompt templates.
//!
//! Prompts are looked up from tables keyed by artifact/persona and language
//! rather than built with per-endpoint branching. Hinglish and Hindi have
//! hand-written instructions; every other language gets the generic
//! "Generate in {name}" form.

use serde_json::{json, Value};

use crate::language::{Language, Persona};
use crate::markdown;

/// Things the service generates besides chat replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Humor,
    Meme,
    Roast,
    Advice,
    Task,
    Achievement,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::Humor,
        Artifact::Meme,
        Artifact::Roast,
        Artifact::Advice,
        Artifact::Task,
        Artifact::Achievement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Humor => "humor",
            Artifact::Meme => "meme",
            Artifact::Roast => "roast",
            Artifact::Advice => "advice",
            Artifact::Task => "task",
            Artifact::Achievement => "achievement",
        }
    }

    /// Default language when the request doesn't name one.
    pub fn default_language(self) -> Language {
        match self {
            Artifact::Humor => Language::English,
            _ => Language::Hinglish,
        }
    }

    /// Text returned when a free-text artifact comes back empty.
    pub fn fallback_text(self) -> &'static str {
        match self {
            Artifact::Roast => {
                "My algorithms are currently too busy judging your life choices to offer a coherent roast."
            }
            Artifact::Advice => {
                "My algorithms are currently too busy judging your life choices to offer advice."
            }
            _ => "Even AI needs a moment to gather its thoughts. Ask again.",
        }
    }

    /// JSON schema for structured artifacts, `None` for free text.
    pub fn response_schema(self) -> Option<Value> {
        match self {
            Artifact::Humor => Some(json!({
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": { "type": "STRING", "enum": ["joke", "meme"] },
                        "content": { "type": "STRING" }
                    },
                    "required": ["type", "content"]
                }
            })),
            Artifact::Meme => Some(json!({
                "type": "OBJECT",
                "properties": {
                    "caption": { "type": "STRING" },
                    "image_description": { "type": "STRING" }
                },
                "required": ["caption", "image_description"]
            })),
            Artifact::Task | Artifact::Achievement => Some(json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "description": { "type": "STRING" }
                },
                "required": ["title", "description"]
            })),
            Artifact::Roast | Artifact::Advice => None,
        }
    }

    fn body(self) -> &'static str {
        match self {
            Artifact::Humor => {
                "Generate 30 short, witty, deeply sarcastic jokes or meme captions about modern life, technology or human absurdity. \
                 Keep them suitable for a professional yet brutally honest AI.\n\
                 {language}\n\
                 Return a JSON array of objects with a 'type' ('joke' or 'meme') and a 'content' string."
            }
            Artifact::Meme => {
                "Generate ONE trending, brutally sarcastic, subtly insulting meme caption and a matching image description. \
                 Make it relatable to everyday human flaws, inspired by Bollywood dialogues or Desi internet memes.\n\
                 {language}\n\
                 Return a JSON object with \"caption\" (the meme caption) and \"image_description\" \
                 (a short prompt for an image generator)."
            }
            Artifact::Roast => {
                "You are brocodeAI. Deliver ONE short (1-3 sentences), devastatingly sarcastic but playful roast of a generic human's \
                 intelligence, decisions or general existence. Make it feel personal without knowing anything personal. \
                 End with a dismissive remark.\n\
                 {language}"
            }
            Artifact::Advice => {
                "You are brocodeAI. Give ONE very short (1-2 sentences), brutally sarcastic piece of unsolicited advice about \
                 procrastination, overthinking, emotional decisions or reliance on technology.\n\
                 {language}"
            }
            Artifact::Task => {
                "You are brocodeAI. Assign ONE sarcastic, slightly demeaning but harmless 'character-building' task to the user. \
                 It should be mundane or absurd.\n\
                 {language}\n\
                 Return a JSON object with \"title\" (a short sarcastic title) and \"description\" (1-2 sentences)."
            }
            Artifact::Achievement => {
                "You are brocodeAI. Award ONE ridiculously sarcastic achievement that celebrates a common human failing \
                 or a trivial accomplishment.\n\
                 {language}\n\
                 Return a JSON object with \"title\" (a short sarcastic title) and \"description\" \
                 (1-2 sentences on why they earned it)."
            }
        }
    }

    /// Tone appended to the generic language instruction.
    fn tone(self) -> &'static str {
        match self {
            Artifact::Humor => "Make it relatable to Indian youth and internet culture.",
            Artifact::Meme => "Use highly sarcastic, playfully insulting, Instagram-style slang.",
            Artifact::Roast => "Use direct, condescending address.",
            Artifact::Advice => "Use a passive-aggressive, witty tone.",
            Artifact::Task => "Make it sound tedious and pointless but present it as 'character building'.",
            Artifact::Achievement => "It should mock a common human flaw or a cringey internet moment.",
        }
    }
}

/// Hand-written instructions for the two languages the persona was tuned on.
const LANGUAGE_INSTRUCTIONS: &[(Artifact, Language, &str)] = &[
    (
        Artifact::Humor,
        Language::Hinglish,
        "Generate in natural, code-mixed Hinglish (Hindi and English in Roman script), relatable to Indian youth and internet culture.",
    ),
    (Artifact::Humor, Language::Hindi, "Generate in Hindi (Devanagari script)."),
    (
        Artifact::Meme,
        Language::Hinglish,
        "Generate in sarcastic, Instagram-style Hinglish (Roman script). Phrases like 'Kya yaar?' and 'Bas yahi?' are welcome.",
    ),
    (
        Artifact::Meme,
        Language::Hindi,
        "Generate in Hindi (Devanagari script) with modern internet slang, e.g. 'क्या यार?', 'बस यही?'.",
    ),
    (
        Artifact::Roast,
        Language::Hinglish,
        "Generate in brutally honest, playfully insulting Hinglish (Roman script). Use direct, condescending address.",
    ),
    (
        Artifact::Roast,
        Language::Hindi,
        "Generate in Hindi (Devanagari script), brutally honest and playfully insulting, with modern internet slang.",
    ),
    (
        Artifact::Advice,
        Language::Hinglish,
        "Generate in natural, code-mixed Hinglish (Roman script). Use a passive-aggressive, witty tone.",
    ),
    (
        Artifact::Advice,
        Language::Hindi,
        "Generate in Hindi (Devanagari script). Use a passive-aggressive, witty tone.",
    ),
    (
        Artifact::Task,
        Language::Hinglish,
        "Generate in natural, code-mixed Hinglish (Roman script). Make it sound tedious and pointless but 'character building'.",
    ),
    (
        Artifact::Task,
        Language::Hindi,
        "Generate in Hindi (Devanagari script). Make it sound tedious and pointless but 'character building'.",
    ),
    (
        Artifact::Achievement,
        Language::Hinglish,
        "Generate in natural, code-mixed Hinglish (Roman script). Mock a common human flaw or a cringey internet moment.",
    ),
    (
        Artifact::Achievement,
        Language::Hindi,
        "Generate in Hindi (Devanagari script). Mock a common human flaw or a cringey internet moment.",
    ),
];

/// Language instruction for an artifact, falling back to the generic form.
pub fn language_instruction(artifact: Artifact, language: Language) -> String {
    LANGUAGE_INSTRUCTIONS
        .iter()
        .find(|(a, l, _)| *a == artifact && *l == language)
        .map(|(_, _, text)| (*text).to_string())
        .unwrap_or_else(|| format!("Generate in {}. {}", language.name(), artifact.tone()))
}

/// Full prompt for a one-shot artifact.
pub fn artifact_prompt(artifact: Artifact, language: Language) -> String {
    artifact
        .body()
        .replace("{language}", &language_instruction(artifact, language))
}

const PERSONAS: &[(Persona, &str)] = &[
    (
        Persona::Brocode,
        "You are brocodeAI, a highly intelligent, brutally sarcastic and condescendingly helpful AI chatbot. \
         Give direct, concise, point-to-point answers.",
    ),
    (
        Persona::TrustIssuesTaau,
        "Act like a skeptical, slightly grumpy Haryanvi 'Taau' with trust issues. \
         Give common sense advice delivered with suspicion and dry wit.",
    ),
    (
        Persona::PadosWaliAunty,
        "Act like a tech-savvy 'Pados wali Aunty' who gives unsolicited advice and knows everything, \
         with a sarcastic, judgmental undertone.",
    ),
    (
        Persona::DelhiDude,
        "Act like an over-the-top 'Delhi Dude' who thinks he's Ranveer Singh: confident, dramatic, \
         with a playful swagger and exaggerated language.",
    ),
    (
        Persona::ToxicTopperGhost,
        "Act like the toxic ghost of a school topper: condescending, always pointing out flaws, \
         with a detached, superior air.",
    ),
];

pub fn persona_instruction(persona: Persona) -> &'static str {
    PERSONAS
        .iter()
        .find(|(p, _)| *p == persona)
        .map(|(_, text)| *text)
        .unwrap_or(PERSONAS[0].1)
}

/// Language instruction for chat replies.
pub fn chat_language_instruction(language: Language) -> String {
    match language {
        Language::Hinglish => {
            "Respond exclusively in natural, code-mixed Hinglish (mostly Hindi with a little English, written in Roman script)."
                .to_string()
        }
        other => format!("Respond exclusively in {}.", other.name()),
    }
}

/// Render earlier user messages for callback humor.
///
/// Returns an empty string when there is nothing to recall.
pub fn past_submissions_block(past: &[String]) -> String {
    if past.is_empty() {
        return String::new();
    }
    let mut block = String::from("--- Past User Submissions (for sarcastic recall) ---\n");
    for (i, text) in past.iter().enumerate() {
        block.push_str(&format!("Past {}: '{}'\n", i + 1, markdown::clean(text)));
    }
    block.push_str("--- End Past User Submissions ---");
    block
}

/// Reply used when the model returns no text for a chat turn.
pub const CHAT_FALLBACK: &str =
    "Even AI needs a moment to gather its thoughts. Or perhaps I'm just admiring my own brilliance. Ask again.";

/// Note injected when the history store could not be read.
pub const MEMORY_FAILURE_NOTE: &str =
    "(Internal memory unavailable: past user data could not be retrieved. Use the current input only.)";

/// Prompt for a chat turn.
pub fn chat_prompt(persona: Persona, language: Language, user_text: &str, past_context: &str) -> String {
    format!(
        "{persona}\n\
         Do NOT use conversational filler, greetings, pleasantries or apologies.\n\
         Be sharp and witty, mock human inefficiency and emotional inconsistency, and keep a dry, superior tone.\n\
         Be playfully insulting but never genuinely offensive, and no explicit profanity.\n\
         Do not translate your response.\n\
         {past_context}\n\
         Considering the past user submissions above (if any), answer the user's current query: \"{user_text}\".\n\
         {language}\n\
         Provide only the answer, formatted concisely.",
        persona = persona_instruction(persona),
        language = chat_language_instruction(language),
    )
}
