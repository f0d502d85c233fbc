//! Keyboards and user-facing texts
//!
//! Messages that carry emphasis are sent as legacy Markdown; anything the
//! user typed goes through [`escape_markdown`] first.

use crate::transport::{Button, Keyboard};
use vfx_common::{CallbackData, EffectCatalog, EffectChoice, PageRequest};

/// Effect buttons per keyboard row
const BUTTONS_PER_ROW: usize = 2;

pub const WELCOME: &str = "🎙️ *Welcome to Voice Effects Bot!* 🎙️\n\n\
Send or forward me a voice/audio message, and I'll give you multiple voice effects to apply!\n\n\
I can transform your voice into chipmunk, robot, echo and many more effects using FFmpeg.\n\n\
*Advanced Features:*\n\
🧬 Use /clone to record your voice for cloning.\n\
✏️ Use /rename to change the name of your cloned voice.";

pub const HELP: &str = "*How to use this bot*\n\n\
1. Send or forward a voice or audio message (up to 60 seconds)\n\
2. Pick an effect from the menu\n\
3. Receive your processed voice message\n\n\
*Commands*\n\
/start - Welcome message\n\
/help - This help\n\
/clone - Record a voice sample (3-30 seconds)\n\
/rename <name> - Rename your cloned voice\n\
/skip - Keep the default name while naming a voice";

pub const CLONE_PROMPT: &str = "🎤 *Voice Cloning Initiated* 🎤\n\n\
Please send a short voice message (5-10 seconds) with clear speech.\n\n\
Your cloned voice will be added to your voice effects.";

pub const SAMPLE_RECORDED: &str = "✅ *Voice sample recorded successfully!* ✅\n\n\
Now, please give your cloned voice a name. This name will appear in the effects menu.\n\n\
Reply with a name like 'Robot Me' or 'Deep Voice'.\n\n\
Or simply send /skip to use the default name 'My Voice'.";

pub const TEXT_HINT: &str = "🎙️ Send or forward me a voice or audio message to get started. Use /help for more.";

pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Use /help to see what I can do.";

pub const EFFECT_FAILED: &str = "❌ Error applying effect. Please try again or choose another effect.";

pub const UPLOAD_FAILED: &str = "❌ An error occurred while processing your audio. Please try again.";

pub const CLONE_FAILED: &str = "❌ An error occurred while cloning your voice. Please try again.";

pub const GENERIC_FAILURE: &str = "❌ Something went wrong. Please try again.";

pub const INVALID_BUTTON: &str = "This button is no longer valid.";

pub const SEND_ANOTHER: &str = "🎙️ Send another voice message to apply more effects.";

/// Escape legacy Markdown control characters
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Button label for an effect identifier: `robot_reverb` -> `Robot Reverb`
pub fn effect_label(identifier: &str) -> String {
    identifier
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Text above the effect keyboard
pub fn menu_text(cloned_name: Option<&str>) -> String {
    match cloned_name {
        Some(name) => format!(
            "🎛️ Choose a voice effect to apply:\n\n👤 Your cloned voice is at the top: {}",
            escape_markdown(name)
        ),
        None => "🎛️ Choose a voice effect to apply:".to_string(),
    }
}

/// Paginated effect keyboard
///
/// Layout: cloned-voice button (if any), effects two per row, then the
/// navigation row. `page` must already be clamped.
pub fn effect_keyboard(
    catalog: &EffectCatalog,
    page: usize,
    page_size: usize,
    cloned_name: Option<&str>,
) -> Keyboard {
    let mut keyboard = Keyboard::default();

    if let Some(name) = cloned_name {
        keyboard.push_row(vec![Button::new(
            format!("👤 {}", name),
            CallbackData::Effect(EffectChoice::ClonedVoice),
        )]);
    }

    for chunk in catalog.list_page(page, page_size).chunks(BUTTONS_PER_ROW) {
        keyboard.push_row(
            chunk
                .iter()
                .map(|entry| {
                    Button::new(
                        effect_label(&entry.identifier),
                        CallbackData::Effect(EffectChoice::Catalog(entry.identifier.clone())),
                    )
                })
                .collect(),
        );
    }

    let total_pages = catalog.total_pages(page_size).max(1);
    let mut nav = Vec::with_capacity(3);
    if page > 0 {
        nav.push(Button::new("◀️ Previous", CallbackData::Page(PageRequest::Prev)));
    }
    nav.push(Button::new(
        format!("Page {}/{}", page + 1, total_pages),
        CallbackData::Page(PageRequest::Info),
    ));
    if page + 1 < total_pages {
        nav.push(Button::new("Next ▶️", CallbackData::Page(PageRequest::Next)));
    }
    keyboard.push_row(nav);

    keyboard
}

// Escapes only work outside an entity, so user and effect text never goes
// inside `*...*`.

pub fn processing(label: &str) -> String {
    format!("⏳ *Processing...* {}", escape_markdown(label))
}

pub fn applied(label: &str) -> String {
    format!("✅ *Effect applied:* {}", escape_markdown(label))
}

/// Caption of the returned voice message (plain text)
pub fn voice_caption(label: &str) -> String {
    format!("🎧 Your voice with {} effect.", label)
}

pub fn voice_named(name: &str) -> String {
    format!(
        "✅ *Voice name set!* ✅\n\n\
         Name: {}\n\n\
         Your cloned voice has been added to the effects menu. You can apply it to any voice message.",
        escape_markdown(name)
    )
}

pub fn default_name_kept(name: &str) -> String {
    format!(
        "✅ *Default name kept* ✅\n\n\
         Name: {}\n\n\
         Your cloned voice has been added to the effects menu. You can apply it to any voice message.",
        escape_markdown(name)
    )
}

pub fn voice_renamed(name: &str) -> String {
    format!(
        "✅ *Voice name updated!*\n\n\
         New name: {}\n\n\
         Your cloned voice will appear with this name in the effects menu.",
        escape_markdown(name)
    )
}
