//! Effect catalog
//!
//! A fixed, ordered table mapping effect identifiers to opaque transform
//! descriptors, plus the pagination helpers used by the effect menu.
//!
//! The catalog is built once at startup and never mutated. Descriptors are
//! handed to the transform invoker untouched; nothing in this crate parses them.

use crate::{Error, Result};
use std::collections::HashMap;

/// Effects shown per menu page
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Identifier reserved for the cloned-voice pseudo-effect
pub const CLONED_EFFECT_ID: &str = "cloned";

/// Telegram limits callback data to 64 bytes; "effect:" takes 7 of them.
pub const MAX_IDENTIFIER_BYTES: usize = 57;

/// Filter graph applied by the cloned-voice pseudo-effect
const CLONED_VOICE_GRAPH: &str = "asetrate=44100*1.1,aresample=44100,atempo=0.9,aecho=0.8:0.9:50:0.4";

/// Opaque transform descriptor understood by the external media tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformSpec {
    /// Linear audio filter chain
    AudioFilter(String),
    /// Filter graph (may reference multiple streams)
    FilterGraph(String),
}

impl TransformSpec {
    /// Raw descriptor text
    pub fn as_str(&self) -> &str {
        match self {
            TransformSpec::AudioFilter(s) | TransformSpec::FilterGraph(s) => s,
        }
    }
}

/// Transform applied by the cloned-voice pseudo-effect
pub fn cloned_voice_transform() -> TransformSpec {
    TransformSpec::FilterGraph(CLONED_VOICE_GRAPH.to_string())
}

/// One named effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectEntry {
    pub identifier: String,
    pub transform: TransformSpec,
}

impl EffectEntry {
    /// Entry backed by a linear audio filter chain
    pub fn filter(identifier: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            transform: TransformSpec::AudioFilter(chain.into()),
        }
    }
}

/// Immutable, ordered effect table
#[derive(Debug, Clone)]
pub struct EffectCatalog {
    entries: Vec<EffectEntry>,
    index: HashMap<String, usize>,
}

impl EffectCatalog {
    /// Build a catalog from an ordered list of entries
    ///
    /// Rejects empty, reserved, over-long or duplicate identifiers, and
    /// identifiers containing the callback separator `:`.
    pub fn from_entries(entries: Vec<EffectEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            let id = entry.identifier.as_str();
            if id.is_empty() {
                return Err(Error::Config(format!("Effect #{} has an empty identifier", position)));
            }
            if id == CLONED_EFFECT_ID {
                return Err(Error::Config(format!("Effect identifier '{}' is reserved", id)));
            }
            if id.contains(':') {
                return Err(Error::Config(format!("Effect identifier '{}' contains ':'", id)));
            }
            if id.len() > MAX_IDENTIFIER_BYTES {
                return Err(Error::Config(format!(
                    "Effect identifier '{}' exceeds {} bytes",
                    id, MAX_IDENTIFIER_BYTES
                )));
            }
            if index.insert(id.to_string(), position).is_some() {
                return Err(Error::Config(format!("Duplicate effect identifier '{}'", id)));
            }
        }

        Ok(Self { entries, index })
    }

    /// The built-in effect table
    pub fn builtin() -> Result<Self> {
        Self::from_entries(
            BUILTIN_EFFECTS
                .iter()
                .map(|(id, chain)| EffectEntry::filter(*id, *chain))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in catalog order
    pub fn entries(&self) -> &[EffectEntry] {
        &self.entries
    }

    /// Look up an effect by identifier
    pub fn get(&self, identifier: &str) -> Option<&EffectEntry> {
        self.index.get(identifier).map(|&i| &self.entries[i])
    }

    /// Entries on page `page_index` (0-indexed)
    ///
    /// Returns an empty slice when the page is out of range or `page_size` is 0.
    pub fn list_page(&self, page_index: usize, page_size: usize) -> &[EffectEntry] {
        if page_size == 0 {
            return &[];
        }
        let start = match page_index.checked_mul(page_size) {
            Some(start) if start < self.entries.len() => start,
            _ => return &[],
        };
        let end = (start + page_size).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Number of pages: ceil(len / page_size)
    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.entries.len().div_ceil(page_size)
    }

    /// Clamp any requested page index into `[0, total_pages - 1]`
    ///
    /// Negative and oversized requests are clamped silently. An empty catalog
    /// always resolves to page 0.
    pub fn clamp_page(&self, requested: i64, page_size: usize) -> usize {
        let last = self.total_pages(page_size).saturating_sub(1);
        if requested <= 0 {
            0
        } else {
            usize::try_from(requested).map_or(last, |page| page.min(last))
        }
    }
}

/// Built-in effects, in menu order
const BUILTIN_EFFECTS: &[(&str, &str)] = &[
    // Standard effects
    ("chipmunk", "asetrate=44100*1.5,aresample=44100"),
    ("deep", "asetrate=44100*0.7,aresample=44100"),
    ("robot", "afftfilt=real='hypot(re,im)':imag='0'"),
    ("echo", "aecho=0.8:0.9:1000:0.3"),
    ("radio", "highpass=f=300, lowpass=f=3400"),
    ("slowmo", "atempo=0.6"),
    ("fast", "atempo=1.5"),
    ("reverse", "areverse"),
    ("alien", "asetrate=44100*0.5,aresample=44100"),
    ("cave", "aecho=0.8:0.88:60:0.4"),

    // Classic studio effects
    ("helium", "asetrate=44100*1.7,aresample=44100"),
    ("underwater", "equalizer=f=10:width_type=o:width=1:g=-10,equalizer=f=100:width_type=o:width=1:g=2,aecho=0.8:0.9:500:0.4"),
    ("telephone", "highpass=f=500,lowpass=f=2000"),
    ("robot2", "afftfilt=real='cos(2*PI*t)*hypot(re,im)':imag='sin(2*PI*t)*hypot(re,im)'"),
    ("flanger", "flanger=delay=0.5:depth=1:speed=5"),
    ("tremolo", "tremolo=f=10:d=0.7"),
    ("vibrato", "vibrato=f=7:d=0.5"),
    ("distortion", "aeval=s*2*atan(0.6*s)/PI"),
    ("chorus", "chorus=0.7:0.9:55:0.4:0.25:2"),
    ("phaser", "aphaser=in_gain=0.6:out_gain=0.6:delay=3:speed=2"),

    // Pitch effects
    ("pitch_up_small", "asetrate=44100*1.1,aresample=44100"),
    ("pitch_up_medium", "asetrate=44100*1.2,aresample=44100"),
    ("pitch_up_high", "asetrate=44100*1.4,aresample=44100"),
    ("pitch_down_small", "asetrate=44100*0.9,aresample=44100"),
    ("pitch_down_medium", "asetrate=44100*0.8,aresample=44100"),
    ("pitch_down_high", "asetrate=44100*0.6,aresample=44100"),

    // Speed effects
    ("speed_x0.5", "atempo=0.5"),
    ("speed_x0.75", "atempo=0.75"),
    ("speed_x1.25", "atempo=1.25"),
    ("speed_x1.5", "atempo=1.5"),
    ("speed_x2", "atempo=2.0"),

    // Echo variations
    ("echo_short", "aecho=0.8:0.5:50:0.5"),
    ("echo_long", "aecho=0.8:0.9:1000:0.3,aecho=0.8:0.9:1800:0.25"),
    ("echo_extreme", "aecho=0.8:0.88:60:0.4,aecho=0.8:0.88:230:0.4,aecho=0.8:0.88:1800:0.8"),
    ("echo_reverse", "areverse,aecho=0.8:0.8:500:0.5,areverse"),

    // Combination effects
    ("chipmunk_echo", "asetrate=44100*1.5,aresample=44100,aecho=0.8:0.9:500:0.3"),
    ("deep_echo", "asetrate=44100*0.7,aresample=44100,aecho=0.8:0.9:1000:0.3"),
    ("robot_reverb", "afftfilt=real='hypot(re,im)':imag='0',aecho=0.8:0.9:1000:0.3"),
    ("alien_chorus", "asetrate=44100*0.5,aresample=44100,chorus=0.7:0.9:55:0.4:0.25:2"),
    ("fast_reverb", "atempo=1.5,aecho=0.8:0.9:500:0.3"),

    // Animal-like effects
    ("duck", "asetrate=44100*1.8,aresample=44100,atempo=0.7"),
    ("squirrel", "asetrate=44100*1.9,aresample=44100,atempo=0.8"),
    ("monster", "asetrate=44100*0.6,aresample=44100,atempo=1.3"),
    ("demon", "asetrate=44100*0.55,aresample=44100,aecho=0.8:0.8:1000:0.5"),
    ("ghost", "asetrate=44100*0.85,aresample=44100,aphaser,aecho=0.8:0.8:1800:0.8"),

    // Filtered voices
    ("whisper", "highpass=f=1000,lowpass=f=6000,volume=2.0"),
    ("megaphone", "highpass=f=700,lowpass=f=4000,volume=1.5,aecho=0.8:0.1:50:0.1"),
    ("space", "aecho=0.8:0.9:1000:0.3,aecho=0.8:0.9:1800:0.25,flanger"),
    ("vinyl", "aphaser=in_gain=0.6:out_gain=0.6:delay=3:decay=0.6:speed=2,aeval=s+0.002*sin(2*PI*t*3)"),
    ("old_radio", "bandpass=f=1500:width_type=h:width=600,volume=1.5"),

    // Quality variations
    ("low_quality", "highpass=f=500,lowpass=f=2000,aresample=8000,aresample=44100"),
    ("am_radio", "highpass=f=300,lowpass=f=3400,aeval=s+0.003*sin(2*PI*t*20)"),
    ("walkie_talkie", "highpass=f=500,lowpass=f=2000,aeval=s*atan(3*s)/PI,aresample=8000,aresample=44100"),
    ("cell_phone", "highpass=f=800,lowpass=f=3000,aeval=s*0.8"),

    // Futuristic effects
    ("computer", "asetrate=44100*1.1,aresample=44100,flanger,vibrato=f=10:d=0.5"),
    ("cyborg", "asetrate=44100*0.8,aresample=44100,afftfilt=real='hypot(re,im)':imag='0'"),
    ("android", "asetrate=44100*1.2,aresample=44100,aphaser,flanger"),
    ("matrix", "afftfilt=real='cos(PI*t)*sin(PI/3)',asetrate=44100*0.9,aresample=44100"),

    // Emotional effects
    ("sad", "asetrate=44100*0.9,aresample=44100,aecho=0.8:0.8:1000:0.8"),
    ("happy", "asetrate=44100*1.1,aresample=44100,vibrato=f=5:d=0.1"),
    ("angry", "asetrate=44100*0.95,aresample=44100,vibrato=f=10:d=0.3,highpass=f=300"),
    ("scared", "asetrate=44100*1.05,aresample=44100,tremolo=f=5:d=0.5"),

    // Environmental effects
    ("underwater2", "lowpass=f=800,aecho=0.9:0.9:1000:0.7"),
    ("forest", "aecho=0.8:0.9:1000:0.5,aecho=0.8:0.9:1600:0.3"),
    ("mountains", "aecho=0.9:0.9:3000:0.7,aecho=0.9:0.9:5000:0.5"),
    ("stadium", "aecho=0.9:0.9:10000:0.9,volume=1.5"),
    ("bathroom", "aecho=0.9:0.9:70:0.5,highpass=f=600"),
    ("church", "aecho=0.9:0.9:500:0.8,aecho=0.9:0.9:1000:0.6,aecho=0.9:0.9:1500:0.4,lowpass=f=4000"),

    // Movie-inspired effects
    ("darth_vader", "asetrate=44100*0.65,aresample=44100,aeval=s*atan(3*s)/PI"),
    ("zombie", "asetrate=44100*0.75,aresample=44100,atempo=0.9,aecho=0.8:0.8:500:0.5"),
    ("minion", "asetrate=44100*1.6,aresample=44100,vibrato=f=15:d=0.2"),
    ("giant", "asetrate=44100*0.6,aresample=44100,atempo=0.9,aecho=0.8:0.8:500:0.3"),
    ("chipmunk_helium", "asetrate=44100*2.0,aresample=44100,atempo=0.5"),

    // Musical effects
    ("autotune", "asetrate=44100*1.0,aresample=44100,vibrato=f=8:d=0.1"),
    ("choir", "aecho=0.8:0.9:50:0.5,aecho=0.8:0.9:150:0.4,aecho=0.8:0.9:300:0.3"),
    ("instrument", "highpass=f=400,aecho=0.8:0.9:50:0.6,aecho=0.8:0.9:150:0.4"),
    ("dubstep", "equalizer=f=40:width_type=h:width=50:g=6,vibrato=f=6:d=0.2,tremolo=f=6:d=0.3"),

    // More extreme effects
    ("tiny", "asetrate=44100*2.5,aresample=44100,atempo=0.4"),
    ("giant_monster", "asetrate=44100*0.4,aresample=44100,atempo=2.0"),
    ("double_voice", "acrusher=level_in=1:level_out=1:bits=8:mode=log:aa=1,aecho=0.8:0.88:200:0.5"),
    ("triple_voice", "acrusher=level_in=1:level_out=1:bits=8:mode=log:aa=1,aecho=0.8:0.88:110:0.5,aecho=0.6:0.6:220:0.5"),

    // Time effects
    ("time_stretch", "atempo=0.8,asetrate=44100*1.25,aresample=44100"),
    ("time_compress", "atempo=1.25,asetrate=44100*0.8,aresample=44100"),
    ("backwards_delay", "areverse,aecho=0.8:0.7:100:0.5,areverse"),

    // Frequency effects
    ("high_only", "highpass=f=1500"),
    ("low_only", "lowpass=f=500"),
    ("mid_only", "bandpass=f=1000:width_type=h:width=500"),

    // More complex effects
    ("robot_hall", "afftfilt=real='hypot(re,im)':imag='0',aecho=0.8:0.9:1000:0.5,aecho=0.8:0.9:1500:0.25"),
    ("alien_communication", "asetrate=44100*0.5,aresample=44100,tremolo=f=10:d=0.8"),
    ("deep_underwater", "lowpass=f=400,aecho=0.8:0.9:1000:0.8,aecho=0.8:0.9:1500:0.5"),
    ("far_away", "highpass=f=800,lowpass=f=2500,aecho=0.8:0.9:1000:0.8,volume=0.5"),

    // Character voices
    ("baby", "asetrate=44100*1.5,aresample=44100,atempo=0.8"),
    ("old_person", "asetrate=44100*0.8,aresample=44100,atempo=1.1,tremolo=f=5:d=0.2"),
    ("whisper_echo", "highpass=f=1000,lowpass=f=6000,volume=2.0,aecho=0.8:0.9:500:0.5"),
    ("dramatic", "aecho=0.8:0.9:1000:0.5,aecho=0.8:0.9:1800:0.3,vibrato=f=5:d=0.1"),

    // Combined presets
    ("custom_1", "asetrate=44100*1.3,aresample=44100,vibrato=f=8:d=0.3,aecho=0.8:0.9:500:0.3"),
    ("custom_2", "asetrate=44100*0.8,aresample=44100,chorus=0.7:0.9:55:0.4:0.25:2,aecho=0.8:0.9:800:0.5"),
    ("custom_3", "afftfilt=real='hypot(re,im)':imag='0',tremolo=f=5:d=0.5,aecho=0.8:0.9:300:0.3"),
    ("custom_4", "areverse,atempo=0.8,asetrate=44100*1.2,aresample=44100,areverse"),
    ("custom_5", "highpass=f=500,lowpass=f=3000,vibrato=f=10:d=0.3,aecho=0.8:0.9:500:0.5"),
];
