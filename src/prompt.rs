use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Invariant task description sent with every generation request. Image 1 is
/// the person, image 2 the outfit.
const TASK: &str = "Take the outfit from image 2 and place it on the person from image 1, \
keeping their original face and facial features unchanged. Create a bright, high-resolution \
(4K) realistic photo with natural skin tone, consistent body proportions, and lifelike fabric \
texture.";

/// Closed set of base/accent scene styles offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Casual,
    Formal,
    StudioPortrait,
    OutdoorCasual,
    EveningWear,
}

impl Style {
    /// Parses a UI style label. Unrecognized labels fall back to `Casual`
    /// rather than failing, so stale front-end strings degrade gracefully.
    pub fn parse(label: &str) -> Style {
        match label.trim() {
            "Formal" => Style::Formal,
            "Studio Portrait" => Style::StudioPortrait,
            "Outdoor Casual" => Style::OutdoorCasual,
            "Evening Wear" => Style::EveningWear,
            _ => Style::Casual,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Style::Casual => "Casual",
            Style::Formal => "Formal",
            Style::StudioPortrait => "Studio Portrait",
            Style::OutdoorCasual => "Outdoor Casual",
            Style::EveningWear => "Evening Wear",
        }
    }

    /// Lowercase hyphenated form used in download filenames.
    pub fn slug(&self) -> String {
        self.label().to_ascii_lowercase().replace(' ', "-")
    }

    fn setting_clause(&self) -> &'static str {
        match self {
            Style::Casual => {
                "The scene is a relaxed everyday setting with soft natural daylight."
            }
            Style::Formal => {
                "The scene is an elegant formal venue, like an upscale hotel lobby, with refined warm lighting."
            }
            Style::StudioPortrait => {
                "The scene is a professional photo studio with a seamless neutral backdrop and controlled softbox lighting."
            }
            Style::OutdoorCasual => {
                "The scene is outdoors on a sunlit city street with natural afternoon light and a softly blurred background."
            }
            Style::EveningWear => {
                "The scene is an evening setting with warm ambient lights and a gently blurred nightlife backdrop."
            }
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Style {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Style {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Style, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Style::parse(&label))
    }
}

/// Accent labels use "None" as an explicit sentinel in the UI.
pub fn parse_accent(label: Option<&str>) -> Option<Style> {
    match label.map(str::trim) {
        None | Some("") | Some("None") => None,
        Some(other) => Some(Style::parse(other)),
    }
}

/// One of the ten fixed shot compositions a batch walks through.
pub struct Variation {
    pub label: &'static str,
    composition: &'static str,
    /// The graffiti floor-sit composition describes its own scene, so the
    /// style setting clause is omitted for it. Keep this a flag on the table
    /// entry, not a string match against the composition text.
    suppress_setting: bool,
}

pub const VARIATIONS: [Variation; 10] = [
    Variation {
        label: "full body",
        composition: "A full-body shot from the front, standing naturally with relaxed shoulders, the entire outfit visible from head to shoes.",
        suppress_setting: false,
    },
    Variation {
        label: "close-up",
        composition: "A close-up portrait framed from the chest up, focused on the face and the upper part of the outfit.",
        suppress_setting: false,
    },
    Variation {
        label: "profile",
        composition: "A side-profile shot, standing upright with the head turned slightly toward the camera.",
        suppress_setting: false,
    },
    Variation {
        label: "seated",
        composition: "Seated on a simple chair, leaning forward slightly with elbows resting on the knees.",
        suppress_setting: false,
    },
    Variation {
        label: "mirror selfie",
        composition: "A natural mirror selfie, phone held in one hand, looking toward the mirror in soft afternoon light.",
        suppress_setting: false,
    },
    Variation {
        label: "walking",
        composition: "A candid mid-stride walking shot photographed from a few meters away.",
        suppress_setting: false,
    },
    Variation {
        label: "leaning",
        composition: "Leaning casually against a wall with arms loosely crossed.",
        suppress_setting: false,
    },
    Variation {
        label: "over-the-shoulder",
        composition: "An over-the-shoulder glance back toward the camera, showing the back and side of the outfit.",
        suppress_setting: false,
    },
    Variation {
        label: "low angle",
        composition: "A slightly low-angle three-quarter shot emphasizing the silhouette of the outfit.",
        suppress_setting: false,
    },
    Variation {
        label: "graffiti floor sit",
        composition: "Sitting on a concrete floor in front of a large graffiti-covered wall, knees bent and arms resting on them, shot in an urban streetwear editorial style.",
        suppress_setting: true,
    },
];

/// Assembles the full prompt for one variation slot. Pure and deterministic:
/// identical arguments always produce the identical string, which is what
/// makes per-slot redo reproducible.
pub fn build_prompt(base: Style, index: usize, accent: Option<Style>) -> String {
    let variation = &VARIATIONS[index];
    let mut prompt = String::from(TASK);
    if !variation.suppress_setting {
        prompt.push(' ');
        prompt.push_str(base.setting_clause());
        if let Some(accent) = accent {
            prompt.push(' ');
            prompt.push_str(&format!(
                "Blend in subtle {} influences in the styling and mood.",
                accent.label()
            ));
        }
    }
    prompt.push(' ');
    prompt.push_str(variation.composition);
    prompt
}
