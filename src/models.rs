use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClassifiedError;
use crate::prompt::{Style, VARIATIONS};

/// One batch always fills exactly this many slots, one per variation.
pub const SLOT_COUNT: usize = VARIATIONS.len();

/// A transport-ready source image: raw bytes plus the content type the
/// uploader declared. Never re-encoded or resized on this side.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub mime_type: String,
    pub data: Bytes,
}

/// One generated image as returned by the model: base64 payload + mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: String,
}

impl GeneratedImage {
    /// Renderable form handed to the browser.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Which of the two source images an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    Person,
    Outfit,
}

impl AssetRole {
    pub fn parse(role: &str) -> Option<AssetRole> {
        match role {
            "person" => Some(AssetRole::Person),
            "outfit" => Some(AssetRole::Outfit),
            _ => None,
        }
    }
}

/// One user workflow: two source images, a style selection, and up to ten
/// generated result slots. Lives only in the in-memory store.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub person: Option<ImageAsset>,
    pub outfit: Option<ImageAsset>,
    pub base_style: Style,
    pub accent_style: Option<Style>,
    pub slots: Vec<Option<GeneratedImage>>,
    pub progress: f64,
    pub error: Option<ClassifiedError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            person: None,
            outfit: None,
            base_style: Style::Casual,
            accent_style: None,
            slots: vec![None; SLOT_COUNT],
            progress: 0.0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Picking a base style that matches the current accent resets the accent
    /// to none. Base and accent are never allowed to be equal.
    pub fn set_base_style(&mut self, style: Style) {
        if self.accent_style == Some(style) {
            self.accent_style = None;
        }
        self.base_style = style;
        self.touch();
    }

    /// An accent equal to the current base is rejected back to none.
    pub fn set_accent_style(&mut self, accent: Option<Style>) {
        self.accent_style = accent.filter(|a| *a != self.base_style);
        self.touch();
    }

    /// Replaces one source image, which restarts the workflow: results,
    /// progress and error state all go back to their initial state.
    pub fn set_asset(&mut self, role: AssetRole, asset: ImageAsset) {
        match role {
            AssetRole::Person => self.person = Some(asset),
            AssetRole::Outfit => self.outfit = Some(asset),
        }
        self.reset_results();
    }

    /// Clears slots, progress and error state, as at batch start.
    pub fn reset_results(&mut self) {
        self.slots = vec![None; SLOT_COUNT];
        self.progress = 0.0;
        self.error = None;
        self.touch();
    }

    /// Records one freshly completed batch slot and the progress it carries.
    pub fn record_slot(&mut self, index: usize, image: GeneratedImage, fraction: f64) {
        self.slots[index] = Some(image);
        self.progress = fraction;
        self.touch();
    }

    /// Overwrites exactly one slot (redo). Other slots and the progress
    /// fraction stay as they were.
    pub fn replace_slot(&mut self, index: usize, image: GeneratedImage) {
        self.slots[index] = Some(image);
        self.error = None;
        self.touch();
    }

    pub fn set_error(&mut self, error: ClassifiedError) {
        self.error = Some(error);
        self.touch();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            base_style: self.base_style,
            accent_style: self.accent_style,
            has_person_image: self.person.is_some(),
            has_outfit_image: self.outfit.is_some(),
            images: self.slots.iter().map(|s| s.as_ref().map(GeneratedImage::data_uri)).collect(),
            progress: self.progress,
            error: self.error.as_ref().map(|e| ErrorView {
                error: e.kind(),
                message: e.to_string(),
            }),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Download name: `ai-style-<base>[-accent-<accent>]-<index+1>.png`.
pub fn download_filename(base: Style, accent: Option<Style>, index: usize) -> String {
    match accent {
        Some(accent) => format!("ai-style-{}-accent-{}-{}.png", base.slug(), accent.slug(), index + 1),
        None => format!("ai-style-{}-{}.png", base.slug(), index + 1),
    }
}

/// What the front-end sees. Source image bytes are never echoed back, only
/// presence flags; result slots come across as data URIs.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub base_style: Style,
    pub accent_style: Option<Style>,
    pub has_person_image: bool,
    pub has_outfit_image: bool,
    pub images: Vec<Option<String>>,
    pub progress: f64,
    pub error: Option<ErrorView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StyleRequest {
    #[serde(default)]
    pub base_style: Option<Style>,
    /// Accent comes across as a label with "None" as the explicit sentinel.
    #[serde(default)]
    pub accent_style: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image(tag: &str) -> GeneratedImage {
        GeneratedImage { mime_type: "image/png".into(), data: tag.to_string() }
    }

    #[test]
    fn base_equal_to_accent_resets_accent() {
        let mut session = Session::new();
        session.set_base_style(Style::Formal);
        session.set_accent_style(Some(Style::EveningWear));
        assert_eq!(session.accent_style, Some(Style::EveningWear));

        session.set_base_style(Style::EveningWear);
        assert_eq!(session.base_style, Style::EveningWear);
        assert_eq!(session.accent_style, None);
    }

    #[test]
    fn accent_equal_to_base_is_rejected() {
        let mut session = Session::new();
        session.set_base_style(Style::Formal);
        session.set_accent_style(Some(Style::Formal));
        assert_eq!(session.accent_style, None);
    }

    #[test]
    fn replace_slot_leaves_other_slots_untouched() {
        let mut session = Session::new();
        for index in 0..5 {
            session.record_slot(index, image(&format!("slot-{}", index)), (index + 1) as f64 / 10.0);
        }
        let before = session.slots.clone();

        session.replace_slot(2, image("redone"));

        for (index, slot) in session.slots.iter().enumerate() {
            if index == 2 {
                assert_eq!(slot, &Some(image("redone")));
            } else {
                assert_eq!(slot, &before[index]);
            }
        }
        assert_eq!(session.progress, 0.5);
    }

    #[test]
    fn replacing_an_asset_restarts_the_workflow() {
        let mut session = Session::new();
        session.record_slot(0, image("one"), 0.1);
        session.set_error(ClassifiedError::Unknown);

        let asset = ImageAsset { mime_type: "image/jpeg".into(), data: Bytes::from_static(b"jpg") };
        session.set_asset(AssetRole::Person, asset);

        assert!(session.person.is_some());
        assert!(session.slots.iter().all(Option::is_none));
        assert_eq!(session.progress, 0.0);
        assert_eq!(session.error, None);
    }

    #[test]
    fn download_filename_follows_the_convention() {
        assert_eq!(download_filename(Style::Formal, None, 0), "ai-style-formal-1.png");
        assert_eq!(
            download_filename(Style::StudioPortrait, Some(Style::EveningWear), 9),
            "ai-style-studio-portrait-accent-evening-wear-10.png"
        );
    }

    #[test]
    fn data_uri_embeds_mime_type_and_payload() {
        assert_eq!(image("QUJD").data_uri(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn view_hides_asset_bytes_but_reports_presence() {
        let mut session = Session::new();
        let asset = ImageAsset { mime_type: "image/png".into(), data: Bytes::from_static(b"png") };
        session.set_asset(AssetRole::Outfit, asset);
        session.record_slot(0, image("QUJD"), 0.1);

        let view = session.view();
        assert!(!view.has_person_image);
        assert!(view.has_outfit_image);
        assert_eq!(view.images[0].as_deref(), Some("data:image/png;base64,QUJD"));
        assert_eq!(view.images[1], None);
    }
}
