// src/services/style_catalog.rs
use crate::errors::RedesignError;
use crate::models::StyleEntry;

const STANDARD_STYLES: [StyleEntry; 8] = [
    StyleEntry {
        id: "modern",
        prompt_fragment: "modern bathroom, clean lines, marble countertops, frameless glass shower, matte black fixtures, natural light, luxury finishes",
    },
    StyleEntry {
        id: "industrial",
        prompt_fragment: "industrial bathroom, exposed brick, concrete floors, black metal fixtures, edison bulbs, raw materials, urban loft style",
    },
    StyleEntry {
        id: "minimalist",
        prompt_fragment: "minimalist bathroom, white walls, floating vanity, walk-in shower, simple fixtures, clean design, uncluttered space",
    },
    StyleEntry {
        id: "coastal",
        prompt_fragment: "coastal bathroom, blue and white palette, light wood, beadboard, nautical accents, sea glass, airy and bright",
    },
    StyleEntry {
        id: "vintage",
        prompt_fragment: "vintage bathroom, clawfoot tub, hexagonal tile, brass fixtures, wainscoting, classic elegance, period details",
    },
    StyleEntry {
        id: "scandinavian",
        prompt_fragment: "scandinavian bathroom, light wood, white tile, warm minimalism, natural textures, hygge style, clean and cozy",
    },
    StyleEntry {
        id: "mediterranean",
        prompt_fragment: "mediterranean bathroom, terracotta tile, arched mirrors, wrought iron fixtures, warm earth tones, rustic elegance",
    },
    StyleEntry {
        id: "japanese",
        prompt_fragment: "japanese bathroom, soaking tub, natural stone, bamboo accents, zen garden influence, minimalist tranquility, warm wood tones",
    },
];

/// Fixed style presets, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    entries: Vec<StyleEntry>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self {
            entries: STANDARD_STYLES.to_vec(),
        }
    }

    pub fn resolve(&self, style_id: &str) -> Result<&'static str, RedesignError> {
        self.entries
            .iter()
            .find(|entry| entry.id == style_id)
            .map(|entry| entry.prompt_fragment)
            .ok_or_else(|| RedesignError::UnknownStyle(style_id.to_string()))
    }

    pub fn list_ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.id).collect()
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new()
    }
}
