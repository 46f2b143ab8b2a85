use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Usage rights attached to a purchased variant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum License {
    Personal,
    Commercial,
    Extended,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ImageSize {
    Square,
    Wide,
    Portrait,
}

impl ImageSize {
    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ImageSize::Square => (1200, 1200),
            ImageSize::Wide => (1920, 1080),
            ImageSize::Portrait => (1080, 1440),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageSize::Square => "Square (1:1)",
            ImageSize::Wide => "Widescreen (16:9)",
            ImageSize::Portrait => "Portrait (3:4)",
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum VideoQuality {
    #[serde(rename = "720p")]
    #[strum(serialize = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    #[strum(serialize = "1080p")]
    Hd1080,
    #[serde(rename = "4K")]
    #[strum(serialize = "4K")]
    Uhd4k,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DocumentFormat {
    Pdf,
    Epub,
    Mobi,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub size: ImageSize,
    /// Price in minor currency units.
    pub price: i64,
    pub license: License,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoVariant {
    pub quality: VideoQuality,
    pub duration_secs: u32,
    pub price: i64,
    pub license: License,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVariant {
    pub format: DocumentFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    pub price: i64,
    pub license: License,
}

/// A priced, licensed SKU of a product. The `kind` tag decides which
/// attributes exist; orders keep a copy of this value as their snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    Image(ImageVariant),
    Video(VideoVariant),
    Document(DocumentVariant),
}

impl Variant {
    pub fn price(&self) -> i64 {
        match self {
            Variant::Image(v) => v.price,
            Variant::Video(v) => v.price,
            Variant::Document(v) => v.price,
        }
    }

    pub fn license(&self) -> License {
        match self {
            Variant::Image(v) => v.license,
            Variant::Video(v) => v.license,
            Variant::Document(v) => v.license,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Image(_) => "image",
            Variant::Video(_) => "video",
            Variant::Document(_) => "document",
        }
    }

    /// Human-readable variant type used in order summaries.
    pub fn describe(&self) -> String {
        match self {
            Variant::Image(v) => {
                let (w, h) = v.size.dimensions();
                format!("{} {}x{}", v.size.label(), w, h)
            }
            Variant::Video(v) => format!("{} video", v.quality),
            Variant::Document(v) => match v.pages {
                Some(pages) => format!("{} ({} pages)", v.format, pages),
                None => v.format.to_string(),
            },
        }
    }

    pub fn matches(&self, selector: &VariantSelector) -> bool {
        match (self, selector) {
            (Variant::Image(v), VariantSelector::Image { size, license }) => {
                v.size == *size && v.license == *license
            }
            (Variant::Video(v), VariantSelector::Video { quality, license }) => {
                v.quality == *quality && v.license == *license
            }
            (Variant::Document(v), VariantSelector::Document { format, license }) => {
                v.format == *format && v.license == *license
            }
            _ => false,
        }
    }
}

/// Identifies one variant of a product by its kind-specific key and license.
/// Never carries a price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum VariantSelector {
    Image { size: ImageSize, license: License },
    Video { quality: VideoQuality, license: License },
    Document { format: DocumentFormat, license: License },
}

impl std::fmt::Display for VariantSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantSelector::Image { size, license } => write!(f, "image {size} / {license}"),
            VariantSelector::Video { quality, license } => {
                write!(f, "video {quality} / {license}")
            }
            VariantSelector::Document { format, license } => {
                write!(f, "document {format} / {license}")
            }
        }
    }
}
