use crate::config::GatewayConfig;
use crate::error::TransformError;
use crate::models::{fields, Language, Orientation, RawHit, ResultItem};
use crate::text::{self, UNTITLED};
use serde_json::{Map, Value};

const ID_WIDTH: usize = 10;
/// Square tolerance of 0.1 expressed as `1 / 10`.
const SQUARE_TOLERANCE_DENOMINATOR: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub base_image_url: String,
    pub generate_titles: bool,
    pub detect_language: bool,
}

impl TransformOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            base_image_url: config.images.base_url.clone(),
            generate_titles: config.features.generate_titles,
            detect_language: config.features.detect_language,
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Turns raw engine hits into caller-facing result items.
#[derive(Debug, Clone, Default)]
pub struct ResultTransformer {
    options: TransformOptions,
}

impl ResultTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn transform(
        &self,
        hit: &RawHit,
        include_highlights: bool,
    ) -> Result<ResultItem, TransformError> {
        if hit.id.trim().is_empty() {
            return Err(TransformError::MissingId);
        }
        let source = &hit.source;
        let original_text = string_field(source, fields::RAW_TEXT)
            .ok_or_else(|| TransformError::MissingText(hit.id.clone()))?;

        let cleaned_text = text::clean(&original_text);
        let existing_title = string_field(source, fields::TITLE);
        let title = if self.options.generate_titles {
            text::generate_title(existing_title.as_deref(), &cleaned_text)
        } else {
            existing_title
                .map(|title| text::clean(&title))
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string())
        };
        let description = text::generate_description(
            string_field(source, fields::DESCRIPTION).as_deref(),
            &cleaned_text,
        );
        let language = if self.options.detect_language {
            text::detect_language(&cleaned_text)
        } else {
            Language::Unknown
        };

        let media_number = string_field(source, fields::MEDIA_ID).unwrap_or_else(|| hit.id.clone());
        let media_id = media_number.trim().parse::<u64>().unwrap_or(0);
        let database = string_field(source, fields::DATABASE).unwrap_or_default();
        let width = dimension_field(source, fields::WIDTH);
        let height = dimension_field(source, fields::HEIGHT);
        let ratio = aspect_ratio(width, height);
        let image_url = build_image_url(&self.options.base_image_url, &database, media_number.trim());

        Ok(ResultItem {
            id: hit.id.clone(),
            media_id,
            title,
            description,
            original_text,
            cleaned_text,
            photographer: string_field(source, fields::PHOTOGRAPHER),
            date: string_field(source, fields::DATE),
            width,
            height,
            database,
            thumbnail_url: image_url.clone(),
            image_url,
            score: hit.score.unwrap_or(0.0),
            aspect_ratio: ratio,
            orientation: orientation(width, height),
            language,
            highlights: (include_highlights && !hit.highlight.is_empty())
                .then(|| hit.highlight.clone()),
        })
    }
}

/// `{base}/bild/{db}/{id}/s.jpg` with the id left-padded to ten digits.
pub fn build_image_url(base_url: &str, database: &str, id: &str) -> String {
    format!(
        "{}/bild/{}/{:0>width$}/s.jpg",
        base_url.trim_end_matches('/'),
        database,
        id,
        width = ID_WIDTH
    )
}

/// `None` when the height is zero.
pub fn aspect_ratio(width: u32, height: u32) -> Option<f64> {
    (height > 0).then(|| f64::from(width) / f64::from(height))
}

/// Square when `|w/h - 1| < 0.1`, decided on the integer sides so the
/// boundary is exact.
pub fn orientation(width: u32, height: u32) -> Orientation {
    if height == 0 {
        return Orientation::Unknown;
    }
    let (width, height) = (u64::from(width), u64::from(height));
    if SQUARE_TOLERANCE_DENOMINATOR * width.abs_diff(height) < height {
        Orientation::Square
    } else if width > height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

fn string_field(source: &Map<String, Value>, name: &str) -> Option<String> {
    match source.get(name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(values) => {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

fn dimension_field(source: &Map<String, Value>, name: &str) -> u32 {
    match source.get(name) {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|value| *value >= 0.0).map(|value| value as u64))
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::NO_DESCRIPTION;
    use serde_json::json;
    use std::collections::HashMap;

    fn hit(source: Value) -> RawHit {
        RawHit {
            id: "0000123456".to_string(),
            score: Some(7.5),
            source: source.as_object().cloned().unwrap_or_default(),
            highlight: HashMap::new(),
        }
    }

    fn transformer() -> ResultTransformer {
        ResultTransformer::new(TransformOptions {
            base_image_url: "https://img.example.org/".to_string(),
            generate_titles: true,
            detect_language: true,
        })
    }

    #[test]
    fn image_url_pads_to_ten_digits() {
        assert_eq!(
            build_image_url("https://img.example.org", "st", "123456"),
            "https://img.example.org/bild/st/0000123456/s.jpg"
        );
        assert_eq!(
            build_image_url("https://img.example.org", "sp", "1234567890"),
            "https://img.example.org/bild/sp/1234567890/s.jpg"
        );
        assert_eq!(
            build_image_url("https://img.example.org", "sp", "123456789012"),
            "https://img.example.org/bild/sp/123456789012/s.jpg"
        );
    }

    #[test]
    fn orientation_thresholds() {
        assert_eq!(orientation(1000, 1000), Orientation::Square);
        assert_eq!(orientation(1090, 1000), Orientation::Square);
        assert_eq!(orientation(910, 1000), Orientation::Square);
        assert_eq!(orientation(901, 1000), Orientation::Square);
        assert_eq!(orientation(3000, 2000), Orientation::Landscape);
        assert_eq!(orientation(2000, 3000), Orientation::Portrait);
    }

    #[test]
    fn exact_ten_percent_deviation_is_not_square() {
        assert_eq!(orientation(1100, 1000), Orientation::Landscape);
        assert_eq!(orientation(900, 1000), Orientation::Portrait);
        assert_eq!(orientation(u32::MAX, u32::MAX), Orientation::Square);
    }

    #[test]
    fn zero_height_has_no_ratio() {
        assert_eq!(aspect_ratio(1200, 0), None);
        assert_eq!(orientation(1200, 0), Orientation::Unknown);
        assert_eq!(aspect_ratio(0, 800), Some(0.0));
        assert_eq!(orientation(0, 800), Orientation::Portrait);
    }

    #[test]
    fn transforms_complete_hit() {
        let raw = hit(json!({
            "bildnummer": 123456,
            "suchtext": "The harbour of Hamburg at night with the ships  \u{c2}\u{a9} imago",
            "fotografen": "Anna Berg",
            "datum": "2004-05-01",
            "breite": 3000,
            "hoehe": "2000",
            "db": "st"
        }));
        let item = transformer().transform(&raw, false).unwrap();

        assert_eq!(item.media_id, 123456);
        assert_eq!(item.cleaned_text, "The harbour of Hamburg at night with the ships");
        assert_eq!(item.title, "The harbour Hamburg night with the");
        assert_eq!(item.description, item.cleaned_text);
        assert_eq!(item.photographer.as_deref(), Some("Anna Berg"));
        assert_eq!(item.image_url, "https://img.example.org/bild/st/0000123456/s.jpg");
        assert_eq!(item.thumbnail_url, item.image_url);
        assert_eq!(item.aspect_ratio, Some(1.5));
        assert_eq!(item.orientation, Orientation::Landscape);
        assert_eq!(item.language, Language::En);
        assert_eq!(item.score, 7.5);
        assert!(item.highlights.is_none());
    }

    #[test]
    fn existing_title_and_description_are_cleaned() {
        let raw = hit(json!({
            "suchtext": "",
            "title": "  Old?s mill ",
            "description": "Mill   by the river",
        }));
        let item = transformer().transform(&raw, false).unwrap();
        assert_eq!(item.title, "Old's mill");
        assert_eq!(item.description, "Mill by the river");
        assert_eq!(item.media_id, 123456);
        assert_eq!(item.language, Language::Unknown);
        assert_eq!(item.orientation, Orientation::Unknown);
    }

    #[test]
    fn missing_optional_fields_use_fallbacks() {
        let item = transformer().transform(&hit(json!({"suchtext": ""})), true).unwrap();
        assert_eq!(item.title, UNTITLED);
        assert_eq!(item.description, NO_DESCRIPTION);
        assert!(item.photographer.is_none());
        assert!(item.highlights.is_none());
    }

    #[test]
    fn highlights_attached_only_on_request() {
        let mut raw = hit(json!({"suchtext": "mountain lake"}));
        raw.highlight
            .insert("suchtext".to_string(), vec!["<mark>mountain</mark> lake".to_string()]);

        let with = transformer().transform(&raw, true).unwrap();
        assert_eq!(
            with.highlights.unwrap()["suchtext"][0],
            "<mark>mountain</mark> lake"
        );
        assert!(transformer().transform(&raw, false).unwrap().highlights.is_none());
    }

    #[test]
    fn feature_toggles_are_respected() {
        let transformer = ResultTransformer::new(TransformOptions {
            base_image_url: "https://img.example.org".to_string(),
            generate_titles: false,
            detect_language: false,
        });
        let item = transformer
            .transform(&hit(json!({"suchtext": "the dog and the cat"})), false)
            .unwrap();
        assert_eq!(item.title, UNTITLED);
        assert_eq!(item.language, Language::Unknown);
    }

    #[test]
    fn identity_fields_are_required() {
        let mut raw = hit(json!({"suchtext": "text"}));
        raw.id = String::new();
        assert_eq!(
            transformer().transform(&raw, false),
            Err(TransformError::MissingId)
        );

        let raw = hit(json!({"title": "no text"}));
        assert_eq!(
            transformer().transform(&raw, false),
            Err(TransformError::MissingText("0000123456".to_string()))
        );
    }
}
