//! Protected and candidate mark records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// How a mark is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Text,
    Shape,
    #[default]
    #[serde(other)]
    Composite,
}

impl MarkKind {
    /// Label used in report prompts.
    pub fn label(&self) -> &'static str {
        match self {
            MarkKind::Text => "문자",
            MarkKind::Shape => "도형",
            MarkKind::Composite => "도형+문자",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkKind::Text => "text",
            MarkKind::Shape => "shape",
            MarkKind::Composite => "composite",
        }
    }
}

/// Raw image bytes. Deserializes from base64, a `data:` URL or `\x` hex;
/// serializes to base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkImage(Vec<u8>);

impl MarkImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl std::fmt::Debug for MarkImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarkImage({} bytes)", self.0.len())
    }
}

impl TryFrom<String> for MarkImage {
    type Error = markguard_llm::LlmError;

    fn try_from(payload: String) -> std::result::Result<Self, Self::Error> {
        markguard_llm::image::decode_image_payload(&payload).map(MarkImage)
    }
}

impl From<MarkImage> for String {
    fn from(image: MarkImage) -> Self {
        markguard_llm::image::encode_image(&image.0)
    }
}

/// The mark whose rights are being defended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedMark {
    pub registration_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: MarkKind,
    /// Nice classes, `|`-separated.
    #[serde(default)]
    pub class_codes: String,
    #[serde(default)]
    pub image: Option<MarkImage>,
    #[serde(default)]
    pub image_vector: Vec<f32>,
    #[serde(default)]
    pub owner_no: Option<i64>,
    /// Designated goods, comma-separated.
    #[serde(default)]
    pub product_kinds: String,
}

/// Marketplace taxonomy of a collected listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCategories {
    #[serde(default)]
    pub large: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub small: String,
}

/// A mark collected from a marketplace listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMark {
    pub mark_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: MarkKind,
    #[serde(default)]
    pub class_codes: String,
    #[serde(default)]
    pub image: Option<MarkImage>,
    #[serde(default)]
    pub image_vector: Vec<f32>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_page_url: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub categories: ProductCategories,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

fn check_common(
    role: &'static str,
    id: &str,
    name: &str,
    image: Option<&MarkImage>,
    vector: &[f32],
) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingIdentifier { role });
    }
    let has_image = image.is_some_and(|i| !i.as_bytes().is_empty());
    if name.trim().is_empty() && !has_image {
        return Err(ValidationError::NothingToCompare {
            role,
            id: id.to_string(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFiniteVector {
            role,
            id: id.to_string(),
        });
    }
    Ok(())
}

impl ProtectedMark {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_common(
            "protected",
            &self.registration_no,
            &self.name,
            self.image.as_ref(),
            &self.image_vector,
        )
    }
}

impl CandidateMark {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_common(
            "candidate",
            &self.mark_no,
            &self.name,
            self.image.as_ref(),
            &self.image_vector,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_kind_is_composite() {
        let mark: ProtectedMark = serde_json::from_value(json!({
            "registration_no": "40-1",
            "name": "마크",
            "kind": "hybrid",
        }))
        .unwrap();
        assert_eq!(mark.kind, MarkKind::Composite);
        assert_eq!(mark.kind.label(), "도형+문자");
    }

    #[test]
    fn image_accepts_hex_and_reserializes_as_base64() {
        let mark: CandidateMark = serde_json::from_value(json!({
            "mark_no": "c-1",
            "image": "\\x89504e47",
        }))
        .unwrap();
        let image = mark.image.clone().unwrap();
        assert_eq!(image.as_bytes(), &[0x89, 0x50, 0x4e, 0x47]);
        let back = serde_json::to_value(&mark).unwrap();
        assert_eq!(back["image"], "iVBORw==");
    }

    #[test]
    fn validation_requires_identity_and_content() {
        let mut mark = ProtectedMark {
            registration_no: "40-1".into(),
            name: "마크가드".into(),
            kind: MarkKind::Text,
            class_codes: String::new(),
            image: None,
            image_vector: vec![0.1, 0.2],
            owner_no: None,
            product_kinds: String::new(),
        };
        assert!(mark.validate().is_ok());

        mark.name = "  ".into();
        assert!(matches!(
            mark.validate(),
            Err(ValidationError::NothingToCompare { .. })
        ));

        mark.image = Some(MarkImage::new(vec![1, 2, 3]));
        assert!(mark.validate().is_ok());

        mark.image_vector.push(f32::NAN);
        assert!(matches!(
            mark.validate(),
            Err(ValidationError::NonFiniteVector { .. })
        ));

        mark.registration_no.clear();
        assert!(matches!(
            mark.validate(),
            Err(ValidationError::MissingIdentifier { .. })
        ));
    }
}
