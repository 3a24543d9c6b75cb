//! The metadata document stored alongside each diploma.
//!
//! The document follows the common token-metadata layout (name,
//! description, image, attributes) and additionally links the stored
//! document and verification image by content address.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::record::DiplomaDetails;
use crate::types::{ContentAddress, StudentIndex};

/// A single `{trait_type, value}` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: Value,
}

impl MetadataAttribute {
    fn new(trait_type: &str, value: Value) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value,
        }
    }
}

/// The JSON metadata document for an issued diploma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub name: String,
    pub description: String,
    /// `ipfs://` URI of the verification image.
    pub image: String,
    pub attributes: Vec<MetadataAttribute>,
    #[serde(rename = "pdfCID")]
    pub pdf_cid: ContentAddress,
    #[serde(rename = "qrCID")]
    pub qr_cid: ContentAddress,
}

impl MetadataDocument {
    /// Assemble the document from the descriptive fields and the two
    /// previously stored payloads.
    pub fn build(
        index: &StudentIndex,
        details: &DiplomaDetails,
        document: &ContentAddress,
        verification_image: &ContentAddress,
    ) -> Self {
        let name = &details.student_name;
        let program = details.program.as_deref().unwrap_or_default();

        let attributes = vec![
            MetadataAttribute::new("Student Name", Value::from(name.as_str())),
            MetadataAttribute::new("Index Number", Value::from(index.as_str())),
            MetadataAttribute::new("Program", opt_text(&details.program)),
            MetadataAttribute::new("Graduation Date", opt_text(&details.graduation_date)),
            MetadataAttribute::new(
                "Total Credits (ECTS)",
                details.credits.map(Value::from).unwrap_or(Value::Null),
            ),
            MetadataAttribute::new("Final Grade", opt_text(&details.final_grade)),
            MetadataAttribute::new("University", opt_text(&details.university_name)),
            MetadataAttribute::new("Faculty", opt_text(&details.faculty_name)),
            MetadataAttribute::new(
                "Subjects",
                details
                    .subjects
                    .as_ref()
                    .map(|s| Value::from(s.to_text()))
                    .unwrap_or(Value::Null),
            ),
        ];

        Self {
            name: format!("Diploma - {}", name),
            description: format!("Official University Diploma for {}, {}", name, program),
            image: verification_image.to_uri(),
            attributes,
            pdf_cid: document.clone(),
            qr_cid: verification_image.clone(),
        }
    }

    /// Serialize to JSON bytes for content storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse a stored document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Look up an attribute value by trait type.
    pub fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }
}

fn opt_text(value: &Option<String>) -> Value {
    value
        .as_deref()
        .map(Value::from)
        .unwrap_or(Value::Null)
}
