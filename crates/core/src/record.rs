//! File metadata records.
//!
//! One record exists per stored artifact. An *original* record
//! (`version == "original"`, no `original_id`) owns zero or more
//! *derivative* records; a derivative points back via `original_id` and has
//! no versions of its own. The serialized form of [`FileRecord`] is the
//! JSON shape handed to web adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::ORIGINAL_VERSION;

/// Metadata for one stored artifact (an original upload or a derived
/// version).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Store-assigned numeric id.
    pub id: i64,
    /// Logical collection this file belongs to. Not part of the exposed
    /// JSON shape.
    #[serde(skip)]
    pub namespace: String,
    /// MD5 of the stored payload bytes (content identity, not the key).
    pub md5: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    /// Name of the original uploaded file, including extension.
    pub file_name: String,
    pub description: Option<String>,
    /// Download URL, filled in by the action layer. Omitted for image
    /// originals whose payload is not stored.
    pub href: Option<String>,
    /// Set iff the payload decoded as an image.
    pub image_format: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    /// Payload size in bytes.
    pub length: i64,
    pub mime_type: String,
    /// Points to the original this record was derived from; unset on
    /// originals.
    pub original_id: Option<i64>,
    /// `"original"` or a version name such as `"480"`.
    pub version: String,
    /// Lightweight descriptors of derived versions. Populated only on
    /// originals; derivatives leave it empty.
    #[serde(default)]
    pub versions: Vec<VersionDescriptor>,
}

impl FileRecord {
    /// Whether this record is an as-uploaded original.
    pub fn is_original(&self) -> bool {
        self.original_id.is_none()
    }
}

/// Lightweight reference to a derived version, embedded in its original's
/// record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub id: i64,
    pub version: String,
    pub href: Option<String>,
}

/// Attributes for a record about to be created. The store assigns `id` and
/// `created`.
#[derive(Clone, Debug)]
pub struct NewFileRecord {
    pub namespace: String,
    pub md5: String,
    pub file_name: String,
    pub description: Option<String>,
    pub length: i64,
    pub mime_type: String,
    pub image_format: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub version: String,
    pub original_id: Option<i64>,
}

impl NewFileRecord {
    /// A plain original record with no image attributes.
    pub fn original(
        namespace: impl Into<String>,
        md5: impl Into<String>,
        file_name: impl Into<String>,
        length: i64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            md5: md5.into(),
            file_name: file_name.into(),
            description: None,
            length,
            mime_type: mime_type.into(),
            image_format: None,
            image_width: None,
            image_height: None,
            version: ORIGINAL_VERSION.to_string(),
            original_id: None,
        }
    }
}

/// Partial metadata update. Only fields present in the patch change;
/// payload bytes and storage keys are immutable after creation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecordPatch {
    pub file_name: Option<String>,
    pub description: Option<String>,
}

/// Fields a caller may never change: identity-bearing or server-computed.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "md5",
    "created",
    "length",
    "mime_type",
    "version",
    "original_id",
    "image_format",
    "image_width",
    "image_height",
    "href",
    "versions",
];

impl RecordPatch {
    /// Build a patch from caller-supplied JSON.
    ///
    /// Identity-bearing and server-computed fields are rejected; other
    /// unknown fields are ignored so integrators can post extra form data
    /// alongside the metadata.
    pub fn from_json(value: &Value) -> crate::Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| crate::Error::InvalidPatch("expected a JSON object".to_string()))?;
        for field in PROTECTED_FIELDS {
            if map.contains_key(*field) {
                return Err(crate::Error::InvalidPatch(format!(
                    "field {field:?} cannot be updated"
                )));
            }
        }
        serde_json::from_value(value.clone())
            .map_err(|e| crate::Error::InvalidPatch(e.to_string()))
    }

    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.description.is_none()
    }
}

/// Filters for listing a namespace. All present fields must match.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListFilter {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn sample_record() -> FileRecord {
        FileRecord {
            id: 7,
            namespace: "tenant1".to_string(),
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            created: datetime!(2026-01-15 10:30:00 UTC),
            file_name: "photo.jpg".to_string(),
            description: None,
            href: Some("https://example.test/tenant1/7/original".to_string()),
            image_format: Some("jpeg".to_string()),
            image_width: Some(1200),
            image_height: Some(800),
            length: 52288,
            mime_type: "image/jpeg".to_string(),
            original_id: None,
            version: "original".to_string(),
            versions: vec![VersionDescriptor {
                id: 8,
                version: "480".to_string(),
                href: Some("https://example.test/tenant1/8/480".to_string()),
            }],
        }
    }

    #[test]
    fn test_record_json_shape() {
        let value = serde_json::to_value(sample_record()).unwrap();
        let obj = value.as_object().unwrap();
        for field in [
            "id",
            "md5",
            "created",
            "file_name",
            "description",
            "href",
            "image_format",
            "image_width",
            "image_height",
            "length",
            "mime_type",
            "original_id",
            "version",
            "versions",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        // The namespace is internal and never serialized.
        assert!(!obj.contains_key("namespace"));
        assert_eq!(value["versions"][0]["version"], "480");
    }

    #[test]
    fn test_patch_accepts_mutable_fields() {
        let patch = RecordPatch::from_json(&json!({
            "file_name": "renamed.jpg",
            "description": "a knife",
            "room_id": 4,
        }))
        .unwrap();
        assert_eq!(patch.file_name.as_deref(), Some("renamed.jpg"));
        assert_eq!(patch.description.as_deref(), Some("a knife"));
    }

    #[test]
    fn test_patch_rejects_identity_fields() {
        for field in ["id", "md5", "version", "original_id", "length"] {
            let result = RecordPatch::from_json(&json!({ field: "x" }));
            assert!(result.is_err(), "field {field} should be rejected");
        }
    }

    #[test]
    fn test_patch_rejects_non_object() {
        assert!(RecordPatch::from_json(&json!("nope")).is_err());
    }
}
