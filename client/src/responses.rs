use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Informational or error message attached to every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub code: i64,
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// The `{success, errors, messages, result}` wrapper of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// A missing flag counts as success; only an explicit `false` fails.
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Message>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_info: Option<Value>,
}

fn default_success() -> bool {
    true
}

impl Envelope {
    /// Successful envelope around a bare result value.
    pub fn from_result(result: Value) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            messages: Vec::new(),
            result,
            result_info: None,
        }
    }

    /// Collapse an array result to its first element and drop paging
    /// metadata. Non-array results are left alone.
    pub fn into_single(mut self) -> Self {
        if let Value::Array(items) = &mut self.result {
            self.result = if items.is_empty() {
                Value::Null
            } else {
                items.swap_remove(0)
            };
            self.result_info = None;
        }
        self
    }

    /// Decode the elements of an array result. Any other result has no items.
    pub fn items<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        match &self.result {
            Value::Array(items) => items
                .iter()
                .map(|item| T::deserialize(item).map_err(Into::into))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    pub fn result_as<R: DeserializeOwned>(&self) -> Result<R> {
        Ok(R::deserialize(&self.result)?)
    }
}

/// An image stored in Cloudflare Images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    /// Absent for draft images created through a direct upload URL.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub uploaded: Option<DateTime<Utc>>,
    #[serde(rename = "requireSignedURLs", default)]
    pub require_signed_urls: bool,
    /// User modifiable key-value store.
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// URLs of the delivery variants.
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListImagesResult {
    /// Pass back as `continuation_token` to fetch the next page. Empty or
    /// missing on the last page.
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl ListImagesResult {
    /// Token for the next page, if there is one.
    pub fn next_page(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectUploadUrl {
    /// Identifier the uploaded image will get.
    pub id: String,
    /// URL an unauthenticated client can upload one image to.
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
}

/// Result of a delete call. The API returns an opaque, usually empty,
/// object; a null or missing result decodes as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeletedImage(pub Map<String, Value>);

impl<'de> Deserialize<'de> for DeletedImage {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Option::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(DeletedImage(fields.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_defaults() {
        let envelope: Envelope = serde_json::from_value(json!({ "result": [1, 2] })).unwrap();
        assert!(envelope.success);
        assert!(envelope.errors.is_empty());
        assert!(envelope.messages.is_empty());
        assert_eq!(envelope.items::<u32>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_envelope_failure_messages() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": false,
            "errors": [{ "code": 5400, "message": "bad request", "type": "validation" }],
            "messages": [],
            "result": null
        }))
        .unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.errors[0].code, 5400);
        assert_eq!(envelope.errors[0].kind.as_deref(), Some("validation"));
    }

    #[test]
    fn test_into_single_takes_first_element() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": true,
            "result": [{ "id": "a" }, { "id": "b" }],
            "result_info": { "page": 1 }
        }))
        .unwrap();

        let single = envelope.into_single();
        assert_eq!(single.result, json!({ "id": "a" }));
        assert!(single.result_info.is_none());
        assert!(single.items::<Value>().unwrap().is_empty());
    }

    #[test]
    fn test_into_single_keeps_objects() {
        let envelope = Envelope {
            result_info: Some(json!({ "page": 1 })),
            ..Envelope::from_result(json!({ "id": "a" }))
        };
        let single = envelope.clone().into_single();
        assert_eq!(single, envelope);

        let empty = Envelope::from_result(json!([])).into_single();
        assert_eq!(empty.result, Value::Null);
    }

    #[test]
    fn test_image_wire_format() {
        let image: Image = serde_json::from_value(json!({
            "id": "083eb7b2-5392-4565-b69e-aff66acddd00",
            "filename": "logo.png",
            "uploaded": "2014-01-02T02:20:00.123Z",
            "requireSignedURLs": true,
            "meta": { "key": "value" },
            "variants": ["https://imagedelivery.net/hash/id/public"]
        }))
        .unwrap();

        assert!(image.require_signed_urls);
        assert_eq!(image.filename.as_deref(), Some("logo.png"));
        assert_eq!(image.meta["key"], json!("value"));
        assert!(image.uploaded.is_some());

        let draft: Image = serde_json::from_value(json!({ "id": "draft" })).unwrap();
        assert!(draft.filename.is_none());
        assert!(draft.variants.is_empty());
    }

    #[test]
    fn test_list_next_page() {
        let mut page = ListImagesResult {
            continuation_token: Some("tok".to_string()),
            images: Vec::new(),
        };
        assert_eq!(page.next_page(), Some("tok"));

        page.continuation_token = Some(String::new());
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn test_deleted_image_accepts_null_result() {
        let envelope: Envelope =
            serde_json::from_value(json!({ "success": true, "errors": [], "messages": [] }))
                .unwrap();
        let deleted: DeletedImage = envelope.result_as().unwrap();
        assert!(deleted.0.is_empty());

        let deleted: DeletedImage = serde_json::from_value(json!({ "note": "gone" })).unwrap();
        assert_eq!(deleted.0["note"], json!("gone"));
    }

    #[test]
    fn test_direct_upload_url_field_names() {
        let url: DirectUploadUrl = serde_json::from_value(json!({
            "id": "img",
            "uploadURL": "https://upload.imagedelivery.net/hash/img"
        }))
        .unwrap();
        assert_eq!(url.upload_url, "https://upload.imagedelivery.net/hash/img");
    }
}
