use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::UserError;
use crate::errors::StoreError;
use crate::storage::document_store::{Document, ID_FIELD};

/// Key field of the user collection.
pub const USERNAME_FIELD: &str = "username";

/// Partial update payload: field name to new value, merged shallowly.
pub type UserPatch = Map<String, Value>;

/// Persisted user record as returned to callers.
///
/// The named fields hold whatever the last write stored: strings on insert,
/// any JSON value once a partial update has replaced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Value,
    #[serde(default)]
    pub password: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub name: Value,
    /// Fields introduced by partial updates beyond the four above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Decode a stored document; only a missing or non-string `_id` is malformed.
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let id = doc
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::malformed(id, e))
    }

    pub fn into_document(self) -> Document {
        let mut doc = self.extra;
        doc.insert(ID_FIELD.to_string(), Value::String(self.id));
        doc.insert(USERNAME_FIELD.to_string(), self.username);
        doc.insert("password".to_string(), self.password);
        doc.insert("email".to_string(), self.email);
        doc.insert("name".to_string(), self.name);
        doc
    }
}

/// Validated fields of a user about to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
}

impl NewUser {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        doc.insert(USERNAME_FIELD.to_string(), Value::String(self.username));
        doc.insert("password".to_string(), Value::String(self.password));
        doc.insert("email".to_string(), Value::String(self.email));
        doc.insert("name".to_string(), Value::String(self.name));
        doc
    }
}

/// Create request body; every field is optional until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateUserInput {
    pub fn new(username: &str, password: &str, email: &str, name: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            email: Some(email.to_string()),
            name: Some(name.to_string()),
        }
    }

    /// All four fields must be present and non-empty.
    pub fn validate(self) -> Result<NewUser, UserError> {
        fn present(v: Option<String>) -> Result<String, UserError> {
            v.filter(|s| !s.is_empty()).ok_or(UserError::Validation)
        }
        Ok(NewUser {
            username: present(self.username)?,
            password: present(self.password)?,
            email: present(self.email)?,
            name: present(self.name)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_rejects_empty_or_missing_fields() {
        assert!(matches!(CreateUserInput::new("x", "y", "", "z").validate(), Err(UserError::Validation)));
        assert!(matches!(CreateUserInput::default().validate(), Err(UserError::Validation)));
        let ok = CreateUserInput::new("x", "y", "e", "z").validate().expect("valid");
        assert_eq!(ok.username, "x");
    }

    #[test]
    fn record_keeps_extra_fields_and_id_key() {
        let doc = match json!({"_id": "abc", "username": "u", "password": "p", "email": "e", "name": "n", "age": 3}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let rec = UserRecord::from_document(doc).expect("decodes");
        assert_eq!(rec.id, "abc");
        assert_eq!(rec.extra.get("age"), Some(&json!(3)));

        let back = serde_json::to_value(&rec).expect("encodes");
        assert_eq!(back["_id"], "abc");
        assert_eq!(back["age"], 3);
    }

    #[test]
    fn any_value_in_named_fields_decodes() {
        let doc = match json!({"_id": "abc", "username": 5, "password": "p", "email": null}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let rec = UserRecord::from_document(doc).expect("decodes");
        assert_eq!(rec.username, json!(5));
        assert_eq!(rec.email, Value::Null);
        assert_eq!(rec.name, Value::Null);
        assert_eq!(rec.clone().into_document().get("username"), Some(&json!(5)));
    }

    #[test]
    fn missing_id_is_malformed() {
        let doc = match json!({"username": "u"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        assert!(matches!(UserRecord::from_document(doc), Err(StoreError::Malformed { .. })));
    }
}
