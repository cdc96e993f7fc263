use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The signed-in user as the client knows it.
///
/// Derived from the session token claims unless the identity service returns
/// a richer object. Missing fields default to empty values so a reduced claim
/// set still yields a usable identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(
        default,
        alias = "role",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub roles: Option<Vec<String>>,
    #[serde(
        default,
        alias = "isTwoFacAuth",
        skip_serializing_if = "Option::is_none"
    )]
    pub two_factor_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Identity {
    /// Name to greet the user with, falling back to username then email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        match self.username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => username.to_string(),
            _ => self.email.clone(),
        }
    }
}

/// Renders numeric ids as strings; anything else becomes empty.
pub(crate) fn id_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(id_value_to_string(&value).unwrap_or_default())
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| roles_from_value(&value)))
}

pub(crate) fn roles_from_value(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(role) if !role.is_empty() => Some(vec![role.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(ToString::to_string))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::Identity;
    use serde_json::json;

    #[test]
    fn deserializes_service_user_object() {
        let identity: Identity = serde_json::from_value(json!({
            "id": 42,
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "role": "USER",
            "twoFactorEnabled": true,
            "provider": "google",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(identity.id, "42");
        assert_eq!(identity.roles, Some(vec!["USER".to_string()]));
        assert_eq!(identity.two_factor_enabled, Some(true));
        assert_eq!(identity.provider.as_deref(), Some("google"));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let identity: Identity = serde_json::from_value(json!({})).unwrap();
        assert_eq!(identity, Identity::default());
    }

    #[test]
    fn serialized_form_round_trips_through_slot_format() {
        let identity = Identity {
            id: "7".to_string(),
            email: "user@example.com".to_string(),
            username: Some("user".to_string()),
            roles: Some(vec!["ADMIN".to_string(), "USER".to_string()]),
            ..Identity::default()
        };
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("\"firstName\""));
        assert!(!json.contains("provider"));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn display_name_falls_back() {
        let mut identity = Identity {
            email: "user@example.com".to_string(),
            ..Identity::default()
        };
        assert_eq!(identity.display_name(), "user@example.com");
        identity.username = Some("user".to_string());
        assert_eq!(identity.display_name(), "user");
        identity.first_name = "Ada".to_string();
        assert_eq!(identity.display_name(), "Ada");
    }
}
