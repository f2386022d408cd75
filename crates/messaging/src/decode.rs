//! Account-creation event decoding.
//!
//! Two body shapes are accepted:
//!
//! ```text
//! // direct payload
//! { "userId": 10, "userName": "Tester", "salary": "3000000" }
//! // relay-wrapped: the real payload is a JSON string under "Message"
//! { "Message": "{\"userId\":10,...}", "Type": "Notification", ... }
//! ```
//!
//! Decoding is side-effect free and touches no store.

use serde_json::Value as JsonValue;
use thiserror::Error;

use mintbank_core::UserId;

/// Field name carrying the relay-wrapped inner payload.
const RELAY_FIELD: &str = "Message";

/// A decoded request to provision an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub user_id: UserId,
    pub user_name: Option<String>,
    /// `None` (absent or explicit null) selects salary-random synthesis.
    pub salary: Option<i64>,
}

/// Decode failure for an event body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required field is absent or not numeric.
    #[error("missing or non-numeric field: {0}")]
    MissingField(&'static str),

    /// The body (or the relay-wrapped inner payload) is not valid JSON,
    /// or a field value cannot be interpreted.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Parse a raw queue message body into a [`ProvisioningRequest`],
/// transparently unwrapping one layer of relay envelope.
pub fn decode(raw: &[u8]) -> Result<ProvisioningRequest, DecodeError> {
    let outer: JsonValue = serde_json::from_slice(raw)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let payload = match outer.get(RELAY_FIELD).and_then(JsonValue::as_str) {
        Some(inner) => serde_json::from_str(inner)
            .map_err(|e| DecodeError::MalformedPayload(format!("relay envelope: {e}")))?,
        None => outer,
    };

    let user_id = integer_field(&payload, "userId")
        .map(UserId::new)
        .ok_or(DecodeError::MissingField("userId"))?;

    let user_name = payload
        .get("userName")
        .and_then(JsonValue::as_str)
        .map(str::to_owned);

    let salary = match payload.get("salary") {
        None | Some(JsonValue::Null) => None,
        Some(value) => Some(amount_field(value, "salary")?),
    };

    Ok(ProvisioningRequest {
        user_id,
        user_name,
        salary,
    })
}

/// An integer, given either as a JSON number or a numeric string.
fn integer_field(payload: &JsonValue, field: &str) -> Option<i64> {
    let value = payload.get(field)?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse::<i64>().ok()))
}

/// A currency amount: JSON number or decimal-as-string, truncated to
/// whole units.
fn amount_field(value: &JsonValue, field: &str) -> Result<i64, DecodeError> {
    if let Some(units) = value.as_i64() {
        return Ok(units);
    }
    if let Some(s) = value.as_str() {
        if let Ok(units) = s.parse::<i64>() {
            return Ok(units);
        }
        if let Ok(decimal) = s.parse::<f64>() {
            return Ok(decimal as i64);
        }
    }
    Err(DecodeError::MalformedPayload(format!(
        "field {field} is not a currency amount: {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_payload_decodes() {
        let request = decode(br#"{"userId":10,"userName":"Tester","salary":"3000000"}"#).unwrap();
        assert_eq!(
            request,
            ProvisioningRequest {
                user_id: UserId::new(10),
                user_name: Some("Tester".to_string()),
                salary: Some(3_000_000),
            }
        );
    }

    #[test]
    fn relay_wrapped_payload_decodes_identically() {
        let direct = decode(br#"{"userId":10,"userName":"Tester","salary":"3000000"}"#).unwrap();
        let wrapped = decode(
            br#"{"Type":"Notification","Message":"{\"userId\":10,\"userName\":\"Tester\",\"salary\":\"3000000\"}"}"#,
        )
        .unwrap();
        assert_eq!(direct, wrapped);
    }

    #[test]
    fn user_name_and_salary_are_optional() {
        let request = decode(br#"{"userId":10}"#).unwrap();
        assert_eq!(request.user_id, UserId::new(10));
        assert_eq!(request.user_name, None);
        assert_eq!(request.salary, None);
    }

    #[test]
    fn explicit_null_salary_means_unset() {
        let request = decode(br#"{"userId":10,"salary":null}"#).unwrap();
        assert_eq!(request.salary, None);
    }

    #[test]
    fn numeric_salary_and_string_user_id_are_accepted() {
        let request = decode(br#"{"userId":"77","salary":2500000}"#).unwrap();
        assert_eq!(request.user_id, UserId::new(77));
        assert_eq!(request.salary, Some(2_500_000));
    }

    #[test]
    fn missing_user_id_is_rejected() {
        assert_eq!(
            decode(br#"{"userName":"Tester"}"#).unwrap_err(),
            DecodeError::MissingField("userId")
        );
    }

    #[test]
    fn non_numeric_user_id_is_rejected() {
        assert_eq!(
            decode(br#"{"userId":"not-a-number"}"#).unwrap_err(),
            DecodeError::MissingField("userId")
        );
    }

    #[test]
    fn malformed_outer_json_is_rejected() {
        assert!(matches!(
            decode(b"{not json").unwrap_err(),
            DecodeError::MalformedPayload(_)
        ));
    }

    #[test]
    fn malformed_inner_json_is_rejected() {
        assert!(matches!(
            decode(br#"{"Message":"{not json"}"#).unwrap_err(),
            DecodeError::MalformedPayload(_)
        ));
    }

    #[test]
    fn unparseable_salary_is_rejected() {
        assert!(matches!(
            decode(br#"{"userId":10,"salary":"lots"}"#).unwrap_err(),
            DecodeError::MalformedPayload(_)
        ));
    }

    #[test]
    fn non_string_relay_field_falls_back_to_the_outer_object() {
        // "Message" holding a non-string is treated as an ordinary field.
        let request = decode(br#"{"Message":42,"userId":5}"#).unwrap();
        assert_eq!(request.user_id, UserId::new(5));
    }
}
