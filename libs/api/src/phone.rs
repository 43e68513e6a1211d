use serde::{Deserialize, Serialize};

/// Store-assigned record identity. Monotonically increasing, never reused.
pub type PhoneId = u64;

/// A persisted phone number record.
///
/// The same shape travels over the listener channel as a broadcast event;
/// inbound events may omit `id`, in which case it reads as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phone {
    #[serde(default)]
    pub id: PhoneId,
    pub number: String,
}

impl Phone {
    pub fn new(id: PhoneId, number: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
        }
    }
}

/// Record payload without identity: what inserts and updates consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhone {
    pub number: String,
}

impl NewPhone {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
        }
    }

    /// Attach a store-assigned id.
    pub fn with_id(self, id: PhoneId) -> Phone {
        Phone {
            id,
            number: self.number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_without_id_defaults_to_zero() {
        let phone: Phone = serde_json::from_str(r#"{"number":"555-1"}"#).unwrap();
        assert_eq!(phone, Phone::new(0, "555-1"));
    }

    #[test]
    fn phone_serializes_id_and_number() {
        let json = serde_json::to_value(Phone::new(7, "123")).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "number": "123"}));
    }
}
