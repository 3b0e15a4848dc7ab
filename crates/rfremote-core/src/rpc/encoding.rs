//! Serde helpers for binary payloads carried in JSON.

/// Serializes `Vec<u8>` as a standard base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as Base64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&Base64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Base64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "super::base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn test_encodes_as_base64_string() {
        let blob = Blob {
            data: vec![0, 159, 146, 150],
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"data":"AJ+Slg=="}"#);
        assert_eq!(serde_json::from_str::<Blob>(&json).unwrap(), blob);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let result = serde_json::from_str::<Blob>(r#"{"data":"not base64!"}"#);
        assert!(result.is_err());
    }
}
