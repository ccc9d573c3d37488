use serde::{Deserialize, Deserializer};

/// Returns true for values the wire format leaves out when encoding
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Deserializes a field, mapping an explicit JSON `null` to the type's default
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json;

    #[test]
    fn test_is_default() {
        assert!(is_default(&0u16));
        assert!(is_default(&false));
        assert!(is_default(&String::new()));
        assert!(!is_default(&8u16));
    }

    #[test]
    fn test_skip_and_null() {
        #[derive(Serialize, Deserialize, Default, PartialEq, Debug)]
        #[serde(default)]
        struct Test {
            #[serde(skip_serializing_if = "is_default")]
            prea: u16,
            #[serde(deserialize_with = "null_as_default")]
            codr: String,
        }

        let original = Test { prea: 0, codr: "4/5".to_string() };
        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"codr":"4/5"}"#);

        let deserialized: Test = serde_json::from_str(r#"{"codr":null}"#).unwrap();
        assert_eq!(deserialized, Test::default());
    }
}
