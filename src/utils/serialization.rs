// Bincode 2.x helpers with the standard configuration, shared by every
// durable record in the store.
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
    struct TestRecord {
        id: Vec<u8>,
        label: String,
        values: Vec<u64>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestRecord {
            id: vec![1, 2, 3],
            label: "record".to_string(),
            values: vec![10, 0, 42],
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: TestRecord =
            deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_empty_bytes_survive_round_trip() {
        // An empty byte field must stay distinguishable from an absent one.
        let original = TestRecord {
            id: vec![],
            label: String::new(),
            values: vec![],
        };
        let serialized = serialize(&original).unwrap();
        let deserialized: TestRecord = deserialize(&serialized).unwrap();
        assert_eq!(original, deserialized);
        assert!(deserialized.id.is_empty());
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<TestRecord> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
