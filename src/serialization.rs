use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::GridError;

///
/// Serialization format options for grid data. Each format has an
/// LZ4-compressed variant.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// JSON - human readable, larger size, widest compatibility
    Json,
    /// JSON with LZ4 compression
    JsonLz4,
    /// bincode - compact binary
    Bincode,
    /// bincode with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::JsonLz4 | SerializationFormat::BincodeLz4)
    }
}

fn serialize_serde<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GridError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::to_vec(data).map_err(|_| GridError::SerializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|_| GridError::SerializationFailed)
        }
    }
}

fn deserialize_serde<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GridError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::from_slice(data).map_err(|_| GridError::DeserializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::decode_from_slice(data, bincode::config::standard())
                .map(|(value, _)| value)
                .map_err(|_| GridError::DeserializationFailed)
        }
    }
}

///
/// Serialize data to bytes, LZ4-framing the compressed variants.
///
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, GridError> {
    let bytes = serialize_serde(data, format)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

///
/// Deserialize data from bytes, undoing the LZ4 framing where present.
///
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, GridError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| GridError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed, format)
    } else {
        deserialize_serde(data, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct TestData {
        values: Vec<f64>,
        name: String,
    }

    fn sample() -> TestData {
        TestData { values: vec![1.0, 2.0, 3.0], name: "test".to_string() }
    }

    #[test]
    fn test_json_roundtrip() {
        let data = sample();
        let bytes = serialize(&data, SerializationFormat::Json).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::Json).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_json_lz4_roundtrip() {
        let data = sample();
        let bytes = serialize(&data, SerializationFormat::JsonLz4).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::JsonLz4).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_bincode_roundtrip() {
        let data = sample();
        let bytes = serialize(&data, SerializationFormat::Bincode).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::Bincode).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_bincode_lz4_roundtrip() {
        let data = sample();
        let bytes = serialize(&data, SerializationFormat::BincodeLz4).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_grid_roundtrip()
    {
        use crate::grids::sparse_grid::SparseGridBase;
        use crate::generators::RegularGenerator;
        let mut grid = SparseGridBase::new(2, 1);
        grid.sparse_grid(&[3, 3], &RegularGenerator).unwrap();
        let values: Vec<f64> = grid.points().map(|p| p[0] + p[1]).collect();
        grid.set_values(values).unwrap();
        let bytes = serialize(&grid, SerializationFormat::BincodeLz4).unwrap();
        let restored: SparseGridBase = deserialize(&bytes, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(restored.len(), grid.len());
        assert_eq!(restored.values(), grid.values());
        for seq in 0..grid.len()
        {
            assert_eq!(restored.storage().point(seq), grid.storage().point(seq));
        }
    }
}
