use crate::codec::SchemaSource;
use anyhow::{bail, Context};
use apache_avro::types::Value;
use apache_avro::Schema;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

const MAGIC_BYTE: u8 = 0;
const HEADER_LENGTH: usize = 5;

/// Converts between JSON text and schema registry framed Avro:
/// magic byte `0`, big endian schema id, Avro binary datum.
pub struct AvroCodec {
    schemas: Arc<dyn SchemaSource>,
}

impl AvroCodec {
    pub fn new(schemas: Arc<dyn SchemaSource>) -> Self {
        Self { schemas }
    }

    pub async fn decode(&self, message: &[u8]) -> Result<String, anyhow::Error> {
        let (schema_id, mut datum) = split_header(message)?;
        let schema = self.schema(schema_id).await?;

        let value = apache_avro::from_avro_datum(&schema, &mut datum, None)
            .with_context(|| format!("While decoding avro datum with schema {}", schema_id))?;
        let json = serde_json::Value::try_from(value)
            .context("While converting avro value to json")?;

        Ok(json.to_string())
    }

    pub async fn encode(&self, json: &[u8], schema_id: u32) -> Result<Bytes, anyhow::Error> {
        let schema = self.schema(schema_id).await?;
        let json: serde_json::Value =
            serde_json::from_slice(json).context("While parsing json message")?;

        let value = Value::from(json)
            .resolve(&schema)
            .with_context(|| format!("Message doesn't match schema {}", schema_id))?;
        let datum = apache_avro::to_avro_datum(&schema, value)
            .with_context(|| format!("While encoding avro datum with schema {}", schema_id))?;

        let mut buffer = BytesMut::with_capacity(HEADER_LENGTH + datum.len());
        buffer.put_u8(MAGIC_BYTE);
        buffer.put_u32(schema_id);
        buffer.extend_from_slice(&datum);

        Ok(buffer.freeze())
    }

    async fn schema(&self, schema_id: u32) -> Result<Schema, anyhow::Error> {
        let definition = self
            .schemas
            .schema_by_id(schema_id)
            .await
            .with_context(|| format!("While fetching schema {}", schema_id))?;

        Schema::parse_str(&definition).with_context(|| format!("Schema {} is invalid", schema_id))
    }
}

/// Splits a framed message into its schema id and Avro datum.
pub fn split_header(message: &[u8]) -> Result<(u32, &[u8]), anyhow::Error> {
    if message.len() < HEADER_LENGTH {
        bail!(
            "Message of {} bytes is too short for schema registry framing",
            message.len()
        )
    }
    if message[0] != MAGIC_BYTE {
        bail!("Unknown magic byte {}", message[0])
    }

    let mut header = &message[1..HEADER_LENGTH];
    Ok((header.get_u32(), &message[HEADER_LENGTH..]))
}
