use crate::queries::read_messages::Format;

#[derive(Debug, Clone)]
pub struct ProduceMessageCommandInternal {
    pub topic: String,
    pub key: Option<String>,
    pub value: String,
    /// How `value` is turned into bytes when no schema id is given.
    pub value_format: Format,
    /// Encode `value`, a JSON document, as Avro with this registry schema.
    pub schema_id: Option<u32>,
}
