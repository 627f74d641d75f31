use crate::cluster::KafkaCluster;
use crate::codec::AvroCodec;
use crate::commands::produce_messages::ProduceMessageCommandInternal;
use crate::models::PartitionOffset;
use anyhow::{bail, Context};
use tracing::info;

#[tracing::instrument(skip_all, fields(topic = %command.topic))]
pub async fn produce_message(
    cluster: &dyn KafkaCluster,
    codec: Option<&AvroCodec>,
    command: &ProduceMessageCommandInternal,
) -> Result<PartitionOffset, anyhow::Error> {
    let value = match (command.schema_id, codec) {
        (Some(schema_id), Some(codec)) => codec
            .encode(command.value.as_bytes(), schema_id)
            .await
            .context("While encoding message value")?
            .to_vec(),
        (Some(_), None) => bail!("Schema id was given but no schema registry is configured"),
        (None, _) => command
            .value_format
            .string_to_bytes(&command.value)
            .context("While converting value to bytes")?,
    };

    let partition_offset = cluster
        .produce(
            &command.topic,
            command.key.as_deref().map(str::as_bytes),
            &value,
        )
        .await?;

    info!(
        "Produced message to partition {} at offset {}",
        partition_offset.partition(),
        partition_offset.offset()
    );

    Ok(partition_offset)
}
