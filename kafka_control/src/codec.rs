mod avro_codec;
mod schema_registry;

pub use avro_codec::*;
pub use schema_registry::*;
