use anyhow::Context;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use bytes::BytesMut;
use serde::Deserialize;

/// Text rendering of payload bytes that aren't decoded with a schema.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    String,
    Hex,
    Base64,
}

impl Format {
    pub fn bytes_to_string(&self, bytes: &[u8]) -> String {
        match self {
            Format::String => String::from_utf8_lossy(bytes).into_owned(),
            Format::Hex => format!("{:02X}", BytesMut::from(bytes)),
            Format::Base64 => BASE64_STANDARD.encode(bytes),
        }
    }

    pub fn string_to_bytes(&self, value: &str) -> Result<Vec<u8>, anyhow::Error> {
        match self {
            Format::String => Ok(value.as_bytes().to_vec()),
            Format::Hex => decode_hex(value),
            Format::Base64 => BASE64_STANDARD
                .decode(value)
                .context("While decoding base64 value"),
        }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, anyhow::Error> {
    let digits = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<Vec<_>>();
    if digits.len() % 2 != 0 {
        anyhow::bail!("Hex value has an odd number of digits")
    }

    digits
        .chunks(2)
        .map(|pair| {
            let byte = pair.iter().collect::<String>();
            u8::from_str_radix(&byte, 16).with_context(|| format!("Invalid hex byte '{}'", byte))
        })
        .collect()
}
