//! Single-line map share strings for clipboard transfer.
//!
//! Format: `battlemap:v1:<width>x<height>:<base64 JSON snapshot>`.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use battlemap_core::SceneSnapshot;

const SHARE_DOMAIN: &str = "battlemap";
const SHARE_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Prefix emitted before the dimensions and payload.
pub const SHARE_HEADER: &str = "battlemap:v1";

/// Encodes the snapshot into a single line.
pub fn encode(snapshot: &SceneSnapshot) -> Result<String, ShareError> {
    let json = serde_json::to_vec(snapshot).map_err(ShareError::InvalidPayload)?;
    let payload = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{SHARE_HEADER}:{}x{}:{payload}",
        snapshot.map_width, snapshot.map_height
    ))
}

/// Decodes a share string produced by [`encode`].
pub fn decode(value: &str) -> Result<SceneSnapshot, ShareError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ShareError::Empty);
    }

    let mut parts = trimmed.splitn(4, FIELD_DELIMITER);
    let domain = parts.next().ok_or(ShareError::MissingField("prefix"))?;
    let version = parts.next().ok_or(ShareError::MissingField("version"))?;
    let dimensions = parts.next().ok_or(ShareError::MissingField("dimensions"))?;
    let payload = parts.next().ok_or(ShareError::MissingField("payload"))?;

    if domain != SHARE_DOMAIN {
        return Err(ShareError::InvalidPrefix(domain.to_owned()));
    }
    if version != SHARE_VERSION {
        return Err(ShareError::UnsupportedVersion(version.to_owned()));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(ShareError::InvalidEncoding)?;
    let snapshot: SceneSnapshot =
        serde_json::from_slice(&bytes).map_err(ShareError::InvalidPayload)?;

    if (snapshot.map_width, snapshot.map_height) != (width, height) {
        return Err(ShareError::DimensionMismatch {
            header: (width, height),
            payload: (snapshot.map_width, snapshot.map_height),
        });
    }
    Ok(snapshot)
}

/// Errors that can occur while decoding share strings.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// The string was empty or whitespace.
    #[error("share string was empty")]
    Empty,
    /// A required segment was missing.
    #[error("share string is missing the {0}")]
    MissingField(&'static str),
    /// The prefix segment was not recognised.
    #[error("share prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment was not recognised.
    #[error("share version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The dimensions segment could not be parsed.
    #[error("could not parse map dimensions '{0}'")]
    InvalidDimensions(String),
    /// The header dimensions disagree with the payload.
    #[error("header says {}x{} but the map is {}x{}", .header.0, .header.1, .payload.0, .payload.1)]
    DimensionMismatch {
        /// Dimensions from the header.
        header: (u32, u32),
        /// Dimensions from the payload.
        payload: (u32, u32),
    },
    /// The base64 payload could not be decoded.
    #[error("could not decode map payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload was not a valid snapshot.
    #[error("could not parse map payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), ShareError> {
    let invalid = || ShareError::InvalidDimensions(dimensions.to_owned());
    let (width, height) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}
