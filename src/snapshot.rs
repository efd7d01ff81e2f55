use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::PathSequence;
use crate::error::CanvasResult;
use crate::path::{PathRecord, PathRef};

/// Serialized drawing payload.
///
/// Background and canvas size travel next to the payload as sync metadata,
/// never inside it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingPayload {
    pub path_sequence: Vec<PathRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawingPayloadRef<'a> {
    path_sequence: Vec<&'a PathRecord>,
}

/// Serialize a path sequence into its transport form
pub fn encode(paths: &[PathRef]) -> CanvasResult<String> {
    let payload = DrawingPayloadRef {
        path_sequence: paths.iter().map(|p| p.as_ref()).collect(),
    };
    Ok(serde_json::to_string(&payload)?)
}

pub fn decode(serialized: &str) -> CanvasResult<PathSequence> {
    let payload: DrawingPayload = serde_json::from_str(serialized)?;
    Ok(payload.path_sequence.into_iter().map(Arc::new).collect())
}

/// Decode a stored or received drawing, falling back to an empty one.
///
/// A blank string counts as "no drawing yet" and is not logged.
pub fn decode_or_empty(serialized: &str, source: &str) -> PathSequence {
    if serialized.trim().is_empty() {
        return PathSequence::new();
    }
    match decode(serialized) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Discarding malformed {} drawing: {}", source, e);
            PathSequence::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    #[test]
    fn test_wire_shape() {
        let paths = vec![Arc::new(PathRecord::new(Color32::RED, 5.0, "M0 0 L1 1".to_string()))];
        let json = encode(&paths).unwrap();
        assert_eq!(
            json,
            r##"{"pathSequence":[{"color":"#ff0000","strokeWidth":5.0,"path":"M0 0 L1 1"}]}"##
        );
        assert_eq!(decode(&json).unwrap(), paths);
    }

    #[test]
    fn test_decode_accepts_integer_widths() {
        let paths = decode(r##"{"pathSequence":[{"color":"#000000","strokeWidth":2,"path":"M1 1"}]}"##).unwrap();
        assert_eq!(paths[0].stroke_width(), 2.0);
    }

    #[test]
    fn test_malformed_input_falls_back_to_empty() {
        assert!(decode_or_empty("{not json", "hydrated").is_empty());
        assert!(decode_or_empty(r#"{"paths":[]}"#, "remote").is_empty());
        assert!(decode_or_empty("", "hydrated").is_empty());
    }
}
