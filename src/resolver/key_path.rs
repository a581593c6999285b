//! Typed requirement keys.
//!
//! A requirement key is parsed once into one of two shapes, so the two
//! resolution rules stay exhaustive and nothing falls through to an
//! undocumented third behavior.

use serde_json::Value;

/// First segment marking a series-bearing key, e.g. `dicom.T1`.
pub const SERIES_SENTINEL: &str = "dicom";

/// List-valued sub-field scanned for channel matches.
const SERIES_LIST_FIELD: &str = "series";

/// Casing variants under which a series entry may carry its channel type.
const CHANNEL_TYPE_ATTRS: [&str; 2] = ["channelType", "channel_type"];

/// A model's dotted requirement key, in resolved form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementKey {
    /// `dicom.<channel>`: scan the `dicom.series` list for an entry whose
    /// channel-type attribute matches `<channel>` case-insensitively; the
    /// whole matching entry is the resolved value.
    SeriesChannel { raw: String, channel: String },
    /// Ordinary dot-separated traversal through nested maps.
    Path { raw: String, segments: Vec<String> },
}

impl RequirementKey {
    pub fn parse(raw: &str) -> Self {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.len() == 2 && segments[0] == SERIES_SENTINEL {
            Self::SeriesChannel {
                raw: raw.to_string(),
                channel: segments[1].clone(),
            }
        } else {
            Self::Path {
                raw: raw.to_string(),
                segments,
            }
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::SeriesChannel { raw, .. } | Self::Path { raw, .. } => raw,
        }
    }

    /// Resolve this key against a result payload. `None` means the key is
    /// missing. Never mutates the payload.
    pub fn resolve(&self, payload: &Value) -> Option<Value> {
        match self {
            Self::SeriesChannel { channel, .. } => resolve_series_channel(payload, channel),
            Self::Path { segments, .. } => resolve_path(payload, segments),
        }
    }
}

fn resolve_series_channel(payload: &Value, channel: &str) -> Option<Value> {
    let series = payload.get(SERIES_SENTINEL)?.get(SERIES_LIST_FIELD)?.as_array()?;
    series
        .iter()
        .find(|entry| {
            CHANNEL_TYPE_ATTRS.iter().any(|attr| {
                entry
                    .get(attr)
                    .and_then(Value::as_str)
                    .map(|value| value.eq_ignore_ascii_case(channel))
                    .unwrap_or(false)
            })
        })
        .cloned()
}

fn resolve_path(payload: &Value, segments: &[String]) -> Option<Value> {
    let mut current = payload;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_segment_sentinel_parses_as_series_channel() {
        match RequirementKey::parse("dicom.T1") {
            RequirementKey::SeriesChannel { channel, .. } => assert_eq!(channel, "T1"),
            other => panic!("expected series-channel key, got {other:?}"),
        }
    }

    #[test]
    fn longer_sentinel_paths_are_ordinary_traversal() {
        match RequirementKey::parse("dicom.series.count") {
            RequirementKey::Path { segments, .. } => assert_eq!(segments.len(), 3),
            other => panic!("expected path key, got {other:?}"),
        }
    }

    #[test]
    fn series_channel_match_is_case_insensitive_across_attr_casings() {
        let payload = json!({
            "dicom": {
                "series": [
                    {"channelType": "t1", "uid": "1.2.3"},
                    {"channel_type": "FLAIR", "uid": "4.5.6"},
                ]
            }
        });
        let t1 = RequirementKey::parse("dicom.T1").resolve(&payload).unwrap();
        assert_eq!(t1["uid"], "1.2.3");
        let flair = RequirementKey::parse("dicom.flair").resolve(&payload).unwrap();
        assert_eq!(flair["uid"], "4.5.6");
    }

    #[test]
    fn matching_entry_is_returned_whole() {
        let payload = json!({
            "dicom": {"series": [{"channelType": "T2", "uid": "7", "sliceCount": 24}]}
        });
        let resolved = RequirementKey::parse("dicom.T2").resolve(&payload).unwrap();
        assert_eq!(resolved, json!({"channelType": "T2", "uid": "7", "sliceCount": 24}));
    }

    proptest::proptest! {
        #[test]
        fn parse_preserves_the_raw_key(raw in "[a-zA-Z0-9_.]{1,40}") {
            let key = RequirementKey::parse(&raw);
            proptest::prop_assert_eq!(key.raw(), raw.as_str());
        }

        #[test]
        fn series_channel_match_ignores_casing(channel in "[a-zA-Z]{1,8}") {
            let payload = json!({
                "dicom": {"series": [{"channelType": channel.to_uppercase(), "uid": "u"}]}
            });
            let key = RequirementKey::parse(&format!("dicom.{}", channel.to_lowercase()));
            proptest::prop_assert!(key.resolve(&payload).is_some());
        }
    }

    #[test]
    fn path_traversal_stops_at_non_maps() {
        let payload = json!({"report": {"impression": "clear", "sections": [1, 2]}});
        let key = RequirementKey::parse("report.impression");
        assert_eq!(key.resolve(&payload), Some(json!("clear")));
        assert!(RequirementKey::parse("report.sections.0").resolve(&payload).is_none());
        assert!(RequirementKey::parse("report.missing").resolve(&payload).is_none());
        assert!(RequirementKey::parse("absent.leaf").resolve(&payload).is_none());
    }
}
