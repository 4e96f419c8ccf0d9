use crate::models::{ClassifierPolicy, Track, TrackClass};
use std::cmp::{Ordering, Reverse};

/// Label every track: the longest one is the main feature, the rest are
/// extras when the policy says so and unknown otherwise.
pub fn classify_tracks(tracks: Vec<Track>, policy: &ClassifierPolicy) -> Vec<Track> {
    let Some(main_id) = find_main_title(&tracks) else {
        return tracks;
    };
    let main_length = tracks
        .iter()
        .find(|t| t.title_id == main_id)
        .map(|t| t.duration.length.as_secs_f64())
        .unwrap_or_default();

    tracks
        .into_iter()
        .map(|mut track| {
            track.classification = if track.title_id == main_id {
                TrackClass::Main
            } else if is_short_extra(&track, main_length, policy) || is_named_extra(&track, policy) {
                TrackClass::Extra
            } else {
                TrackClass::Unknown
            };
            track
        })
        .collect()
}

/// Longest track wins; ties go to the larger one, then the lowest title id
pub fn find_main_title(tracks: &[Track]) -> Option<u32> {
    tracks
        .iter()
        .max_by(|a, b| main_rank(a).cmp(&main_rank(b)))
        .map(|t| t.title_id)
}

fn main_rank(track: &Track) -> (std::time::Duration, u64, Reverse<u32>) {
    (track.duration.length, track.size_bytes, Reverse(track.title_id))
}

fn is_short_extra(track: &Track, main_length: f64, policy: &ClassifierPolicy) -> bool {
    let Some(ratio) = policy.extra_max_ratio else {
        return false;
    };
    if main_length <= 0.0 {
        return false;
    }

    let length = track.duration.length.as_secs_f64();
    (length / main_length).partial_cmp(&ratio) == Some(Ordering::Less)
}

fn is_named_extra(track: &Track, policy: &ClassifierPolicy) -> bool {
    let Some(name) = &track.name else {
        return false;
    };
    let name = name.to_lowercase();

    policy
        .extra_name_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && name.contains(&k))
}
