//! Tag-overlap scoring

use std::collections::HashSet;
use std::hash::Hash;

/// Number of tags an event shares with the student's tag set
pub fn tag_overlap<T: Eq + Hash>(event_tags: &HashSet<T>, student_tags: &HashSet<T>) -> u32 {
    let (small, large) = if event_tags.len() <= student_tags.len() {
        (event_tags, student_tags)
    } else {
        (student_tags, event_tags)
    };
    small.iter().filter(|tag| large.contains(*tag)).count() as u32
}

/// Union of explicit interest tags and tags of events the student already joined
pub fn student_tag_union<T: Eq + Hash + Clone>(
    interest_tags: &HashSet<T>,
    past_event_tags: &HashSet<T>,
) -> HashSet<T> {
    interest_tags.union(past_event_tags).cloned().collect()
}
