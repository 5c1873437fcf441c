//! Fuzzy element resolver.
//!
//! An [`ElementSelector`] carries several groups of alternative CSS
//! strategies captured at authoring time. Groups are searched from the most
//! specific (lowest cardinality) outwards, and inside a group every entry casts
//! one vote for the node it resolves to. A node holding a majority of a group's
//! entries wins immediately; otherwise the group's plurality leader wins.
//!
//! How many groups are searched is governed by `precision`:
//!
//! | precision | groups searched (of 4) |
//! |-----------|------------------------|
//! | 1.0       | 1                      |
//! | 0.5       | 2                      |
//! | 0.0       | 4                      |

use tracing::debug;

use tourguide_protocols::{AutoData, DomProvider, ElementSelector, NodeId, SelectorGroup};

use crate::visibility::{VisibilityCache, is_visible};

/// Precision applied when a selector does not carry one.
pub const DEFAULT_PRECISION: f64 = 1.0;

/// Parse a serialized [`AutoData`] payload.
pub fn parse_auto_data(raw: &str) -> Result<AutoData, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Number of groups to search out of `group_count` at the given precision.
///
/// Always at least one when any group exists. Out-of-range precision is
/// clamped and NaN falls back to [`DEFAULT_PRECISION`].
pub fn groups_to_search(group_count: usize, precision: f64) -> usize {
    if group_count == 0 {
        return 0;
    }
    let precision = if precision.is_nan() {
        DEFAULT_PRECISION
    } else {
        precision.clamp(0.0, 1.0)
    };
    let wanted = ((1.0 - precision) * group_count as f64).ceil() as usize;
    wanted.clamp(1, group_count)
}

/// Locate the live node described by `selector`, or `None`.
pub fn find_element<D: DomProvider + ?Sized>(dom: &D, selector: &ElementSelector) -> Option<NodeId> {
    let auto_data = match parse_auto_data(&selector.auto_data) {
        Ok(data) => data,
        Err(e) => {
            debug!("Ignoring unparseable auto data: {}", e);
            return None;
        }
    };

    let text = selector
        .text
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && !selector.exclude_text);

    let mut groups: Vec<&SelectorGroup> = if text.is_some() {
        auto_data.text_groups.iter().collect()
    } else {
        auto_data.notext_groups.iter().collect()
    };
    if groups.is_empty() {
        return None;
    }
    groups.sort_by_key(|g| g.cardinality);

    let limit = groups_to_search(
        groups.len(),
        selector.precision.unwrap_or(DEFAULT_PRECISION),
    );
    let mut cache = VisibilityCache::new();

    for group in groups.into_iter().take(limit) {
        if let Some(node) = vote(dom, group, text.as_deref(), &mut cache) {
            return Some(node);
        }
    }
    None
}

/// Run one group's entries and return its winner, if any entry resolved.
fn vote<D: DomProvider + ?Sized>(
    dom: &D,
    group: &SelectorGroup,
    text: Option<&str>,
    cache: &mut VisibilityCache,
) -> Option<NodeId> {
    let majority = group.css_selectors.len().div_ceil(2);
    let mut tally: Vec<(NodeId, usize)> = Vec::new();
    let mut leader: Option<(NodeId, usize)> = None;

    for entry in &group.css_selectors {
        let matches = match dom.query_all(&entry.css) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("Skipping selector '{}': {}", entry.css, e);
                continue;
            }
        };

        let hit = matches
            .filter(|node| text.is_none_or(|t| text_matches(dom, *node, t)))
            .filter(|node| is_visible(dom, *node, cache))
            .nth(entry.offset);
        let Some(node) = hit else {
            continue;
        };

        let votes = match tally.iter_mut().find(|(n, _)| *n == node) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                tally.push((node, 1));
                1
            }
        };

        if leader.is_none_or(|(_, best)| votes > best) {
            leader = Some((node, votes));
        }
        if votes >= majority {
            debug!(
                "{} won cardinality {} group with {}/{} votes",
                node,
                group.cardinality,
                votes,
                group.css_selectors.len()
            );
            return Some(node);
        }
    }

    leader.map(|(node, votes)| {
        debug!(
            "{} leads cardinality {} group with {}/{} votes",
            node,
            group.cardinality,
            votes,
            group.css_selectors.len()
        );
        node
    })
}

fn text_matches<D: DomProvider + ?Sized>(dom: &D, node: NodeId, expected: &str) -> bool {
    dom.text_content(node)
        .is_some_and(|t| t.trim().to_lowercase() == expected)
}

#[cfg(test)]
#[path = "fuzzy_tests.rs"]
mod tests;
