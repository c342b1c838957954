use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::GraphConfig;
use crate::content::ContentIndex;
use crate::content::slug::{is_tag, normalize, tag_name};

use super::{GraphEdge, GraphModel, GraphNode};

struct LinkSet<'a> {
    links: Vec<(&'a str, &'a str)>,
    tags: Vec<&'a str>,
}

fn collect_links<'a>(
    index: &'a ContentIndex,
    excluded_tags: &HashSet<&str>,
    include_tags: bool,
) -> LinkSet<'a> {
    let mut links = Vec::new();
    let mut tags = Vec::new();
    let mut seen_tags = HashSet::new();

    for (source, entry) in index.iter() {
        for target in &entry.links {
            if index.contains(target) {
                links.push((source.as_str(), target.as_str()));
            }
        }

        if !include_tags {
            continue;
        }

        for tag in &entry.tags {
            if excluded_tags.contains(tag.as_str()) {
                continue;
            }
            if seen_tags.insert(tag.as_str()) {
                tags.push(tag.as_str());
            }
            links.push((source.as_str(), tag.as_str()));
        }
    }

    LinkSet { links, tags }
}

/// Identifiers reachable from `focus` within `depth` hops over links taken in
/// either direction, in discovery order. A negative depth selects the whole
/// corpus instead.
#[cfg(test)]
fn neighbourhood(
    index: &ContentIndex,
    focus: &str,
    depth: i32,
    excluded_tags: &[String],
    include_tags: bool,
) -> Vec<String> {
    let excluded = excluded_tags.iter().map(String::as_str).collect::<HashSet<_>>();
    let link_set = collect_links(index, &excluded, include_tags);
    discover(index, &link_set, focus, depth, include_tags)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn discover<'a>(
    index: &'a ContentIndex,
    link_set: &LinkSet<'a>,
    focus: &'a str,
    depth: i32,
    include_tags: bool,
) -> Vec<&'a str> {
    if depth < 0 {
        let mut all = index.ids().collect::<Vec<_>>();
        if include_tags {
            all.extend(link_set.tags.iter().copied());
        }
        return all;
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for &(source, target) in &link_set.links {
        adjacency.entry(source).or_default().push(target);
        adjacency.entry(target).or_default().push(source);
    }

    let mut visited = HashSet::from([focus]);
    let mut ordered = vec![focus];
    let mut frontier = vec![focus];

    for _level in 0..depth {
        let mut next = Vec::new();
        for current in &frontier {
            let Some(adjacent) = adjacency.get(current) else {
                continue;
            };
            for &candidate in adjacent {
                if visited.insert(candidate) {
                    ordered.push(candidate);
                    next.push(candidate);
                }
            }
        }

        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    ordered
}

fn display_text(index: &ContentIndex, id: &str) -> String {
    if is_tag(id) {
        format!("#{}", tag_name(id))
    } else {
        index.title_of(id).to_owned()
    }
}

pub(in crate::app) fn build_graph_model(
    index: &ContentIndex,
    focus: &str,
    config: &GraphConfig,
) -> GraphModel {
    build(
        index,
        focus,
        config.depth,
        &config.remove_tags,
        config.show_tags,
    )
}

fn build(
    index: &ContentIndex,
    focus: &str,
    depth: i32,
    excluded_tags: &[String],
    include_tags: bool,
) -> GraphModel {
    let focus = normalize(focus);
    if index.is_empty() {
        return GraphModel::new(Vec::new(), Vec::new(), focus);
    }

    let excluded = excluded_tags.iter().map(String::as_str).collect::<HashSet<_>>();
    let link_set = collect_links(index, &excluded, include_tags);
    let members = discover(index, &link_set, &focus, depth, include_tags);

    let nodes = members
        .iter()
        .map(|&id| GraphNode {
            id: id.to_owned(),
            text: display_text(index, id),
            tags: index
                .get(id)
                .map(|entry| entry.tags.iter().cloned().collect())
                .unwrap_or_else(BTreeSet::new),
            is_tag: is_tag(id),
        })
        .collect::<Vec<_>>();

    let position = members
        .iter()
        .enumerate()
        .map(|(position, &id)| (id, position))
        .collect::<HashMap<_, _>>();

    let edges = link_set
        .links
        .iter()
        .filter_map(|(source, target)| {
            Some(GraphEdge {
                source: *position.get(source)?,
                target: *position.get(target)?,
            })
        })
        .collect();

    GraphModel::new(nodes, edges, focus)
}
