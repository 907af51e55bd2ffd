//! Paragraph-group splitting of entry containers.
//!
//! A statblock container is a run of paragraphs separated by horizontal
//! rules used as visual dividers. Groups are positional: the first is the
//! header/traits block, the second the descriptive body, the third (when
//! present) the heightened-effects block.

use crate::dom::{Dom, NodeId};

/// Undo an upstream authoring inconsistency: dividers occasionally arrive
/// wrapped in their own element. A wrapper whose only significant content is
/// a single `<hr>` is discarded and the rule promoted into its place.
pub fn unwrap_divider_wrappers(dom: &mut Dom, container: NodeId) {
    let rules: Vec<NodeId> = dom.select(container, |d, id| d.tag(id) == Some("hr"));
    for hr in rules {
        let Some(parent) = dom.parent(hr) else { continue };
        if parent == container {
            continue;
        }
        let significant: Vec<NodeId> = dom
            .children(parent)
            .filter(|&c| !dom.is_noise(c))
            .collect();
        if significant == [hr] {
            dom.replace_with(parent, hr);
        }
    }
}

/// Partition a container into paragraph groups.
///
/// A group starts at every direct-child paragraph that is either the first
/// element child or immediately follows a divider; it extends through the
/// following paragraph- and list-like siblings. Adjacency is evaluated over
/// element children only.
pub fn split_groups(dom: &mut Dom, container: NodeId) -> Vec<Vec<NodeId>> {
    unwrap_divider_wrappers(dom, container);

    let kids = dom.element_children(container);
    let mut groups = Vec::new();
    for (i, &kid) in kids.iter().enumerate() {
        if dom.tag(kid) != Some("p") {
            continue;
        }
        let after_divider = i > 0 && dom.tag(kids[i - 1]) == Some("hr");
        if i == 0 || after_divider {
            groups.push(paragraph_group(dom, kid));
        }
    }
    groups
}

/// A leading element plus every following element sibling that continues the
/// same logical paragraph (paragraph- or list-like), stopping at the first
/// sibling that starts a new top-level block.
pub fn paragraph_group(dom: &Dom, start: NodeId) -> Vec<NodeId> {
    let mut group = vec![start];
    let mut cur = dom.next_element_sibling(start);
    while let Some(id) = cur {
        if !matches!(dom.tag(id), Some("p") | Some("ul") | Some("ol")) {
            break;
        }
        group.push(id);
        cur = dom.next_element_sibling(id);
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(dom: &Dom) -> NodeId {
        dom.find(dom.body(), |d, id| d.has_class(id, "fusion-text"))
            .expect("fixture has a container")
    }

    #[test]
    fn groups_split_on_dividers() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="fusion-text">
                <p>header</p><p>seguito</p><p>ancora</p>
                <hr>
                <p>descrizione</p>
            </div>"#,
        );
        let c = container(&dom);
        let groups = split_groups(&mut dom, c);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(dom.subtree_text(groups[1][0]), "descrizione");
    }

    #[test]
    fn lists_continue_a_group() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="fusion-text"><p>testo</p><ul><li>a</li></ul><p>coda</p><h2>altro</h2></div>"#,
        );
        let c = container(&dom);
        let groups = split_groups(&mut dom, c);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn wrapped_dividers_are_promoted() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="fusion-text"><p>prima</p><div><hr></div><p>seconda</p></div>"#,
        );
        let c = container(&dom);
        let groups = split_groups(&mut dom, c);
        assert_eq!(groups.len(), 2);
        assert_eq!(dom.subtree_text(groups[1][0]), "seconda");
    }

    #[test]
    fn missing_third_group_is_fine() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="fusion-text"><p>header</p><hr><p>corpo</p></div>"#,
        );
        let c = container(&dom);
        let groups = split_groups(&mut dom, c);
        assert_eq!(groups.len(), 2);
        assert!(groups.get(2).is_none());
    }

    #[test]
    fn three_groups_in_order() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="fusion-text"><p>header</p><hr><p>corpo</p><hr><p>intensificato</p></div>"#,
        );
        let c = container(&dom);
        let groups = split_groups(&mut dom, c);
        assert_eq!(groups.len(), 3);
        assert_eq!(dom.subtree_text(groups[2][0]), "intensificato");
    }
}
