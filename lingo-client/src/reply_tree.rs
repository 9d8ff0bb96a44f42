use std::collections::{HashMap, HashSet};

use lingo_types::Reply;

/// A reply with its nested answers
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyNode {
    pub reply: Reply,
    pub children: Vec<ReplyNode>,
}

impl ReplyNode {
    /// Number of replies in this subtree, including this one
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

// Threads can be arbitrarily deep; unlink children so dropping never recurses
impl Drop for ReplyNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Rebuilds the thread from a flat reply list.
///
/// A reply whose `parent_reply_id` is unset, unknown, or points at itself
/// becomes a root. Siblings keep their order from the input. When an id
/// repeats, only its first occurrence is kept.
pub fn build_tree(replies: &[Reply]) -> Vec<ReplyNode> {
    let mut ids: HashSet<&str> = HashSet::new();
    let replies: Vec<&Reply> = replies
        .iter()
        .filter(|reply| {
            let first = ids.insert(reply.id.as_str());
            if !first {
                log::warn!("Dropping duplicate reply {}", reply.id);
            }
            first
        })
        .collect();

    let mut children_map: HashMap<&str, Vec<&Reply>> = HashMap::new();
    let mut roots: Vec<&Reply> = Vec::new();

    for &reply in &replies {
        match reply.parent_reply_id.as_deref() {
            Some(parent) if parent != reply.id && ids.contains(parent) => {
                children_map.entry(parent).or_default().push(reply);
            }
            _ => roots.push(reply),
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut tree: Vec<ReplyNode> = roots
        .into_iter()
        .filter_map(|root| attach(root, &children_map, &mut visited))
        .collect();

    // Replies in a parent cycle never hang off a root; surface them as roots
    for &reply in &replies {
        if !visited.contains(reply.id.as_str()) {
            log::warn!("Reply {} is part of a parent cycle", reply.id);
            tree.extend(attach(reply, &children_map, &mut visited));
        }
    }

    tree
}

/// Builds the subtree under `root` without recursing. Returns `None` if
/// `root` was already placed.
fn attach<'a>(
    root: &'a Reply,
    children_map: &HashMap<&'a str, Vec<&'a Reply>>,
    visited: &mut HashSet<&'a str>,
) -> Option<ReplyNode> {
    if !visited.insert(root.id.as_str()) {
        return None;
    }

    // Discovery order; every child lands after its parent
    let mut order: Vec<&Reply> = vec![root];
    let mut child_slots: Vec<Vec<usize>> = vec![Vec::new()];
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        let Some(kids) = children_map.get(order[index].id.as_str()) else {
            continue;
        };
        for &kid in kids {
            if visited.insert(kid.id.as_str()) {
                order.push(kid);
                child_slots.push(Vec::new());
                let slot = order.len() - 1;
                child_slots[index].push(slot);
                stack.push(slot);
            }
        }
    }

    let mut built: Vec<Option<ReplyNode>> = Vec::with_capacity(order.len());
    built.resize_with(order.len(), || None);
    for index in (0..order.len()).rev() {
        let children = child_slots[index]
            .iter()
            .filter_map(|&slot| built[slot].take())
            .collect();
        built[index] = Some(ReplyNode {
            reply: order[index].clone(),
            children,
        });
    }
    built.into_iter().next().flatten()
}
