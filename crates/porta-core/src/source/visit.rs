use crate::source::model::SyntaxNode;

/// Generic visitor over the tagged-variant tree.
///
/// `enter` returns `false` to skip the node's children.
pub trait Visitor {
    fn enter(&mut self, node: &SyntaxNode, depth: usize) -> bool;

    fn leave(&mut self, _node: &SyntaxNode, _depth: usize) {}
}

/// Walk `root` depth-first, in source order.
pub fn walk<V: Visitor + ?Sized>(root: &SyntaxNode, visitor: &mut V) {
    walk_at(root, 0, visitor);
}

fn walk_at<V: Visitor + ?Sized>(node: &SyntaxNode, depth: usize, visitor: &mut V) {
    if visitor.enter(node, depth) {
        for child in &node.children {
            walk_at(child, depth + 1, visitor);
        }
    }
    visitor.leave(node, depth);
}
