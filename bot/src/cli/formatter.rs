use crate::engine::family_tree::FamilyTree;
use crate::engine::tree_node::TreeNode;
use crate::engine::tree_view::TreeView;

const INDENT: &str = "    ";

/// `Nickname (username#0) [id]`
pub fn node_line(node: &TreeNode) -> String {
    format!(
        "{} ({}) [{}]",
        node.nickname(),
        node.full_username(),
        node.id()
    )
}

/// Render a tree with one member per line, indented by generation.
/// Siblings keep the order they were added in.
pub fn render_tree(tree: &FamilyTree) -> String {
    let view = tree.get_view();
    let mut out = String::new();
    render_subtree(&view, tree.root(), 0, &mut out);
    out
}

fn render_subtree(view: &TreeView<'_>, node: &TreeNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(&node_line(node));
    out.push('\n');

    for child in view.filter_to_child_nodes(node).iter() {
        render_subtree(view, child, depth + 1, out);
    }
}
