use bytesize::ByteSize;
use claimtree_core::{DocumentNode, DocumentService, DocumentTree, Explorer, NodeId, NodeKind};

fn kind_tag(node: &DocumentNode) -> &'static str {
    match node.kind {
        NodeKind::Folder => "dir ",
        NodeKind::File => "file",
    }
}

pub fn breadcrumbs<S: DocumentService>(explorer: &Explorer<S>) -> String {
    explorer
        .view()
        .breadcrumbs
        .iter()
        .map(|b| b.name.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn listing<S: DocumentService>(explorer: &Explorer<S>) {
    println!("{}", breadcrumbs(explorer));
    let contents = explorer.contents();
    if contents.is_empty() {
        println!("  (empty)");
        return;
    }
    let view = explorer.view();
    for node in contents.items() {
        let mark = if view.selected.contains(&node.id) { "[x]" } else { "[ ]" };
        println!(
            "{mark} {} {:<12} {:<32} {:<10} {}",
            kind_tag(node),
            node.id,
            node.name,
            node.status,
            node.updated_at.format("%Y-%m-%d"),
        );
    }
    let tree = explorer.tree();
    if view.all_selected(tree) {
        println!("all {} items selected", contents.len());
    } else if view.indeterminate(tree) {
        println!("{} of {} selected", view.selected.len(), contents.len());
    }
}

pub fn tree(tree: &DocumentTree) {
    fn walk(node: &DocumentNode, depth: usize) {
        let suffix = if node.kind == NodeKind::Folder { "/" } else { "" };
        println!(
            "{}{}{}  [{}] {}",
            "  ".repeat(depth),
            node.name,
            suffix,
            node.id,
            node.status.describe(node.kind),
        );
        for child in &node.children {
            walk(child, depth + 1);
        }
    }
    for root in tree.nest() {
        walk(&root, 0);
    }
    let orphans = tree.orphans();
    if !orphans.is_empty() {
        println!("unreachable from root:");
        for n in orphans {
            let parent = n.parent_id.as_ref().map(NodeId::as_str).unwrap_or("-");
            println!("  {} [{}] parent={}", n.name, n.id, parent);
        }
    }
}

pub fn size(bytes: usize) -> String {
    ByteSize(bytes as u64).to_string()
}
