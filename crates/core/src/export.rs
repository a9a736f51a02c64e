use crate::error::Result;
use crate::model::*;
use crate::tree::DocumentTree;

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::File => "file",
        NodeKind::Folder => "folder",
    }
}

pub fn to_csv(tree: &DocumentTree, mut w: impl std::io::Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(&mut w);
    writer.write_record(["id", "path", "name", "kind", "status", "parent_id", "updated_at"])?;
    for n in tree.iter() {
        writer.write_record([
            n.id.to_string(),
            tree.display_path(&n.id),
            n.name.clone(),
            kind_label(n.kind).to_string(),
            n.status.to_string(),
            n.parent_id.as_ref().map(|p| p.to_string()).unwrap_or_default(),
            n.updated_at.to_rfc3339(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Nested JSON in the same shape the API serves.
pub fn to_json(tree: &DocumentTree) -> serde_json::Value {
    serde_json::json!({
        "count": tree.len(),
        "orphans": tree.orphans().iter().map(|n| n.id.0.clone()).collect::<Vec<_>>(),
        "nodes": tree.nest(),
    })
}
