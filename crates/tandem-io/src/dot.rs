//! DOT rendering of assembly graphs.
//!
//! AND nodes render as rectangles, OR nodes as ellipses; edges into an
//! assigned action are labelled with the chosen agent.

use std::fs;
use std::path::Path;

use tandem_core::{AssemblyGraph, Result};

/// Render the assembly graph as a DOT digraph.
pub fn write_str(assembly: &AssemblyGraph) -> Result<String> {
    let mut out = String::from("digraph assembly {\n");

    for node in assembly.nodes() {
        let shape = if node.data.kind.is_and() {
            "box"
        } else {
            "ellipse"
        };
        out.push_str(&format!(
            "    \"{}\" [shape={}];\n",
            escape(&node.data.name),
            shape
        ));
    }

    out.push('\n');
    for edge in assembly.edges() {
        let source = assembly.name(edge.source())?;
        let target_node = assembly.node(edge.target())?;
        match (&target_node.assigned_agent, target_node.kind.is_and()) {
            (Some(agent), true) => out.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                escape(source),
                escape(&target_node.name),
                escape(agent)
            )),
            _ => out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                escape(source),
                escape(&target_node.name)
            )),
        }
    }

    out.push_str("}\n");
    Ok(out)
}

/// Render the assembly graph to a DOT file.
pub fn write_file(assembly: &AssemblyGraph, path: impl AsRef<Path>) -> Result<()> {
    let text = write_str(assembly)?;
    fs::write(path, text)?;
    Ok(())
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated_graph() -> AssemblyGraph {
        let mut assembly = AssemblyGraph::new();
        assembly.insert_or("product");
        let attach = assembly.insert_and("attach");
        assembly.insert_or("base");
        assembly.insert_edge("product", "attach").unwrap();
        assembly.insert_edge("attach", "base").unwrap();
        assembly.set_root("product").unwrap();
        assembly.set_assigned_agent(attach, "r1").unwrap();
        assembly
    }

    #[test]
    fn test_shapes_follow_node_kind() {
        let dot = write_str(&annotated_graph()).unwrap();
        assert!(dot.contains("\"attach\" [shape=box];"));
        assert!(dot.contains("\"product\" [shape=ellipse];"));
        assert!(dot.contains("\"base\" [shape=ellipse];"));
    }

    #[test]
    fn test_assigned_edges_are_labelled() {
        let dot = write_str(&annotated_graph()).unwrap();
        assert!(dot.contains("\"product\" -> \"attach\" [label=\"r1\"];"));
        assert!(dot.contains("\"attach\" -> \"base\";"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut assembly = AssemblyGraph::new();
        assembly.insert_or("5\" bracket");
        let dot = write_str(&assembly).unwrap();
        assert!(dot.contains("\"5\\\" bracket\""));
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.dot");
        write_file(&annotated_graph(), &path).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.starts_with("digraph assembly {"));
    }
}
