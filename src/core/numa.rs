/// NUMA Topology Extraction
/// Parses `numactl --hardware` style text into per-node CPU-id lists.

use std::sync::OnceLock;

use regex::Regex;

fn node_cpus_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"node \d+ cpus: (.*)").unwrap())
}

/// Extract the per-node CPU-id lists from raw topology text.
///
/// Each line shaped `node <id> cpus: <ids>` contributes one list. The ids are
/// split on single spaces, so consecutive spaces in the source produce empty
/// tokens. Zero matching lines yield an empty outer list.
pub fn parse_node_cpus(raw: &str) -> Vec<Vec<String>> {
    node_cpus_pattern()
        .captures_iter(raw)
        .map(|caps| caps[1].split(' ').map(str::to_string).collect())
        .collect()
}

/// Render the nested brace literal, one inner group per node:
/// `{ { 0, 1 }, { 2, 3 } }`. An empty node list renders as `{  }`.
pub fn render_node_cpus(nodes: &[Vec<String>]) -> String {
    let groups: Vec<String> = nodes
        .iter()
        .map(|cpus| format!("{{ {} }}", cpus.join(", ")))
        .collect();
    format!("{{ {} }}", groups.join(", "))
}
