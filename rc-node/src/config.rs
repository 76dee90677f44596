//! On-disk configuration formats (§6): the topology CSV and
//! `byzantine.config`. Both are external-collaborator formats -- loaded
//! here at the depth the specification asks for ("specify their interface,
//! not their guts"), not a general-purpose config framework.

use std::path::Path;

use anyhow::{Context, Result};
use rc_types::NodeAddress;

/// One row of the topology CSV: a node and its declared neighbours.
#[derive(Debug, Clone)]
pub struct TopologyRow {
    pub node: NodeAddress,
    pub neighbours: Vec<NodeAddress>,
}

/// Loads the topology CSV: header row then one row per node, first column
/// the node label, subsequent columns its neighbours (empty cells skipped).
pub fn load_topology_csv(path: impl AsRef<Path>) -> Result<Vec<TopologyRow>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening topology CSV at {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading a row of {}", path.display()))?;
        let mut fields = record.iter();
        let Some(node) = fields.next().filter(|s| !s.is_empty()) else {
            continue;
        };
        let neighbours = fields
            .filter(|s| !s.is_empty())
            .map(NodeAddress::new)
            .collect();
        rows.push(TopologyRow {
            node: NodeAddress::new(node),
            neighbours,
        });
    }
    Ok(rows)
}

/// `-m auto`: replaces the row whose label equals `placeholder_letter` with
/// `self_addr`, and rewrites every other row's neighbour lists that named
/// the placeholder, matching the original's slot-substitution behavior.
pub fn substitute_letter(rows: &mut [TopologyRow], placeholder_letter: &str, self_addr: &NodeAddress) {
    let placeholder = NodeAddress::new(placeholder_letter);
    for row in rows.iter_mut() {
        if row.node == placeholder {
            row.node = self_addr.clone();
        }
        for n in row.neighbours.iter_mut() {
            if *n == placeholder {
                *n = self_addr.clone();
            }
        }
    }
}

/// The parsed `byzantine.config` contents: the fault profile plus `f`
/// (`MAX_BYZANTINES`), defaulted to `0` when the file omits the key.
pub struct ByzantineConfig {
    pub profile: rc_types::Byzantine,
    pub max_byzantines: usize,
}

pub fn load_byzantine_config(path: impl AsRef<Path>) -> Result<ByzantineConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading byzantine config at {}", path.display()))?;
    let (profile, max_byzantines) =
        rc_types::Byzantine::load(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(ByzantineConfig {
        profile,
        max_byzantines: max_byzantines.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_topology_csv_skips_empty_cells() {
        let file = write_temp("node,n1,n2,n3\nA,B,,D\nB,A,,\n");
        let rows = load_topology_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].node, addr("A"));
        assert_eq!(rows[0].neighbours, vec![addr("B"), addr("D")]);
        assert_eq!(rows[1].neighbours, vec![addr("A")]);
    }

    #[test]
    fn substitute_letter_replaces_row_and_references() {
        let mut rows = vec![
            TopologyRow { node: addr("C"), neighbours: vec![addr("A"), addr("B")] },
            TopologyRow { node: addr("A"), neighbours: vec![addr("C")] },
        ];
        substitute_letter(&mut rows, "C", &addr("self-addr"));
        assert_eq!(rows[0].node, addr("self-addr"));
        assert_eq!(rows[1].neighbours, vec![addr("self-addr")]);
    }

    #[test]
    fn load_byzantine_config_defaults_max_byzantines_to_zero() {
        let file = write_temp("Type2=true\nDropRate=1.0\n");
        let cfg = load_byzantine_config(file.path()).unwrap();
        assert_eq!(cfg.max_byzantines, 0);
        assert!(cfg.profile.type2);
    }

    #[test]
    fn load_byzantine_config_reads_max_byzantines() {
        let file = write_temp("MAX_BYZANTINES=3\n");
        let cfg = load_byzantine_config(file.path()).unwrap();
        assert_eq!(cfg.max_byzantines, 3);
    }
}
