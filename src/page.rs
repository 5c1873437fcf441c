//! Loading snapshots and tour definitions from disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use tourguide_dom::{PageSnapshot, SnapshotDom};
use tourguide_protocols::{NodeId, Tour};

use crate::cli::PageArgs;

pub(crate) struct LoadedPage {
    pub dom: Arc<SnapshotDom>,
    pub tours: Vec<Tour>,
}

impl LoadedPage {
    pub fn load(args: &PageArgs) -> Result<Self> {
        let snapshot = PageSnapshot::load(&args.snapshot)
            .with_context(|| format!("loading snapshot {}", args.snapshot.display()))?;
        let tours = load_tours(&args.tours)?;
        Ok(Self {
            dom: Arc::new(SnapshotDom::new(snapshot)),
            tours,
        })
    }

    pub fn tour(&self, tour_id: &str) -> Result<&Tour> {
        self.tours
            .iter()
            .find(|t| t.id == tour_id)
            .with_context(|| format!("no tour with id '{}'", tour_id))
    }
}

fn load_tours(path: &Path) -> Result<Vec<Tour>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading tours {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing tours {}", path.display()))
}

/// `tag#id.class` for display.
pub(crate) fn describe(dom: &SnapshotDom, node: NodeId) -> String {
    let snapshot = dom.snapshot();
    let Some(found) = snapshot.nodes.iter().find(|n| n.node_id() == node) else {
        return format!("{} (detached)", node);
    };
    let mut label = found.tag.clone();
    if let Some(id) = found.attributes.get("id") {
        label.push('#');
        label.push_str(id);
    }
    if let Some(classes) = found.attributes.get("class") {
        for class in classes.split_whitespace() {
            label.push('.');
            label.push_str(class);
        }
    }
    format!("{} [{}]", label, node)
}
