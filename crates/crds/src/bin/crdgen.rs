//! Prints the CRD manifests as a multi-document YAML stream.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > config/crds.yaml
//! ```

use crds::{Cluster, Node};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [Cluster::crd(), Node::crd()];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
