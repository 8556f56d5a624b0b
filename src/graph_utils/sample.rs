use anyhow::Context;

use super::graph::ClusterRecord;

// Two-cluster demo dataset, shipped in the same shape a host application
// would deliver over the input contract.
const SAMPLE_CLUSTERS_JSON: &str = r#"[
  {
    "id": "sim1",
    "name": "Child Simulation 1",
    "nodes": [
      { "id": "node1", "name": "Device 1", "group": 1 },
      { "id": "node2", "name": "Device 2", "group": 1 },
      { "id": "node3", "name": "Device 3", "group": 2 },
      { "id": "node4", "name": "Device 4", "group": 2 },
      { "id": "node5", "name": "Device 5", "group": 3 },
      { "id": "node6", "name": "Device 6", "group": 3 },
      { "id": "node7", "name": "Device 7", "group": 1 },
      { "id": "node8", "name": "Device 8", "group": 2 },
      { "id": "node9", "name": "Device 9", "group": 3 },
      { "id": "node10", "name": "Device 10", "group": 1 }
    ],
    "links": [
      { "source": "node1", "target": "node2" },
      { "source": "node1", "target": "node7" },
      { "source": "node2", "target": "node3" },
      { "source": "node3", "target": "node4" },
      { "source": "node3", "target": "node8" },
      { "source": "node4", "target": "node5" },
      { "source": "node5", "target": "node6" },
      { "source": "node6", "target": "node9" },
      { "source": "node7", "target": "node10" },
      { "source": "node8", "target": "node9" },
      { "source": "node9", "target": "node10" }
    ]
  },
  {
    "id": "sim2",
    "name": "Child Simulation 2",
    "nodes": [
      { "id": "server1", "name": "Server 1", "group": 1 },
      { "id": "server2", "name": "Server 2", "group": 1 },
      { "id": "router1", "name": "Router 1", "group": 2 },
      { "id": "router2", "name": "Router 2", "group": 2 },
      { "id": "switch1", "name": "Switch 1", "group": 3 },
      { "id": "switch2", "name": "Switch 2", "group": 3 },
      { "id": "firewall1", "name": "Firewall 1", "group": 1 },
      { "id": "firewall2", "name": "Firewall 2", "group": 2 },
      { "id": "database1", "name": "Database 1", "group": 3 },
      { "id": "database2", "name": "Database 2", "group": 1 }
    ],
    "links": [
      { "source": "server1", "target": "router1" },
      { "source": "server1", "target": "firewall1" },
      { "source": "server2", "target": "router2" },
      { "source": "router1", "target": "switch1" },
      { "source": "router2", "target": "switch2" },
      { "source": "switch1", "target": "firewall2" },
      { "source": "switch2", "target": "database1" },
      { "source": "firewall1", "target": "database2" },
      { "source": "firewall2", "target": "database1" },
      { "source": "database1", "target": "database2" }
    ]
  }
]"#;

pub fn sample_clusters() -> anyhow::Result<Vec<ClusterRecord>> {
    serde_json::from_str(SAMPLE_CLUSTERS_JSON).context("embedded sample dataset is malformed")
}
