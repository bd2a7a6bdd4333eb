use once_cell::sync::Lazy;
use serde::Deserialize;

/// Top-level payload from the backend graph store. Missing sections
/// deserialize to empty vectors so a malformed payload degrades to an
/// empty model instead of an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl RawGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub edge_type: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub traffic_bytes: Option<u64>,
}

/// Recognized edge vocabulary. Tags outside this set are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    SecurityGroupAttachment,
    RoleAttachment,
    NaclAssociation,
    SubnetContainment,
    ActualTraffic,
    ObservedTraffic,
    S3Operation,
}

impl EdgeKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "HAS_SECURITY_GROUP" => Some(Self::SecurityGroupAttachment),
            "USES_ROLE" => Some(Self::RoleAttachment),
            "HAS_NACL" => Some(Self::NaclAssociation),
            "IN_SUBNET" => Some(Self::SubnetContainment),
            "ACTUAL_TRAFFIC" => Some(Self::ActualTraffic),
            "OBSERVED_TRAFFIC" => Some(Self::ObservedTraffic),
            "S3_OPERATION" => Some(Self::S3Operation),
            _ => None,
        }
    }

    pub fn is_traffic(self) -> bool {
        matches!(
            self,
            Self::ActualTraffic | Self::ObservedTraffic | Self::S3Operation
        )
    }
}

/// Closed classification of raw node types. The backend emits free-form
/// type strings ("EC2Instance", "aws_s3_bucket", "rds"); everything
/// downstream branches on this enum instead of re-matching strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Compute,
    Database,
    Storage,
    Queue,
    Topic,
    SecurityGroup,
    NetworkAcl,
    IamRole,
    Vpc,
    Subnet,
    Unknown,
}

/// Substring table consulted in order; first hit wins. Order matters:
/// "network_acl" must match before the bare "network" kinds, and
/// "security_group" before "group".
static KIND_TABLE: Lazy<Vec<(&'static str, ResourceKind)>> = Lazy::new(|| {
    vec![
        ("security_group", ResourceKind::SecurityGroup),
        ("securitygroup", ResourceKind::SecurityGroup),
        ("network_acl", ResourceKind::NetworkAcl),
        ("networkacl", ResourceKind::NetworkAcl),
        ("nacl", ResourceKind::NetworkAcl),
        ("iam_role", ResourceKind::IamRole),
        ("iamrole", ResourceKind::IamRole),
        ("role", ResourceKind::IamRole),
        ("subnet", ResourceKind::Subnet),
        ("vpc", ResourceKind::Vpc),
        ("dynamodb", ResourceKind::Database),
        ("aurora", ResourceKind::Database),
        ("rds", ResourceKind::Database),
        ("database", ResourceKind::Database),
        ("bucket", ResourceKind::Storage),
        ("s3", ResourceKind::Storage),
        ("efs", ResourceKind::Storage),
        ("sqs", ResourceKind::Queue),
        ("queue", ResourceKind::Queue),
        ("sns", ResourceKind::Topic),
        ("topic", ResourceKind::Topic),
        ("ec2", ResourceKind::Compute),
        ("instance", ResourceKind::Compute),
        ("lambda", ResourceKind::Compute),
        ("ecs", ResourceKind::Compute),
        ("compute", ResourceKind::Compute),
    ]
});

impl ResourceKind {
    /// Best-effort classification of a raw type string. Unrecognized
    /// types are `Unknown`, never an error.
    pub fn classify(raw_type: &str) -> Self {
        let lowered = raw_type.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Self::Unknown;
        }
        match lowered.as_str() {
            "sg" => return Self::SecurityGroup,
            "acl" => return Self::NetworkAcl,
            "db" => return Self::Database,
            _ => {}
        }
        for (needle, kind) in KIND_TABLE.iter() {
            if lowered.contains(needle) {
                return *kind;
            }
        }
        Self::Unknown
    }

    pub fn is_compute(self) -> bool {
        self == Self::Compute
    }

    /// Data-plane kinds a traffic flow may terminate at.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            Self::Database | Self::Storage | Self::Queue | Self::Topic
        )
    }

    pub fn is_checkpoint(self) -> bool {
        matches!(self, Self::SecurityGroup | Self::NetworkAcl | Self::IamRole)
    }

    /// Network-boundary kinds rendered as enclosing containers.
    pub fn is_boundary(self) -> bool {
        matches!(self, Self::Vpc | Self::Subnet)
    }
}
