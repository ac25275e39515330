//! Action mapping table
//!
//! Each canonical action names the provider call it issues and the ordered
//! list of descriptor attributes that feed that call. Adding a provider
//! parameter is a change to the tables below, nothing else.

use serde_json::Value;

/// Canonical driver actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a new instance
    Run,
    Terminate,
    Describe,
    /// Attach an elastic address to an instance
    Associate,
    /// Open ingress ports
    Authorize,
    Reboot,
    Stop,
    Start,
    Tags,
}

impl Action {
    /// Name used for the action's section in the defaults document
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::Terminate => "terminate",
            Action::Describe => "describe",
            Action::Associate => "associate",
            Action::Authorize => "authorize",
            Action::Reboot => "reboot",
            Action::Stop => "stop",
            Action::Start => "start",
            Action::Tags => "tags",
        }
    }

    /// Mapping record for this action
    pub fn mapping(self) -> &'static ActionMapping {
        match self {
            Action::Run => &RUN,
            Action::Terminate => &TERMINATE,
            Action::Describe => &DESCRIBE,
            Action::Associate => &ASSOCIATE,
            Action::Authorize => &AUTHORIZE,
            Action::Reboot => &REBOOT,
            Action::Stop => &STOP,
            Action::Start => &START,
            Action::Tags => &TAGS,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider API call issued for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    RunInstances,
    TerminateInstances,
    DescribeInstances,
    AssociateAddress,
    AuthorizeIngress,
    RebootInstances,
    StopInstances,
    StartInstances,
    CreateTags,
}

impl std::fmt::Display for ProviderCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderCall::RunInstances => "run_instances",
            ProviderCall::TerminateInstances => "terminate_instances",
            ProviderCall::DescribeInstances => "describe_instances",
            ProviderCall::AssociateAddress => "associate_address",
            ProviderCall::AuthorizeIngress => "authorize_security_group_ingress",
            ProviderCall::RebootInstances => "reboot_instances",
            ProviderCall::StopInstances => "stop_instances",
            ProviderCall::StartInstances => "start_instances",
            ProviderCall::CreateTags => "create_tags",
        };
        f.write_str(name)
    }
}

/// Value transform applied to a raw attribute string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// `"a,b,c"` -> `["a", "b", "c"]`
    SplitList { delimiter: char },
    /// `"k=v,k2=v2"` -> `{"k": "v", "k2": "v2"}`
    SplitMapping { delimiter: char, separator: char },
    /// `"22,80"` with flag `-p` -> `["-p", "22", "-p", "80"]`
    FlagExpansion { delimiter: char, flag: &'static str },
}

impl Transform {
    pub fn apply(&self, raw: &str) -> Value {
        match *self {
            Transform::Identity => Value::String(raw.to_string()),
            Transform::SplitList { delimiter } => {
                Value::Array(split(raw, delimiter).map(Value::from).collect())
            }
            Transform::SplitMapping {
                delimiter,
                separator,
            } => {
                let mut map = serde_json::Map::new();
                for pair in split(raw, delimiter) {
                    let (key, value) = pair.split_once(separator).unwrap_or((pair, ""));
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    map.insert(key.to_string(), Value::from(value.trim()));
                }
                Value::Object(map)
            }
            Transform::FlagExpansion { delimiter, flag } => Value::Array(
                split(raw, delimiter)
                    .flat_map(|item| [Value::from(flag), Value::from(item)])
                    .collect(),
            ),
        }
    }
}

fn split(raw: &str, delimiter: char) -> impl Iterator<Item = &str> {
    raw.split(delimiter).map(str::trim).filter(|s| !s.is_empty())
}

/// One descriptor attribute feeding one provider parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Descriptor attribute name (e.g. "AMI")
    pub source: &'static str,

    pub transform: Transform,

    /// Path of nested keys in the call parameter tree
    pub destination: &'static [&'static str],
}

impl ParameterSpec {
    pub const fn new(source: &'static str, destination: &'static [&'static str]) -> Self {
        Self {
            source,
            transform: Transform::Identity,
            destination,
        }
    }

    pub const fn with(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Canonical action, its provider call and the parameters it takes
#[derive(Debug)]
pub struct ActionMapping {
    pub action: Action,
    pub call: ProviderCall,
    pub parameters: &'static [ParameterSpec],
}

const LIST: Transform = Transform::SplitList { delimiter: ',' };

pub static RUN: ActionMapping = ActionMapping {
    action: Action::Run,
    call: ProviderCall::RunInstances,
    parameters: &[
        ParameterSpec::new("AKI", &["kernel_id"]),
        ParameterSpec::new("AMI", &["image_id"]),
        ParameterSpec::new("CLIENTTOKEN", &["client_token"]),
        ParameterSpec::new("INSTANCETYPE", &["instance_type"]),
        ParameterSpec::new("KEYPAIR", &["key_name"]),
        ParameterSpec::new("PLACEMENTGROUP", &["placement", "group_name"]),
        ParameterSpec::new("PRIVATEIP", &["private_ip_address"]),
        ParameterSpec::new("RAMDISK", &["ramdisk_id"]),
        ParameterSpec::new("SUBNETID", &["subnet_id"]),
        ParameterSpec::new("TENANCY", &["placement", "tenancy"]),
        ParameterSpec::new("USERDATA", &["user_data"]),
        ParameterSpec::new("SECURITYGROUPS", &["security_groups"]).with(LIST),
        ParameterSpec::new("AVAILABILITYZONE", &["placement", "availability_zone"]),
        ParameterSpec::new("EBS_OPTIMIZED", &["ebs_optimized"]),
    ],
};

pub static TERMINATE: ActionMapping = ActionMapping {
    action: Action::Terminate,
    call: ProviderCall::TerminateInstances,
    parameters: &[],
};

pub static DESCRIBE: ActionMapping = ActionMapping {
    action: Action::Describe,
    call: ProviderCall::DescribeInstances,
    parameters: &[],
};

pub static ASSOCIATE: ActionMapping = ActionMapping {
    action: Action::Associate,
    call: ProviderCall::AssociateAddress,
    parameters: &[ParameterSpec::new("ELASTICIP", &["public_ip"])],
};

pub static AUTHORIZE: ActionMapping = ActionMapping {
    action: Action::Authorize,
    call: ProviderCall::AuthorizeIngress,
    parameters: &[ParameterSpec::new("AUTHORIZEDPORTS", &["ports"]).with(
        Transform::FlagExpansion {
            delimiter: ',',
            flag: "-p",
        },
    )],
};

pub static REBOOT: ActionMapping = ActionMapping {
    action: Action::Reboot,
    call: ProviderCall::RebootInstances,
    parameters: &[],
};

pub static STOP: ActionMapping = ActionMapping {
    action: Action::Stop,
    call: ProviderCall::StopInstances,
    parameters: &[],
};

pub static START: ActionMapping = ActionMapping {
    action: Action::Start,
    call: ProviderCall::StartInstances,
    parameters: &[],
};

pub static TAGS: ActionMapping = ActionMapping {
    action: Action::Tags,
    call: ProviderCall::CreateTags,
    parameters: &[ParameterSpec::new("TAGS", &["tags"]).with(Transform::SplitMapping {
        delimiter: ',',
        separator: '=',
    })],
};

/// Every action mapping, in declaration order
pub static ACTIONS: [&ActionMapping; 9] = [
    &RUN, &TERMINATE, &DESCRIBE, &ASSOCIATE, &AUTHORIZE, &REBOOT, &STOP, &START, &TAGS,
];
