//! State normalization and monitoring reports
//!
//! Converts provider instance status into the orchestrator's canonical
//! states and renders the poll line and fleet capacity block it consumes.

use crate::error::Result;
use crate::provider::{ComputeProvider, InstanceInfo, InstanceStatus, RemoteInstance};
use std::collections::BTreeMap;
use std::fmt;
use vmflow_config::{ConfigError, InstanceTypeSpec, RegionBinding};

/// Tag linking a remote instance to the orchestrator's VM id
pub const IDENTITY_TAG: &str = "ONE_ID";

const CPU_SPEED: u32 = 1000;
const KIB_PER_GIB: f64 = 1024.0 * 1024.0;
const CPU_PERCENT: f64 = 100.0;

/// Canonical VM state understood by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalState {
    Active,
    Paused,
    Error,
    Deleted,
    Unknown,
}

impl CanonicalState {
    /// Single-letter code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            CanonicalState::Active => "a",
            CanonicalState::Paused => "p",
            CanonicalState::Error => "e",
            CanonicalState::Deleted => "d",
            CanonicalState::Unknown => "-",
        }
    }
}

impl fmt::Display for CanonicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Map a provider status to a canonical state.
///
/// `None` means the instance does not exist. Statuses without a canonical
/// counterpart (stopping, stopped, ...) yield `None` so that no state is
/// reported for them.
pub fn normalize(status: Option<&InstanceStatus>) -> Option<CanonicalState> {
    match status {
        None => Some(CanonicalState::Deleted),
        Some(InstanceStatus::Pending | InstanceStatus::Running) => Some(CanonicalState::Active),
        Some(InstanceStatus::ShuttingDown | InstanceStatus::Terminated) => {
            Some(CanonicalState::Deleted)
        }
        Some(other) => {
            tracing::debug!("No canonical state for provider status '{}'", other);
            None
        }
    }
}

/// One poll line: `USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=a IP=...`
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub used_memory: u64,
    pub used_cpu: u64,
    pub net_tx: u64,
    pub net_rx: u64,
    pub state: Option<CanonicalState>,
    pub ip: Option<String>,
}

impl PollReport {
    /// Build the report from a provider snapshot; `None` for a missing instance.
    ///
    /// Utilization counters are always zero, the provider does not expose
    /// them through this path.
    pub fn from_instance(info: Option<&InstanceInfo>) -> Self {
        let status = info.map(|i| &i.status);
        let ip = match info {
            Some(i) if i.status == InstanceStatus::Running => i.ip_address.clone(),
            _ => None,
        };

        Self {
            used_memory: 0,
            used_cpu: 0,
            net_tx: 0,
            net_rx: 0,
            state: normalize(status),
            ip,
        }
    }
}

impl fmt::Display for PollReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USEDMEMORY={} USEDCPU={} NETTX={} NETRX={}",
            self.used_memory, self.used_cpu, self.net_tx, self.net_rx
        )?;
        if let Some(state) = self.state {
            write!(f, " STATE={}", state)?;
            if let Some(ip) = &self.ip {
                write!(f, " IP={}", ip)?;
            }
        }
        Ok(())
    }
}

/// Poll a single instance through its handle
pub async fn report_instance(handle: &RemoteInstance<'_>) -> Result<PollReport> {
    let info = handle.describe().await?;
    Ok(PollReport::from_instance(info.as_ref()))
}

/// One discovered instance in a fleet report
#[derive(Debug, Clone, PartialEq)]
pub struct VmRecord {
    /// Orchestrator id from the identity tag, `None` when untagged
    pub id: Option<String>,
    pub deploy_id: String,
    pub poll: PollReport,
}

/// Host capacity block plus one record per discovered instance
#[derive(Debug, Clone, PartialEq)]
pub struct FleetReport {
    pub hypervisor: String,
    pub hostname: String,
    /// KiB
    pub total_memory: f64,
    /// Percent of one core
    pub total_cpu: f64,
    pub used_memory: f64,
    pub used_cpu: f64,
    pub vms: Vec<VmRecord>,
}

impl FleetReport {
    pub fn free_memory(&self) -> f64 {
        self.total_memory - self.used_memory
    }

    pub fn free_cpu(&self) -> f64 {
        self.total_cpu - self.used_cpu
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HYPERVISOR={}", self.hypervisor)?;
        writeln!(f, "TOTALMEMORY={}", self.total_memory.round() as i64)?;
        writeln!(f, "TOTALCPU={}", self.total_cpu.round() as i64)?;
        writeln!(f, "CPUSPEED={}", CPU_SPEED)?;
        writeln!(f, "HOSTNAME=\"{}\"", self.hostname)?;
        writeln!(f, "USEDMEMORY={}", self.used_memory.round() as i64)?;
        writeln!(f, "USEDCPU={}", self.used_cpu.round() as i64)?;
        writeln!(f, "FREEMEMORY={}", self.free_memory().round() as i64)?;
        writeln!(f, "FREECPU={}", self.free_cpu().round() as i64)?;
        writeln!(f, "VM_POLL=YES")?;

        for vm in &self.vms {
            writeln!(f, "VM=[")?;
            writeln!(f, "  ID={},", vm.id.as_deref().unwrap_or("-1"))?;
            writeln!(f, "  DEPLOY_ID={},", vm.deploy_id)?;
            writeln!(f, "  POLL=\"{}\" ]", vm.poll)?;
        }
        Ok(())
    }
}

fn spec_for<'a>(
    types: &'a BTreeMap<String, InstanceTypeSpec>,
    name: &str,
) -> std::result::Result<&'a InstanceTypeSpec, ConfigError> {
    types
        .get(name)
        .ok_or_else(|| ConfigError::UnknownInstanceType(name.to_string()))
}

/// Total (memory KiB, cpu percent) for a capacity table
pub fn capacity_totals(
    capacity: &BTreeMap<String, u32>,
    types: &BTreeMap<String, InstanceTypeSpec>,
) -> Result<(f64, f64)> {
    let mut memory = 0.0;
    let mut cpu = 0.0;
    for (name, count) in capacity {
        let spec = spec_for(types, name)?;
        memory += spec.memory * f64::from(*count) * KIB_PER_GIB;
        cpu += spec.cpu * f64::from(*count) * CPU_PERCENT;
    }
    Ok((memory, cpu))
}

/// Aggregate a fleet report from already enumerated instances.
///
/// Only instances carrying the identity tag count towards used capacity.
pub fn build_fleet_report(
    hypervisor: &str,
    hostname: &str,
    binding: &RegionBinding,
    types: &BTreeMap<String, InstanceTypeSpec>,
    instances: &[InstanceInfo],
) -> Result<FleetReport> {
    let (total_memory, total_cpu) = capacity_totals(&binding.capacity, types)?;

    let mut used_memory = 0.0;
    let mut used_cpu = 0.0;
    let mut vms = Vec::with_capacity(instances.len());

    for info in instances {
        let id = info.tag(IDENTITY_TAG).map(str::to_string);

        if id.is_some() {
            let type_name = info.instance_type.as_deref().unwrap_or_default();
            let spec = spec_for(types, type_name)?;
            used_memory += spec.memory * KIB_PER_GIB;
            used_cpu += spec.cpu * CPU_PERCENT;
        }

        vms.push(VmRecord {
            id,
            deploy_id: info.instance_id.clone(),
            poll: PollReport::from_instance(Some(info)),
        });
    }

    Ok(FleetReport {
        hypervisor: hypervisor.to_string(),
        hostname: hostname.to_string(),
        total_memory,
        total_cpu,
        used_memory,
        used_cpu,
        vms,
    })
}

/// Enumerate the provider's instances and aggregate them
pub async fn report_fleet(
    provider: &dyn ComputeProvider,
    hostname: &str,
    binding: &RegionBinding,
    types: &BTreeMap<String, InstanceTypeSpec>,
) -> Result<FleetReport> {
    let instances = provider.list_instances().await?;
    tracing::debug!("Enumerated {} instances in {}", instances.len(), binding.region_name);
    build_fleet_report(provider.name(), hostname, binding, types, &instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ProviderCall;
    use crate::error::CloudError;
    use crate::testing::MemoryProvider;

    fn types() -> BTreeMap<String, InstanceTypeSpec> {
        [("m1.small", 1.0, 1.5), ("m1.large", 2.0, 7.5)]
            .into_iter()
            .map(|(name, cpu, memory)| {
                (
                    name.to_string(),
                    InstanceTypeSpec {
                        name: name.to_string(),
                        cpu,
                        memory,
                    },
                )
            })
            .collect()
    }

    fn binding(capacity: &[(&str, u32)]) -> RegionBinding {
        RegionBinding {
            name: "default".to_string(),
            region_name: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            capacity: capacity.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_normalize_table() {
        use InstanceStatus::*;

        assert_eq!(normalize(Some(&Pending)), Some(CanonicalState::Active));
        assert_eq!(normalize(Some(&Running)), Some(CanonicalState::Active));
        assert_eq!(normalize(Some(&ShuttingDown)), Some(CanonicalState::Deleted));
        assert_eq!(normalize(Some(&Terminated)), Some(CanonicalState::Deleted));
        assert_eq!(normalize(None), Some(CanonicalState::Deleted));
        assert_eq!(normalize(Some(&Stopped)), None);
        assert_eq!(normalize(Some(&Other("rebooting".into()))), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let status = InstanceStatus::Running;
        assert_eq!(normalize(Some(&status)), normalize(Some(&status)));
    }

    #[test]
    fn test_poll_line_running() {
        let info = InstanceInfo::new("i-1", InstanceStatus::Running).with_ip("203.0.113.7");
        let report = PollReport::from_instance(Some(&info));

        assert_eq!(
            report.to_string(),
            "USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=a IP=203.0.113.7"
        );
    }

    #[test]
    fn test_poll_line_pending_has_no_ip() {
        let info = InstanceInfo::new("i-1", InstanceStatus::Pending).with_ip("203.0.113.7");
        assert_eq!(
            PollReport::from_instance(Some(&info)).to_string(),
            "USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=a"
        );
    }

    #[test]
    fn test_poll_line_missing_and_unmapped() {
        assert_eq!(
            PollReport::from_instance(None).to_string(),
            "USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=d"
        );

        let stopped = InstanceInfo::new("i-1", InstanceStatus::Stopped);
        assert_eq!(
            PollReport::from_instance(Some(&stopped)).to_string(),
            "USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0"
        );
    }

    #[test]
    fn test_capacity_totals() {
        let (memory, cpu) =
            capacity_totals(&binding(&[("m1.small", 4), ("m1.large", 1)]).capacity, &types())
                .unwrap();

        assert_eq!(memory, (1.5 * 4.0 + 7.5) * 1024.0 * 1024.0);
        assert_eq!(cpu, 600.0);
    }

    #[test]
    fn test_capacity_unknown_type() {
        let result = capacity_totals(&binding(&[("x1.huge", 1)]).capacity, &types());
        assert!(matches!(
            result,
            Err(CloudError::Config(ConfigError::UnknownInstanceType(_)))
        ));
    }

    #[test]
    fn test_fleet_counts_only_tagged_instances() {
        let instances = vec![
            InstanceInfo::new("i-1", InstanceStatus::Running)
                .with_instance_type("m1.small")
                .with_ip("198.51.100.1")
                .with_tag(IDENTITY_TAG, "12"),
            InstanceInfo::new("i-2", InstanceStatus::Running).with_instance_type("m1.large"),
            InstanceInfo::new("i-3", InstanceStatus::Pending)
                .with_instance_type("m1.large")
                .with_tag(IDENTITY_TAG, "13"),
        ];

        let report = build_fleet_report(
            "ec2",
            "us-east",
            &binding(&[("m1.small", 2), ("m1.large", 2)]),
            &types(),
            &instances,
        )
        .unwrap();

        assert_eq!(report.used_cpu, 300.0);
        assert_eq!(report.used_memory, 9.0 * 1024.0 * 1024.0);
        assert_eq!(report.total_cpu - report.used_cpu, report.free_cpu());
        assert_eq!(report.total_memory - report.used_memory, report.free_memory());
        assert_eq!(report.vms.len(), 3);
        assert_eq!(report.vms[1].id, None);
    }

    #[test]
    fn test_fleet_untagged_unknown_type_is_ignored() {
        let instances = vec![InstanceInfo::new("i-9", InstanceStatus::Running)];
        let report =
            build_fleet_report("ec2", "h", &binding(&[]), &types(), &instances).unwrap();

        assert_eq!(report.used_cpu, 0.0);
        assert_eq!(report.free_cpu(), 0.0);
    }

    #[test]
    fn test_fleet_rendering() {
        let instances = vec![
            InstanceInfo::new("i-1", InstanceStatus::Running)
                .with_instance_type("m1.small")
                .with_ip("198.51.100.1")
                .with_tag(IDENTITY_TAG, "12"),
            InstanceInfo::new("i-2", InstanceStatus::Terminated),
        ];
        let report = build_fleet_report(
            "ec2",
            "us-east",
            &binding(&[("m1.small", 2)]),
            &types(),
            &instances,
        )
        .unwrap();

        let expected = "HYPERVISOR=ec2\n\
            TOTALMEMORY=3145728\n\
            TOTALCPU=200\n\
            CPUSPEED=1000\n\
            HOSTNAME=\"us-east\"\n\
            USEDMEMORY=1572864\n\
            USEDCPU=100\n\
            FREEMEMORY=1572864\n\
            FREECPU=100\n\
            VM_POLL=YES\n\
            VM=[\n  ID=12,\n  DEPLOY_ID=i-1,\n  POLL=\"USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=a IP=198.51.100.1\" ]\n\
            VM=[\n  ID=-1,\n  DEPLOY_ID=i-2,\n  POLL=\"USEDMEMORY=0 USEDCPU=0 NETTX=0 NETRX=0 STATE=d\" ]\n";

        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn test_fractional_values_are_rounded() {
        let mut types = types();
        types.insert(
            "t.half".to_string(),
            InstanceTypeSpec {
                name: "t.half".to_string(),
                cpu: 0.333,
                memory: 0.6,
            },
        );

        let report =
            build_fleet_report("ec2", "h", &binding(&[("t.half", 1)]), &types, &[]).unwrap();
        let text = report.to_string();

        assert!(text.contains("TOTALCPU=33\n"));
        assert!(text.contains("TOTALMEMORY=629146\n"));
    }

    #[tokio::test]
    async fn test_report_fleet_enumeration_failure() {
        let provider = MemoryProvider::new().failing(ProviderCall::DescribeInstances);
        let result = report_fleet(&provider, "h", &binding(&[]), &types()).await;
        assert!(matches!(result, Err(CloudError::ProviderCall(_))));
    }

    #[tokio::test]
    async fn test_report_instance_through_handle() {
        let provider = MemoryProvider::new().with_instance(
            InstanceInfo::new("i-1", InstanceStatus::ShuttingDown).with_ip("198.51.100.1"),
        );
        let handle = RemoteInstance::new(&provider, "i-1");

        let report = report_instance(&handle).await.unwrap();
        assert_eq!(report.state, Some(CanonicalState::Deleted));
        assert_eq!(report.ip, None);
    }
}
