/// Hardware Fact Catalogue
/// Turns raw probe text into the macro values the emitter writes out.

use tracing::warn;

use crate::core::numa;
use crate::probe::{self, HardwareProbe, Selector};

/// Fact grouping, one per emitted header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Cpu,
    Cache,
    Memory,
    Numa,
}

impl Domain {
    /// Tag used inside macro names, e.g. `ARCH_CPU_CORE_NUM`.
    pub fn tag(self) -> &'static str {
        match self {
            Domain::Cpu => "CPU",
            Domain::Cache => "CACHE",
            Domain::Memory => "MEMORY",
            Domain::Numa => "NUMA",
        }
    }
}

/// A detected value. Exactly two shapes occur: flat scalars (possibly empty
/// when a probe came up dry) and the per-node CPU-id lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactValue {
    Scalar(String),
    Nodes(Vec<Vec<String>>),
}

impl FactValue {
    /// Header-literal rendering of the value.
    pub fn render(&self) -> String {
        match self {
            FactValue::Scalar(text) => text.clone(),
            FactValue::Nodes(nodes) => numa::render_node_cpus(nodes),
        }
    }
}

/// One detected hardware characteristic.
#[derive(Debug, Clone)]
pub struct HardwareFact {
    pub domain: Domain,
    pub name: &'static str,
    pub description: &'static str,
    pub value: FactValue,
}

/// CPU socket, core and frequency facts.
#[derive(Debug, Clone)]
pub struct CpuFacts {
    pub core_num: String,
    pub physical_num: String,
    pub logical_num: Option<i64>,
    pub frequency: String,
}

impl CpuFacts {
    fn collect(probe: &dyn HardwareProbe) -> Self {
        let (core_num, physical_num) = match probe.query(Selector::CpuInfo) {
            Ok(text) => (
                distinct_line_count(&text, "physical id"),
                collapsed_digits(&text, "cpu cores"),
            ),
            Err(err) => {
                warn!("cpuinfo probe failed: {}", err);
                (String::new(), String::new())
            }
        };
        let frequency = match probe.query(Selector::CpuFreq) {
            Ok(text) => digits(&text),
            Err(err) => {
                warn!("cpufreq probe failed: {}", err);
                String::new()
            }
        };
        CpuFacts {
            core_num,
            physical_num,
            logical_num: probe::nprocessors_online(),
            frequency,
        }
    }
}

// getconf variable names per cache level. The SIZE keys feed the
// CACHE_LINE_SIZE_L* macros and the LINESIZE keys feed CACHE_LINE_L*; the
// pairing is the established header contract.
const CACHE_SIZE_KEYS: [&str; 3] = [
    "LEVEL1_DCACHE_SIZE",
    "LEVEL2_CACHE_SIZE",
    "LEVEL3_CACHE_SIZE",
];
const CACHE_LINE_KEYS: [&str; 3] = [
    "LEVEL1_DCACHE_LINESIZE",
    "LEVEL2_CACHE_LINESIZE",
    "LEVEL3_CACHE_LINESIZE",
];

const CACHE_SIZE_NAMES: [&str; 3] = [
    "CACHE_LINE_SIZE_L1",
    "CACHE_LINE_SIZE_L2",
    "CACHE_LINE_SIZE_L3",
];
const CACHE_SIZE_DESCS: [&str; 3] = [
    "The size of L1 cache line",
    "The size of L2 cache line",
    "The size of L3 cache line",
];
const CACHE_LINE_NAMES: [&str; 3] = ["CACHE_LINE_L1", "CACHE_LINE_L2", "CACHE_LINE_L3"];
const CACHE_LINE_DESCS: [&str; 3] = [
    "The size of L1 cache",
    "The size of L2 cache",
    "The size of L3 cache",
];

/// Per-level cache geometry facts.
#[derive(Debug, Clone)]
pub struct CacheFacts {
    /// Values behind `CACHE_LINE_SIZE_L{1,2,3}`.
    pub line_size: [String; 3],
    /// Values behind `CACHE_LINE_L{1,2,3}`.
    pub line: [String; 3],
}

impl CacheFacts {
    fn collect(probe: &dyn HardwareProbe) -> Self {
        let raw = match probe.query(Selector::Getconf) {
            Ok(text) => text,
            Err(err) => {
                warn!("getconf probe failed: {}", err);
                String::new()
            }
        };
        CacheFacts {
            line_size: CACHE_SIZE_KEYS.map(|key| keyed_digits(&raw, key)),
            line: CACHE_LINE_KEYS.map(|key| keyed_digits(&raw, key)),
        }
    }
}

/// Page size and installed memory facts.
#[derive(Debug, Clone)]
pub struct MemoryFacts {
    pub page_size: Option<i64>,
    pub max_memory_size: String,
}

impl MemoryFacts {
    fn collect(probe: &dyn HardwareProbe) -> Self {
        let max_memory_size = match probe.query(Selector::MemInfo) {
            Ok(text) => matched_digits(&text, "MemTotal"),
            Err(err) => {
                warn!("meminfo probe failed: {}", err);
                String::new()
            }
        };
        MemoryFacts {
            page_size: probe::page_size(),
            max_memory_size,
        }
    }
}

/// NUMA node count and per-node CPU assignment facts.
#[derive(Debug, Clone)]
pub struct NumaFacts {
    pub node_num: String,
    pub node_cpus: Vec<Vec<String>>,
}

impl NumaFacts {
    fn collect(probe: &dyn HardwareProbe) -> Self {
        let node_num = match probe.query(Selector::Lscpu) {
            Ok(text) => matched_digits(&text, "NUMA node(s)"),
            Err(err) => {
                warn!("lscpu probe failed: {}", err);
                String::new()
            }
        };
        let node_cpus = match probe.query(Selector::NumaHardware) {
            Ok(text) => numa::parse_node_cpus(&text),
            Err(err) => {
                warn!("numactl probe failed: {}", err);
                Vec::new()
            }
        };
        NumaFacts {
            node_num,
            node_cpus,
        }
    }
}

/// The complete fact catalogue for one host, collected once per run and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub cpu: CpuFacts,
    pub cache: CacheFacts,
    pub memory: MemoryFacts,
    pub numa: NumaFacts,
}

impl Catalogue {
    /// Run every probe once and populate the catalogue. Probes are
    /// best-effort: a missing source degrades its facts to empty values and
    /// never aborts collection.
    pub fn collect(probe: &dyn HardwareProbe) -> Self {
        Catalogue {
            cpu: CpuFacts::collect(probe),
            cache: CacheFacts::collect(probe),
            memory: MemoryFacts::collect(probe),
            numa: NumaFacts::collect(probe),
        }
    }

    /// Flattened facts in emission order: CPU, CACHE, MEMORY, NUMA.
    pub fn facts(&self) -> Vec<HardwareFact> {
        let mut facts = Vec::with_capacity(14);

        facts.push(fact(
            Domain::Cpu,
            "CORE_NUM",
            "The number of cores in one cpu",
            scalar(&self.cpu.core_num),
        ));
        facts.push(fact(
            Domain::Cpu,
            "PHYSICAL_NUM",
            "The number of available physical cpu",
            scalar(&self.cpu.physical_num),
        ));
        facts.push(fact(
            Domain::Cpu,
            "LOGICAL_NUM",
            "The number of available logical cpu",
            optional(self.cpu.logical_num),
        ));
        facts.push(fact(
            Domain::Cpu,
            "FREQUENCY",
            "The frequency of cpu",
            scalar(&self.cpu.frequency),
        ));

        for level in 0..3 {
            facts.push(fact(
                Domain::Cache,
                CACHE_SIZE_NAMES[level],
                CACHE_SIZE_DESCS[level],
                scalar(&self.cache.line_size[level]),
            ));
        }
        for level in 0..3 {
            facts.push(fact(
                Domain::Cache,
                CACHE_LINE_NAMES[level],
                CACHE_LINE_DESCS[level],
                scalar(&self.cache.line[level]),
            ));
        }

        facts.push(fact(
            Domain::Memory,
            "PAGE_SIZE",
            "The size of memory page",
            optional(self.memory.page_size),
        ));
        facts.push(fact(
            Domain::Memory,
            "MAX_MEMORY_SIZE",
            "The maximum size of memory",
            scalar(&self.memory.max_memory_size),
        ));

        facts.push(fact(
            Domain::Numa,
            "NODE_NUM",
            "The number of numa nodes",
            scalar(&self.numa.node_num),
        ));
        facts.push(fact(
            Domain::Numa,
            "NODE_CPUS",
            "The allocation of CPUs on each NUMA node",
            FactValue::Nodes(self.numa.node_cpus.clone()),
        ));

        facts
    }
}

fn fact(
    domain: Domain,
    name: &'static str,
    description: &'static str,
    value: FactValue,
) -> HardwareFact {
    HardwareFact {
        domain,
        name,
        description,
        value,
    }
}

fn scalar(text: &str) -> FactValue {
    FactValue::Scalar(text.to_string())
}

fn optional(value: Option<i64>) -> FactValue {
    FactValue::Scalar(value.map(|n| n.to_string()).unwrap_or_default())
}

/// Drop everything except base-10 digits. A probe with no digits in its
/// output yields the empty string, which is emitted as-is.
fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Count of distinct lines containing `needle`.
fn distinct_line_count(text: &str, needle: &str) -> String {
    let mut lines: Vec<&str> = text.lines().filter(|l| l.contains(needle)).collect();
    lines.sort_unstable();
    lines.dedup();
    lines.len().to_string()
}

/// Lines containing `needle` with adjacent duplicates collapsed, then
/// digit-filtered. Sockets reporting different core counts concatenate,
/// which surfaces as a nonsense value at native-build time rather than here.
fn collapsed_digits(text: &str, needle: &str) -> String {
    let mut kept = String::new();
    let mut prev: Option<&str> = None;
    for line in text.lines().filter(|l| l.contains(needle)) {
        if prev != Some(line) {
            kept.push_str(line);
            prev = Some(line);
        }
    }
    digits(&kept)
}

/// Digit-filter of all lines containing `needle`.
fn matched_digits(text: &str, needle: &str) -> String {
    let kept: String = text.lines().filter(|l| l.contains(needle)).collect();
    digits(&kept)
}

/// Like `matched_digits`, but the key text itself is deleted from each kept
/// line first. getconf variable names carry digits (LEVEL1, LEVEL2, ...) that
/// must not leak into the value.
fn keyed_digits(text: &str, key: &str) -> String {
    let mut kept = String::new();
    for line in text.lines().filter(|l| l.contains(key)) {
        kept.push_str(&line.replace(key, ""));
    }
    digits(&kept)
}
