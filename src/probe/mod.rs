/// Host Probing Module
/// Raw text sources and direct configuration queries.

use std::fs;
use std::io;
use std::process::Command;

use tracing::debug;

/// Identifies one raw text source on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Per-processor block listing (`/proc/cpuinfo`).
    CpuInfo,
    /// Current scaling frequency of cpu1.
    CpuFreq,
    /// Full `getconf -a` variable dump.
    Getconf,
    /// Kernel memory summary (`/proc/meminfo`).
    MemInfo,
    /// `lscpu` summary table.
    Lscpu,
    /// `numactl --hardware` topology listing.
    NumaHardware,
}

/// Capability interface for raw hardware text probes.
///
/// Implementations return the unfiltered text of the selected source. All
/// filtering and extraction happens on the caller side, so everything above
/// this trait is platform-independent.
pub trait HardwareProbe {
    fn query(&self, selector: Selector) -> io::Result<String>;
}

/// Probe implementation for Linux hosts.
pub struct LinuxProbe;

impl HardwareProbe for LinuxProbe {
    fn query(&self, selector: Selector) -> io::Result<String> {
        debug!("querying {:?}", selector);
        match selector {
            Selector::CpuInfo => fs::read_to_string("/proc/cpuinfo"),
            Selector::CpuFreq => {
                fs::read_to_string("/sys/devices/system/cpu/cpu1/cpufreq/scaling_cur_freq")
            }
            Selector::MemInfo => fs::read_to_string("/proc/meminfo"),
            Selector::Getconf => run("getconf", &["-a"]),
            Selector::Lscpu => run("lscpu", &[]),
            Selector::NumaHardware => run("numactl", &["--hardware"]),
        }
    }
}

fn run(cmd: &str, args: &[&str]) -> io::Result<String> {
    let output = Command::new(cmd).args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Number of online logical processors, straight from the OS.
pub fn nprocessors_online() -> Option<i64> {
    #[cfg(unix)]
    {
        sysconf(libc::_SC_NPROCESSORS_ONLN)
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Memory page size in bytes.
pub fn page_size() -> Option<i64> {
    #[cfg(unix)]
    {
        sysconf(libc::_SC_PAGESIZE)
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(unix)]
fn sysconf(name: libc::c_int) -> Option<i64> {
    let value = unsafe { libc::sysconf(name) };
    if value < 0 {
        None
    } else {
        Some(i64::from(value))
    }
}
