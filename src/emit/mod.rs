/// Macro Header Emission
/// Override-guarded `#define` blocks, header assembly and pmem directory
/// provisioning.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::core::facts::{Catalogue, HardwareFact};

/// Where the generated header lands, relative to the invocation directory.
pub const DEFAULT_OUTPUT: &str = "util/include/arch/arch.h";

const ARCHITECTURE_BANNER: &str = "\n/// ARCHITECTURE MACRO\n\n";
const VARIANT_BANNER: &str = "\n/// VARIANT DEFINITION\n\n";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot create pmem directory {path}: {source}")]
    Provision {
        path: String,
        source: std::io::Error,
    },
}

/// One override-guarded preprocessor definition.
#[derive(Debug, Clone)]
pub struct MacroBlock {
    pub actual_name: String,
    pub guard_name: String,
    pub description: String,
    pub value: String,
}

impl MacroBlock {
    /// Block for a collected fact: `ARCH_<domain>_<name>`, guarded by
    /// `ARCH_<domain>_<name>_DEFINED`.
    pub fn for_fact(fact: &HardwareFact) -> Self {
        let actual_name = format!("ARCH_{}_{}", fact.domain.tag(), fact.name);
        MacroBlock::new(actual_name, fact.description, fact.value.render())
    }

    /// Block for the auxiliary pmem directory list.
    pub fn for_pmem_dirs(dirs: &[String]) -> Self {
        MacroBlock::new(
            "ARCH_PMEM_DIR_NAME".to_string(),
            "The names of directory where pmem is mounted at",
            quoted_list(dirs),
        )
    }

    fn new(actual_name: String, description: &str, value: String) -> Self {
        let guard_name = format!("{}_DEFINED", actual_name);
        MacroBlock {
            actual_name,
            guard_name,
            description: description.to_string(),
            value,
        }
    }

    /// Render the emission block.
    ///
    /// The outer `#ifndef` lets a build predefine the macro and bypass
    /// detection. Both inner branches define the same detected value: the
    /// guard macro is a sentinel whose definedness alone signals an external
    /// override, and consumers may test for it.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("/// {}\n", self.description));
        out.push_str(&format!("#ifndef {}\n", self.actual_name));
        out.push_str(&format!("\t#ifndef {}\n", self.guard_name));
        out.push_str(&format!("\t\t#define {}\t{}\n", self.actual_name, self.value));
        out.push_str("\t#else\n");
        out.push_str(&format!("\t\t#define {}\t{}\n", self.actual_name, self.value));
        out.push_str("\t#endif\n");
        out.push_str("#endif\n");
        out.push('\n');
        out
    }
}

fn quoted_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("\"{}\"", item)).collect();
    format!("{{ {} }}", quoted.join(", "))
}

/// Render the complete header text: architecture banner, one block per fact
/// in catalogue order, variant banner, then the optional pmem block.
pub fn render_header(catalogue: &Catalogue, pmem_dirs: Option<&[String]>) -> String {
    let mut out = String::from(ARCHITECTURE_BANNER);
    for fact in catalogue.facts() {
        out.push_str(&MacroBlock::for_fact(&fact).render());
    }
    out.push_str(VARIANT_BANNER);
    if let Some(dirs) = pmem_dirs {
        out.push_str(&MacroBlock::for_pmem_dirs(dirs).render());
    }
    out
}

/// Create each requested pmem directory that does not already exist. One
/// directory level per path; failure is fatal and happens before any header
/// output.
pub fn provision_dirs(dirs: &[String]) -> Result<(), EmitError> {
    for dir in dirs {
        if !Path::new(dir).exists() {
            fs::create_dir(dir).map_err(|source| EmitError::Provision {
                path: dir.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Write the header to `path` in one truncating write, creating the parent
/// directory chain on demand.
pub fn write_header(
    path: &Path,
    catalogue: &Catalogue,
    pmem_dirs: Option<&[String]>,
) -> Result<(), EmitError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_header(catalogue, pmem_dirs))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::facts::{Domain, FactValue};
    use crate::probe::{HardwareProbe, Selector};
    use std::collections::HashSet;
    use std::io;
    use tempfile::tempdir;

    struct StaticProbe;

    impl HardwareProbe for StaticProbe {
        fn query(&self, selector: Selector) -> io::Result<String> {
            let text = match selector {
                Selector::CpuInfo => {
                    "processor\t: 0\nphysical id\t: 0\ncpu cores\t: 2\n\n\
                     processor\t: 1\nphysical id\t: 0\ncpu cores\t: 2\n"
                }
                Selector::CpuFreq => "2600000\n",
                Selector::Getconf => {
                    "LEVEL1_DCACHE_SIZE                 32768\n\
                     LEVEL1_DCACHE_LINESIZE             64\n\
                     LEVEL2_CACHE_SIZE                  1048576\n\
                     LEVEL2_CACHE_LINESIZE              64\n\
                     LEVEL3_CACHE_SIZE                  25952256\n\
                     LEVEL3_CACHE_LINESIZE              64\n"
                }
                Selector::MemInfo => "MemTotal:       16329168 kB\n",
                Selector::Lscpu => "NUMA node(s):        1\n",
                Selector::NumaHardware => "node 0 cpus: 0 1\n",
            };
            Ok(text.to_string())
        }
    }

    fn sample_fact(value: &str) -> HardwareFact {
        HardwareFact {
            domain: Domain::Cpu,
            name: "CORE_NUM",
            description: "The number of cores in one cpu",
            value: FactValue::Scalar(value.to_string()),
        }
    }

    #[test]
    fn block_layout_is_exact() {
        let rendered = MacroBlock::for_fact(&sample_fact("2")).render();
        assert_eq!(
            rendered,
            "/// The number of cores in one cpu\n\
             #ifndef ARCH_CPU_CORE_NUM\n\
             \t#ifndef ARCH_CPU_CORE_NUM_DEFINED\n\
             \t\t#define ARCH_CPU_CORE_NUM\t2\n\
             \t#else\n\
             \t\t#define ARCH_CPU_CORE_NUM\t2\n\
             \t#endif\n\
             #endif\n\n"
        );
    }

    #[test]
    fn empty_value_keeps_the_block_well_formed() {
        let rendered = MacroBlock::for_fact(&sample_fact("")).render();
        assert_eq!(rendered.matches("#ifndef").count(), 2);
        assert_eq!(rendered.matches("#endif").count(), 2);
        assert!(rendered.contains("\t\t#define ARCH_CPU_CORE_NUM\t\n"));
    }

    #[test]
    fn header_opens_and_closes_every_guard() {
        let catalogue = Catalogue::collect(&StaticProbe);
        let header = render_header(&catalogue, None);
        assert_eq!(
            header.matches("#ifndef").count(),
            header.matches("#endif").count()
        );
        assert!(header.starts_with("\n/// ARCHITECTURE MACRO\n\n"));
        assert!(header.contains("\n/// VARIANT DEFINITION\n\n"));
    }

    #[test]
    fn no_pmem_flag_means_no_pmem_block() {
        let catalogue = Catalogue::collect(&StaticProbe);
        let header = render_header(&catalogue, None);
        assert!(!header.contains("ARCH_PMEM_DIR_NAME"));
    }

    #[test]
    fn pmem_dirs_render_as_a_quoted_list() {
        let catalogue = Catalogue::collect(&StaticProbe);
        let dirs = vec!["/tmp/pmem0".to_string(), "/tmp/pmem1".to_string()];
        let header = render_header(&catalogue, Some(&dirs));
        assert!(header
            .contains("\t\t#define ARCH_PMEM_DIR_NAME\t{ \"/tmp/pmem0\", \"/tmp/pmem1\" }\n"));
    }

    #[test]
    fn macro_names_are_unique_across_the_catalogue() {
        let catalogue = Catalogue::collect(&StaticProbe);
        let names: Vec<String> = catalogue
            .facts()
            .iter()
            .map(|f| MacroBlock::for_fact(f).actual_name)
            .collect();
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), names.len());
    }

    #[test]
    fn collection_and_rendering_are_idempotent() {
        let first = render_header(&Catalogue::collect(&StaticProbe), None);
        let second = render_header(&Catalogue::collect(&StaticProbe), None);
        assert_eq!(first, second);
    }

    #[test]
    fn provisioning_creates_missing_dirs_and_is_idempotent() {
        let root = tempdir().unwrap();
        let dirs = vec![
            root.path().join("pmem0").to_string_lossy().into_owned(),
            root.path().join("pmem1").to_string_lossy().into_owned(),
        ];
        provision_dirs(&dirs).unwrap();
        assert!(Path::new(&dirs[0]).is_dir());
        assert!(Path::new(&dirs[1]).is_dir());
        // Second run must not fail on the pre-existing directories.
        provision_dirs(&dirs).unwrap();
    }

    #[test]
    fn write_header_truncates_and_creates_parents() {
        let root = tempdir().unwrap();
        let path = root.path().join("util/include/arch/arch.h");
        let catalogue = Catalogue::collect(&StaticProbe);

        let dirs = vec!["/tmp/pmem0".to_string()];
        write_header(&path, &catalogue, Some(&dirs)).unwrap();
        write_header(&path, &catalogue, None).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_header(&catalogue, None));
        assert!(!written.contains("ARCH_PMEM_DIR_NAME"));
    }
}
