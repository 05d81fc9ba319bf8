use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use crate::ProcessorId;
use crate::pal::linux::{Filesystem, FilesystemFacade};
use crate::pal::{Platform, RawTopology, TopologyRelation};

/// Topology detection backed by the Linux sysfs virtual filesystem.
///
/// The package, core and L2 cache relations are reconstructed from the per-CPU
/// `topology/` and `cache/index2/` entries. Any missing or malformed file degrades the
/// answer to a count-only topology, never a failure.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform {
    fs: FilesystemFacade,
}

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform =
    BuildTargetPlatform::new(FilesystemFacade::real());

impl BuildTargetPlatform {
    pub(crate) const fn new(fs: FilesystemFacade) -> Self {
        Self { fs }
    }

    fn present_processors(&self) -> Option<Vec<ProcessorId>> {
        let contents = self.fs.get_cpus_present_contents()?;

        cpulist::parse(contents.trim())
            .ok()
            .filter(|processors| !processors.is_empty())
    }

    /// Reconstructs the relationship records for the given processors.
    ///
    /// `None` means some required sysfs entry was missing or malformed, in which case the
    /// caller reports a count-only topology.
    fn relations_for(&self, processors: &[ProcessorId]) -> Option<Vec<TopologyRelation>> {
        let mut relations = Vec::new();
        let mut packages: BTreeMap<u32, Vec<ProcessorId>> = BTreeMap::new();

        for &cpu in processors {
            let package = parse_integer(&self.fs.get_package_id_contents(cpu)?)?;
            packages.entry(package).or_default().push(cpu);

            let siblings =
                cpulist::parse(self.fs.get_thread_siblings_contents(cpu)?.trim()).ok()?;

            // Each core appears once per member; emit the relation only for the lowest one.
            if siblings.first() == Some(&cpu) {
                relations.push(TopologyRelation::Core {
                    processors: siblings,
                });
            }

            // L2 topology may be absent on exotic kernels. Its absence only costs core
            // classification, so it does not degrade the whole answer.
            if let Some(shared) = self.fs.get_l2_shared_cpus_contents(cpu) {
                let sharers = cpulist::parse(shared.trim()).ok()?;

                if sharers.first() == Some(&cpu) {
                    relations.push(TopologyRelation::L2Cache {
                        processors: sharers,
                    });
                }
            }
        }

        relations.extend(
            packages
                .into_values()
                .map(|members| TopologyRelation::Package {
                    processors: members,
                }),
        );

        Some(relations)
    }
}

impl Platform for BuildTargetPlatform {
    fn raw_topology(&self) -> RawTopology {
        let Some(processors) = self.present_processors() else {
            // Nothing usable in sysfs; fall back to counting schedulable processors.
            return RawTopology {
                processor_count: std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1),
                relations: Vec::new(),
            };
        };

        let relations = self.relations_for(&processors).unwrap_or_default();

        RawTopology {
            processor_count: processors.len(),
            relations,
        }
    }
}

fn parse_integer(contents: &str) -> Option<u32> {
    contents.trim().parse().ok()
}
