use std::mem::size_of;

use smallvec::SmallVec;
use windows::Win32::System::SystemInformation::{
    ALL_PROCESSOR_GROUPS, GROUP_AFFINITY, PROCESSOR_RELATIONSHIP, RelationAll, RelationCache,
    RelationProcessorCore, RelationProcessorPackage, SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX,
};

use crate::ProcessorId;
use crate::pal::windows::{Bindings, BindingsFacade, PROCESSORS_PER_GROUP};
use crate::pal::{Platform, RawTopology, TopologyRelation};

/// The singleton instance of our Windows platform abstraction.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform =
    BuildTargetPlatform::new(BindingsFacade::target());

/// Enables inspection of the hardware topology as reported by the Windows kernel.
///
/// Package, core and level 2 cache relationship records all arrive from the same
/// `GetLogicalProcessorInformationEx` query. Each record carries one or more group
/// affinity masks; we flatten those into machine-wide processor identifiers by
/// treating each processor group as a span of 64 identifiers.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform {
    bindings: BindingsFacade,
}

impl Platform for BuildTargetPlatform {
    fn raw_topology(&self) -> RawTopology {
        let processor_count = (self
            .bindings
            .get_maximum_processor_count(ALL_PROCESSOR_GROUPS) as usize)
            .max(1);

        // A failed query yields a count-only topology. Callers degrade gracefully.
        let relations = self
            .query_relationship_records()
            .map(|buffer| parse_relationship_records(&buffer))
            .unwrap_or_default();

        RawTopology {
            processor_count,
            relations,
        }
    }
}

impl BuildTargetPlatform {
    pub(crate) const fn new(bindings: BindingsFacade) -> Self {
        Self { bindings }
    }

    /// Obtains the raw relationship record buffer from the OS.
    ///
    /// The API wants to be called twice, first to get the required buffer size and
    /// a second time to fill the buffer we allocated in response.
    fn query_relationship_records(&self) -> Option<Vec<u64>> {
        let mut required_length: u32 = 0;

        // SAFETY: No buffer provided, so the only requirement is a valid length pointer.
        let probe = unsafe {
            self.bindings.get_logical_processor_information_ex(
                RelationAll,
                None,
                &raw mut required_length,
            )
        };

        // The probe is expected to fail with "insufficient buffer". Anything else
        // (including an unexpected success with no data) means we have nothing to parse.
        if probe.is_ok() || required_length == 0 {
            return None;
        }

        // The records contain pointer-sized masks, so the buffer must be suitably
        // aligned. A u64 backing store guarantees that on every supported target.
        let words = (required_length as usize).div_ceil(size_of::<u64>());
        let mut buffer: Vec<u64> = vec![0; words];
        let mut length = required_length;

        // SAFETY: The buffer holds at least `length` writable bytes and is aligned
        // for the record type. The length pointer is valid for the duration of the call.
        unsafe {
            self.bindings
                .get_logical_processor_information_ex(
                    RelationAll,
                    Some(buffer.as_mut_ptr().cast()),
                    &raw mut length,
                )
                .ok()?;
        }

        Some(buffer)
    }
}

/// Walks the variable-size relationship records and keeps the ones we care about.
fn parse_relationship_records(buffer: &[u64]) -> Vec<TopologyRelation> {
    let bytes: *const u8 = buffer.as_ptr().cast();
    let total_len = buffer.len().saturating_mul(size_of::<u64>());

    let mut relations = Vec::new();
    let mut offset = 0_usize;

    while offset.saturating_add(size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>()) <= total_len {
        // SAFETY: The OS guarantees each record starts with the fixed-size header and
        // that `Size` spans the whole record. We verified the header fits above.
        let info = unsafe { &*bytes.add(offset).cast::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>() };

        if info.Size == 0 {
            // A zero-sized record would loop forever. Treat the buffer as exhausted.
            break;
        }

        if info.Relationship == RelationProcessorPackage {
            // SAFETY: The relationship type tells us which union member is active.
            let processor = unsafe { &info.Anonymous.Processor };

            relations.push(TopologyRelation::Package {
                processors: processors_in_relationship(processor),
            });
        } else if info.Relationship == RelationProcessorCore {
            // SAFETY: The relationship type tells us which union member is active.
            let processor = unsafe { &info.Anonymous.Processor };

            relations.push(TopologyRelation::Core {
                processors: processors_in_relationship(processor),
            });
        } else if info.Relationship == RelationCache {
            // SAFETY: The relationship type tells us which union member is active.
            let cache = unsafe { &info.Anonymous.Cache };

            if cache.Level == 2 {
                // SAFETY: Single-mask form of the cache record union.
                let mask = unsafe { &cache.Anonymous.GroupMask };

                relations.push(TopologyRelation::L2Cache {
                    processors: processors_in_mask(mask).into_iter().collect(),
                });
            }
        }

        offset = offset.saturating_add(info.Size as usize);
    }

    relations
}

fn processors_in_relationship(relationship: &PROCESSOR_RELATIONSHIP) -> Vec<ProcessorId> {
    // GroupMask is declared as a one-element array but in reality extends to
    // GroupCount elements within the record.
    let mask_count = usize::from(relationship.GroupCount.max(1));

    // SAFETY: The record is sized to hold `GroupCount` masks past the header.
    let masks = unsafe { std::slice::from_raw_parts(relationship.GroupMask.as_ptr(), mask_count) };

    masks.iter().flat_map(processors_in_mask).collect()
}

fn processors_in_mask(affinity: &GROUP_AFFINITY) -> SmallVec<[ProcessorId; 16]> {
    let first_in_group = u32::from(affinity.Group).saturating_mul(PROCESSORS_PER_GROUP);

    (0..PROCESSORS_PER_GROUP)
        .filter(|&bit| affinity.Mask & (1_usize << bit) != 0)
        .map(|bit| first_in_group.saturating_add(bit))
        .collect()
}

#[cfg(test)]
mod tests {
    use windows::Win32::System::SystemInformation::CACHE_RELATIONSHIP;
    use windows::core::Error;

    use super::*;
    use crate::pal::windows::MockBindings;

    fn affinity(group: u16, mask: usize) -> GROUP_AFFINITY {
        GROUP_AFFINITY {
            Mask: mask,
            Group: group,
            ..Default::default()
        }
    }

    fn core_record(mask: GROUP_AFFINITY) -> SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX {
        let mut info = SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX {
            Relationship: RelationProcessorCore,
            Size: size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>() as u32,
            ..Default::default()
        };

        info.Anonymous.Processor = PROCESSOR_RELATIONSHIP {
            GroupCount: 1,
            GroupMask: [mask],
            ..Default::default()
        };

        info
    }

    fn package_record(mask: GROUP_AFFINITY) -> SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX {
        let mut info = core_record(mask);
        info.Relationship = RelationProcessorPackage;
        info
    }

    fn cache_record(level: u8, mask: GROUP_AFFINITY) -> SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX {
        let mut info = SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX {
            Relationship: RelationCache,
            Size: size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>() as u32,
            ..Default::default()
        };

        let mut cache = CACHE_RELATIONSHIP {
            Level: level,
            ..Default::default()
        };
        cache.Anonymous.GroupMask = mask;
        info.Anonymous.Cache = cache;

        info
    }

    fn encode(records: &[SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX]) -> Vec<u64> {
        let record_bytes = size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>();
        let total_bytes = record_bytes * records.len();
        let mut buffer: Vec<u64> = vec![0; total_bytes.div_ceil(size_of::<u64>())];

        for (index, record) in records.iter().enumerate() {
            // SAFETY: The destination has room for every record and is aligned for u64,
            // which satisfies the record type's alignment.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    std::ptr::from_ref(record).cast::<u8>(),
                    buffer.as_mut_ptr().cast::<u8>().add(index * record_bytes),
                    record_bytes,
                );
            }
        }

        buffer
    }

    fn platform_returning(records: Vec<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>) -> BuildTargetPlatform {
        let encoded = encode(&records);
        let byte_len = (size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX>() * records.len()) as u32;

        let mut bindings = MockBindings::new();
        bindings
            .expect_get_maximum_processor_count()
            .returning(move |_| 8);
        bindings
            .expect_get_logical_processor_information_ex()
            .returning(move |_, buffer, returned_length| {
                // SAFETY: Caller promises a valid length pointer.
                unsafe {
                    *returned_length = byte_len;
                }

                match buffer {
                    None => Err(Error::empty()),
                    Some(target) => {
                        // SAFETY: Caller promises the buffer holds the bytes we reported.
                        unsafe {
                            std::ptr::copy_nonoverlapping(
                                encoded.as_ptr().cast::<u8>(),
                                target.cast::<u8>(),
                                byte_len as usize,
                            );
                        }
                        Ok(())
                    }
                }
            });

        BuildTargetPlatform::new(BindingsFacade::from_mock(bindings))
    }

    #[test]
    fn parses_package_core_and_l2_records() {
        let platform = platform_returning(vec![
            package_record(affinity(0, 0b1111)),
            core_record(affinity(0, 0b0101)),
            core_record(affinity(0, 0b1010)),
            cache_record(2, affinity(0, 0b1100)),
            // Level 3 caches are not interesting to us.
            cache_record(3, affinity(0, 0b1111)),
        ]);

        let topology = platform.raw_topology();

        assert_eq!(topology.processor_count, 8);
        assert_eq!(
            topology.relations,
            vec![
                TopologyRelation::Package {
                    processors: vec![0, 1, 2, 3]
                },
                TopologyRelation::Core {
                    processors: vec![0, 2]
                },
                TopologyRelation::Core {
                    processors: vec![1, 3]
                },
                TopologyRelation::L2Cache {
                    processors: vec![2, 3]
                },
            ]
        );
    }

    #[test]
    fn second_group_offsets_processor_ids() {
        let platform = platform_returning(vec![core_record(affinity(1, 0b11))]);

        let topology = platform.raw_topology();

        assert_eq!(
            topology.relations,
            vec![TopologyRelation::Core {
                processors: vec![64, 65]
            }]
        );
    }

    #[test]
    fn failed_query_degrades_to_count_only() {
        let mut bindings = MockBindings::new();
        bindings
            .expect_get_maximum_processor_count()
            .returning(|_| 4);
        bindings
            .expect_get_logical_processor_information_ex()
            .returning(|_, _, returned_length| {
                // SAFETY: Caller promises a valid length pointer.
                unsafe {
                    *returned_length = 0;
                }
                Err(Error::empty())
            });

        let platform = BuildTargetPlatform::new(BindingsFacade::from_mock(bindings));
        let topology = platform.raw_topology();

        assert_eq!(topology.processor_count, 4);
        assert!(topology.relations.is_empty());
    }
}
