//! The per-processor mapping table produced by topology detection.

use std::fmt::Display;

use foldhash::{HashMap, HashMapExt};

use crate::{CoreClass, CoreId, GroupId, ProcessorId, SocketId};

/// One logical processor as recorded by topology detection.
///
/// Instances are immutable after detection. Reservation state is tracked separately by the
/// owning [`TopologyContext`][crate::TopologyContext] so that no caller can touch raw flags.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct LogicalProcessor {
    /// Operating system identifier of the logical processor.
    pub id: ProcessorId,

    /// The socket this processor belongs to.
    pub socket_id: SocketId,

    /// The physical core this processor belongs to.
    pub core_id: CoreId,

    /// Performance-efficiency classification.
    pub core_class: CoreClass,

    /// Hyperthread sharing group. Both twins of a hyperthreaded performance core carry the
    /// same value; processors without a twin are alone in their group.
    pub group_id: GroupId,
}

impl Display for LogicalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processor {} [socket {}, core {}, {}]",
            self.id, self.socket_id, self.core_id, self.core_class
        )
    }
}

/// The CPU mapping table: one record per logical processor, ordered by ascending processor ID.
#[derive(Clone, Debug)]
pub struct CpuMappingTable {
    processors: Vec<LogicalProcessor>,

    /// Processor ID to index in `processors`. IDs are not guaranteed contiguous.
    index_of: HashMap<ProcessorId, usize>,

    /// Members of each hyperthread sharing group, in ascending processor ID order.
    group_members: HashMap<GroupId, Vec<ProcessorId>>,
}

impl CpuMappingTable {
    pub(crate) fn new(mut processors: Vec<LogicalProcessor>) -> Self {
        processors.sort_by_key(|p| p.id);

        let mut index_of = HashMap::with_capacity(processors.len());
        let mut group_members: HashMap<GroupId, Vec<ProcessorId>> = HashMap::new();

        for (index, processor) in processors.iter().enumerate() {
            index_of.insert(processor.id, index);
            group_members
                .entry(processor.group_id)
                .or_default()
                .push(processor.id);
        }

        Self {
            processors,
            index_of,
            group_members,
        }
    }

    /// All records, ordered by ascending processor ID.
    #[cfg_attr(test, mutants::skip)] // Trivial accessor, do not waste time on mutation.
    #[inline]
    #[must_use]
    pub fn processors(&self) -> &[LogicalProcessor] {
        &self.processors
    }

    /// Number of logical processors in the table.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether the table is empty. Only true when detection found no processors at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// The record for a specific processor ID.
    #[must_use]
    pub fn get(&self, id: ProcessorId) -> Option<&LogicalProcessor> {
        self.index_of
            .get(&id)
            .and_then(|&index| self.processors.get(index))
    }

    pub(crate) fn index_of(&self, id: ProcessorId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// The hyperthread twin of the given processor, if it has one.
    ///
    /// A twin exists only for the two logical processors sharing one physical performance
    /// core. Efficient cores and unclassified processors have no twin.
    #[must_use]
    pub fn hyperthread_twin(&self, id: ProcessorId) -> Option<ProcessorId> {
        let processor = self.get(id)?;

        self.group_members
            .get(&processor.group_id)?
            .iter()
            .copied()
            .find(|&member| member != id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twin_pair(id_a: ProcessorId, id_b: ProcessorId, group: GroupId) -> [LogicalProcessor; 2] {
        [
            LogicalProcessor {
                id: id_a,
                socket_id: 0,
                core_id: group,
                core_class: CoreClass::Performance,
                group_id: group,
            },
            LogicalProcessor {
                id: id_b,
                socket_id: 0,
                core_id: group,
                core_class: CoreClass::HyperthreadSecondary,
                group_id: group,
            },
        ]
    }

    #[test]
    fn records_are_sorted_by_id() {
        let mut records = twin_pair(4, 5, 2).to_vec();
        records.extend(twin_pair(0, 1, 0));

        let table = CpuMappingTable::new(records);

        let ids: Vec<_> = table.processors().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 4, 5]);
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
    }

    #[test]
    fn lookup_by_id_tolerates_gaps() {
        let table = CpuMappingTable::new(twin_pair(8, 9, 4).to_vec());

        assert_eq!(table.get(8).map(|p| p.core_class), Some(CoreClass::Performance));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(10), None);
    }

    #[test]
    fn hyperthread_twin_resolves_both_directions() {
        let table = CpuMappingTable::new(twin_pair(2, 3, 1).to_vec());

        assert_eq!(table.hyperthread_twin(2), Some(3));
        assert_eq!(table.hyperthread_twin(3), Some(2));
    }

    #[test]
    fn efficient_core_has_no_twin() {
        let table = CpuMappingTable::new(vec![LogicalProcessor {
            id: 7,
            socket_id: 0,
            core_id: 7,
            core_class: CoreClass::Efficient,
            group_id: 3,
        }]);

        assert_eq!(table.hyperthread_twin(7), None);
        assert_eq!(table.hyperthread_twin(42), None);
    }
}
